use crate::domain::model::{AssessmentInputs, AssessmentResult, RunReport};
use crate::domain::model::{AnalysisConfig, FitConfig, IdealizationMethod, ScalingConfig};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Called once per completed (record, scale) analysis step.
pub type ProgressFn = Arc<dyn Fn() + Send + Sync>;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Configuration contract consumed by the assessment pipeline. Both the CLI
/// flag surface and the TOML job file implement this.
pub trait JobProvider: Send + Sync {
    fn job_name(&self) -> &str;
    fn capacity_path(&self) -> &str;
    fn building_params_path(&self) -> &str;
    fn gmrs_dir(&self) -> &str;
    fn output_dir(&self) -> &str;
    fn scaling(&self) -> ScalingConfig;
    fn idealization(&self) -> IdealizationMethod;
    fn idealization_tolerance(&self) -> f64;
    fn analysis(&self) -> AnalysisConfig;
    fn fit(&self) -> FitConfig;
    fn loss_ratios(&self) -> [f64; 3];
    fn csv_delimiter(&self) -> u8;
    fn bundle_outputs(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<AssessmentInputs>;
    async fn transform(&self, inputs: AssessmentInputs) -> Result<AssessmentResult>;
    async fn load(&self, result: AssessmentResult) -> Result<RunReport>;
}
