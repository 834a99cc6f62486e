use crate::core::Pipeline;
use crate::domain::model::RunReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Drives a pipeline through its extract/transform/load phases, optionally
/// logging process stats after each one.
pub struct AssessmentEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> AssessmentEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("Starting assessment run");

        let inputs = self.pipeline.extract().await?;
        tracing::info!("Loaded {} ground-motion records", inputs.records.len());
        self.monitor.log_phase("Extract");

        let result = self.pipeline.transform(inputs).await?;
        tracing::info!("Computed {} EDP rows", result.edps.len());
        self.monitor.log_phase("Analyze");

        let report = self.pipeline.load(result).await?;
        tracing::info!("Outputs written to {}", report.edps_path);
        self.monitor.log_phase("Load");
        self.monitor.log_final();

        Ok(report)
    }
}
