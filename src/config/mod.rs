pub mod cli;
pub mod job;
pub mod settings;

#[cfg(feature = "cli")]
use crate::domain::model::{AnalysisConfig, FitConfig, IdealizationMethod, ScalingConfig};
#[cfg(feature = "cli")]
use crate::domain::ports::JobProvider;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{
    validate_loss_ratios, validate_ordered, validate_path, validate_positive, validate_range,
    Validate,
};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "asfravab")]
#[command(about = "Automated seismic fragility and vulnerability assessment for buildings")]
pub struct CliConfig {
    /// Pushover capacity curve CSV (Dt(m);Vb(kN))
    #[arg(long)]
    pub capacity: String,

    /// Building parameters CSV (Floor(number);Mass(ton);Mode(unitless))
    #[arg(long)]
    pub building_params: String,

    /// Folder of ground-motion records (*.csv / *.txt)
    #[arg(long)]
    pub gmrs_dir: String,

    #[arg(long, default_value = "./output")]
    pub output_dir: String,

    #[arg(long, default_value = "0.0")]
    pub min_scale: f64,

    #[arg(long, default_value = "2.0")]
    pub max_scale: f64,

    #[arg(long, default_value = "0.25")]
    pub increment: f64,

    /// Capacity idealization: epp or sh
    #[arg(long, default_value = "epp")]
    pub idealization: String,

    #[arg(long, default_value = "0.001")]
    pub idealization_tolerance: f64,

    /// Skip higher scales for a record after its first non-intersection
    #[arg(long)]
    pub fast_mode: bool,

    #[arg(long, default_value = "0.05")]
    pub damping_ratio: f64,

    /// Fragility regression: msa, glm or logreg
    #[arg(long, default_value = "msa")]
    pub fit_method: String,

    /// Intensity measure column: pga or sa
    #[arg(long, default_value = "pga")]
    pub intensity_measure: String,

    /// GLM link function: logit or probit
    #[arg(long, default_value = "logit")]
    pub link: String,

    /// Logistic regularization level: high, medium or none
    #[arg(long, default_value = "none")]
    pub regulation: String,

    /// Loss ratios for ds1,ds2,ds3
    #[arg(long, value_delimiter = ',', default_value = "0.15,0.6,1.0")]
    pub loss_ratios: Vec<f64>,

    #[arg(long, default_value = ";")]
    pub csv_separator: String,

    /// Zip the output CSVs together with the run summary
    #[arg(long)]
    pub bundle: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Log process CPU/memory per phase
    #[arg(long)]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("capacity", &self.capacity)?;
        validate_path("building_params", &self.building_params)?;
        validate_path("gmrs_dir", &self.gmrs_dir)?;
        validate_path("output_dir", &self.output_dir)?;
        validate_positive("increment", self.increment)?;
        validate_ordered("min_scale/max_scale", self.min_scale, self.max_scale)?;
        validate_range("idealization_tolerance", self.idealization_tolerance, 1e-6, 0.5)?;
        validate_range("damping_ratio", self.damping_ratio, 0.0, 1.0)?;
        validate_loss_ratios("loss_ratios", &self.loss_ratios)?;

        parse_field::<IdealizationMethod>("idealization", &self.idealization)?;
        parse_field::<crate::domain::model::FitMethod>("fit_method", &self.fit_method)?;
        parse_field::<crate::domain::model::IntensityMeasure>(
            "intensity_measure",
            &self.intensity_measure,
        )?;
        parse_field::<crate::domain::model::LinkFunction>("link", &self.link)?;
        parse_field::<crate::domain::model::Regulation>("regulation", &self.regulation)?;

        if self.csv_separator.len() != 1 {
            return Err(crate::utils::error::AssessmentError::InvalidConfigValueError {
                field: "csv_separator".to_string(),
                value: self.csv_separator.clone(),
                reason: "Separator must be a single character".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(feature = "cli")]
pub fn parse_field<T: std::str::FromStr<Err = String>>(
    field: &str,
    value: &str,
) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|reason| crate::utils::error::AssessmentError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason,
        })
}

#[cfg(feature = "cli")]
impl JobProvider for CliConfig {
    fn job_name(&self) -> &str {
        "asfravab-run"
    }

    fn capacity_path(&self) -> &str {
        &self.capacity
    }

    fn building_params_path(&self) -> &str {
        &self.building_params
    }

    fn gmrs_dir(&self) -> &str {
        &self.gmrs_dir
    }

    fn output_dir(&self) -> &str {
        &self.output_dir
    }

    fn scaling(&self) -> ScalingConfig {
        ScalingConfig {
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            increment: self.increment,
            fast_mode: self.fast_mode,
        }
    }

    fn idealization(&self) -> IdealizationMethod {
        self.idealization.parse().unwrap_or_default()
    }

    fn idealization_tolerance(&self) -> f64 {
        self.idealization_tolerance
    }

    fn analysis(&self) -> AnalysisConfig {
        AnalysisConfig {
            damping_ratio: self.damping_ratio,
            ..AnalysisConfig::default()
        }
    }

    fn fit(&self) -> FitConfig {
        FitConfig {
            method: self.fit_method.parse().unwrap_or_default(),
            im: self.intensity_measure.parse().unwrap_or_default(),
            link: self.link.parse().unwrap_or_default(),
            regulation: self.regulation.parse().unwrap_or_default(),
        }
    }

    fn loss_ratios(&self) -> [f64; 3] {
        [
            self.loss_ratios.first().copied().unwrap_or(0.15),
            self.loss_ratios.get(1).copied().unwrap_or(0.6),
            self.loss_ratios.get(2).copied().unwrap_or(1.0),
        ]
    }

    fn csv_delimiter(&self) -> u8 {
        self.csv_separator.as_bytes().first().copied().unwrap_or(b';')
    }

    fn bundle_outputs(&self) -> bool {
        self.bundle
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    fn base_config() -> CliConfig {
        CliConfig::parse_from([
            "asfravab",
            "--capacity",
            "cap.csv",
            "--building-params",
            "bp.csv",
            "--gmrs-dir",
            "./gmrs",
        ])
    }

    #[test]
    fn defaults_validate() {
        let config = base_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.csv_delimiter(), b';');
        assert_eq!(config.loss_ratios(), [0.15, 0.6, 1.0]);
    }

    #[test]
    fn bad_idealization_fails_validation() {
        let mut config = base_config();
        config.idealization = "bogus".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_scale_range_fails_validation() {
        let mut config = base_config();
        config.min_scale = 3.0;
        assert!(config.validate().is_err());
    }
}
