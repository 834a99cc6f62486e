use crate::domain::model::{AnalysisConfig, FitConfig, IdealizationMethod, ScalingConfig};
use crate::domain::ports::JobProvider;
use crate::utils::error::{AssessmentError, Result};
use crate::utils::validation::{
    validate_loss_ratios, validate_ordered, validate_path, validate_positive, validate_range,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub job: JobMeta,
    pub inputs: InputsSection,
    pub scaling: ScalingSection,
    pub idealization: Option<IdealizationSection>,
    pub analysis: Option<AnalysisSection>,
    pub fit: Option<FitSection>,
    pub loss: Option<LossSection>,
    pub output: OutputSection,
    pub monitoring: Option<MonitoringSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMeta {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputsSection {
    pub capacity_csv: String,
    pub building_params_csv: String,
    pub gmrs_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingSection {
    pub min_scale: f64,
    pub max_scale: f64,
    pub increment: f64,
    pub fast_mode: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdealizationSection {
    pub method: Option<String>,
    pub tolerance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    pub damping_ratio: Option<f64>,
    pub period_step: Option<f64>,
    pub period_max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSection {
    pub method: Option<String>,
    pub intensity_measure: Option<String>,
    pub link: Option<String>,
    pub regulation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossSection {
    pub ratios: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    pub dir: String,
    pub csv_separator: Option<String>,
    pub bundle: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSection {
    pub enabled: bool,
}

impl JobConfig {
    /// Load a job description from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AssessmentError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parse a job description from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| AssessmentError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR_NAME}` placeholders; unknown variables stay literal.
    fn substitute_env_vars(content: &str) -> String {
        let re = match regex::Regex::new(r"\$\{([^}]+)\}") {
            Ok(re) => re,
            Err(_) => return content.to_string(),
        };

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_path("inputs.capacity_csv", &self.inputs.capacity_csv)?;
        validate_path("inputs.building_params_csv", &self.inputs.building_params_csv)?;
        validate_path("inputs.gmrs_dir", &self.inputs.gmrs_dir)?;
        validate_path("output.dir", &self.output.dir)?;
        crate::utils::validation::validate_file_extensions(
            "inputs",
            &[
                self.inputs.capacity_csv.clone(),
                self.inputs.building_params_csv.clone(),
            ],
            &["csv"],
        )?;

        validate_positive("scaling.increment", self.scaling.increment)?;
        validate_ordered(
            "scaling.min_scale/max_scale",
            self.scaling.min_scale,
            self.scaling.max_scale,
        )?;

        if let Some(section) = &self.idealization {
            if let Some(method) = &section.method {
                parse_toml_field::<IdealizationMethod>("idealization.method", method)?;
            }
            if let Some(tol) = section.tolerance {
                validate_range("idealization.tolerance", tol, 1e-6, 0.5)?;
            }
        }

        if let Some(section) = &self.analysis {
            if let Some(damping) = section.damping_ratio {
                validate_range("analysis.damping_ratio", damping, 0.0, 1.0)?;
            }
            if let Some(step) = section.period_step {
                validate_positive("analysis.period_step", step)?;
            }
            if let Some(max) = section.period_max {
                validate_positive("analysis.period_max", max)?;
            }
        }

        if let Some(section) = &self.fit {
            if let Some(method) = &section.method {
                parse_toml_field::<crate::domain::model::FitMethod>("fit.method", method)?;
            }
            if let Some(im) = &section.intensity_measure {
                parse_toml_field::<crate::domain::model::IntensityMeasure>(
                    "fit.intensity_measure",
                    im,
                )?;
            }
            if let Some(link) = &section.link {
                parse_toml_field::<crate::domain::model::LinkFunction>("fit.link", link)?;
            }
            if let Some(reg) = &section.regulation {
                parse_toml_field::<crate::domain::model::Regulation>("fit.regulation", reg)?;
            }
        }

        if let Some(loss) = &self.loss {
            validate_loss_ratios("loss.ratios", &loss.ratios)?;
        }

        if let Some(sep) = &self.output.csv_separator {
            if sep.len() != 1 {
                return Err(AssessmentError::InvalidConfigValueError {
                    field: "output.csv_separator".to_string(),
                    value: sep.clone(),
                    reason: "Separator must be a single character".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn fast_mode(&self) -> bool {
        self.scaling.fast_mode.unwrap_or(false)
    }
}

fn parse_toml_field<T: std::str::FromStr<Err = String>>(field: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|reason| AssessmentError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason,
        })
}

impl JobProvider for JobConfig {
    fn job_name(&self) -> &str {
        &self.job.name
    }

    fn capacity_path(&self) -> &str {
        &self.inputs.capacity_csv
    }

    fn building_params_path(&self) -> &str {
        &self.inputs.building_params_csv
    }

    fn gmrs_dir(&self) -> &str {
        &self.inputs.gmrs_dir
    }

    fn output_dir(&self) -> &str {
        &self.output.dir
    }

    fn scaling(&self) -> ScalingConfig {
        ScalingConfig {
            min_scale: self.scaling.min_scale,
            max_scale: self.scaling.max_scale,
            increment: self.scaling.increment,
            fast_mode: self.fast_mode(),
        }
    }

    fn idealization(&self) -> IdealizationMethod {
        self.idealization
            .as_ref()
            .and_then(|s| s.method.as_ref())
            .and_then(|m| m.parse().ok())
            .unwrap_or_default()
    }

    fn idealization_tolerance(&self) -> f64 {
        self.idealization
            .as_ref()
            .and_then(|s| s.tolerance)
            .unwrap_or(0.001)
    }

    fn analysis(&self) -> AnalysisConfig {
        let defaults = AnalysisConfig::default();
        let section = self.analysis.as_ref();
        AnalysisConfig {
            damping_ratio: section
                .and_then(|s| s.damping_ratio)
                .unwrap_or(defaults.damping_ratio),
            period_step: section
                .and_then(|s| s.period_step)
                .unwrap_or(defaults.period_step),
            period_max: section
                .and_then(|s| s.period_max)
                .unwrap_or(defaults.period_max),
        }
    }

    fn fit(&self) -> FitConfig {
        let section = self.fit.as_ref();
        FitConfig {
            method: section
                .and_then(|s| s.method.as_ref())
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            im: section
                .and_then(|s| s.intensity_measure.as_ref())
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            link: section
                .and_then(|s| s.link.as_ref())
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            regulation: section
                .and_then(|s| s.regulation.as_ref())
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
        }
    }

    fn loss_ratios(&self) -> [f64; 3] {
        let ratios = self.loss.as_ref().map(|l| l.ratios.as_slice()).unwrap_or(&[]);
        [
            ratios.first().copied().unwrap_or(0.15),
            ratios.get(1).copied().unwrap_or(0.6),
            ratios.get(2).copied().unwrap_or(1.0),
        ]
    }

    fn csv_delimiter(&self) -> u8 {
        self.output
            .csv_separator
            .as_ref()
            .and_then(|s| s.as_bytes().first().copied())
            .unwrap_or(b';')
    }

    fn bundle_outputs(&self) -> bool {
        self.output.bundle.unwrap_or(false)
    }
}

impl Validate for JobConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::FitMethod;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[job]
name = "rc-frame-assessment"

[inputs]
capacity_csv = "capacity.csv"
building_params_csv = "building.csv"
gmrs_dir = "./gmrs"

[scaling]
min_scale = 0.0
max_scale = 2.0
increment = 0.25
fast_mode = true

[fit]
method = "glm"
link = "probit"

[output]
dir = "./out"
bundle = true
"#;

    #[test]
    fn parses_basic_job() {
        let config = JobConfig::from_toml_str(BASIC).unwrap();
        assert_eq!(config.job.name, "rc-frame-assessment");
        assert!(config.fast_mode());
        assert!(config.bundle_outputs());
        assert_eq!(config.fit().method, FitMethod::Glm);
        assert_eq!(
            config.fit().link,
            crate::domain::model::LinkFunction::Probit
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = JobConfig::from_toml_str(BASIC).unwrap();
        assert_eq!(config.idealization(), IdealizationMethod::Epp);
        assert_eq!(config.idealization_tolerance(), 0.001);
        assert_eq!(config.loss_ratios(), [0.15, 0.6, 1.0]);
        assert_eq!(config.csv_delimiter(), b';');
        let analysis = config.analysis();
        assert_eq!(analysis.damping_ratio, 0.05);
        assert_eq!(analysis.period_max, 4.0);
    }

    #[test]
    fn env_var_substitution() {
        std::env::set_var("ASFRAVAB_TEST_GMRS", "/data/records");

        let toml_content = BASIC.replace("./gmrs", "${ASFRAVAB_TEST_GMRS}");
        let config = JobConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.gmrs_dir(), "/data/records");

        std::env::remove_var("ASFRAVAB_TEST_GMRS");
    }

    #[test]
    fn unknown_env_vars_stay_literal() {
        let toml_content = BASIC.replace("./gmrs", "${ASFRAVAB_NO_SUCH_VAR}");
        let config = JobConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.gmrs_dir(), "${ASFRAVAB_NO_SUCH_VAR}");
    }

    #[test]
    fn bad_fit_method_fails_validation() {
        let toml_content = BASIC.replace("glm", "kriging");
        let config = JobConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_increment_fails_validation() {
        let toml_content = BASIC.replace("increment = 0.25", "increment = 0.0");
        let config = JobConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = JobConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.job.name, "rc-frame-assessment");
    }
}
