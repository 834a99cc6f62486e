use crate::utils::error::{AssessmentError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AssessmentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(AssessmentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive(field_name: &str, value: f64) -> Result<()> {
    if !(value > 0.0) {
        return Err(AssessmentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be greater than 0".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(AssessmentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_ordered(field_name: &str, low: f64, high: f64) -> Result<()> {
    if low > high {
        return Err(AssessmentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{}..{}", low, high),
            reason: "Lower bound must not exceed upper bound".to_string(),
        });
    }
    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[String],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for file in files {
        let extension = std::path::Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str());
        match extension {
            Some(ext) if allowed_set.contains(ext.to_ascii_lowercase().as_str()) => {}
            Some(ext) => {
                return Err(AssessmentError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.clone(),
                    reason: format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        ext,
                        allowed_extensions.join(", ")
                    ),
                });
            }
            None => {
                return Err(AssessmentError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.clone(),
                    reason: "File has no extension or invalid filename".to_string(),
                });
            }
        }
    }

    Ok(())
}

/// Loss ratios: three values in [0, 1], non-decreasing from slight to
/// near-collapse.
pub fn validate_loss_ratios(field_name: &str, ratios: &[f64]) -> Result<()> {
    if ratios.len() != 3 {
        return Err(AssessmentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{:?}", ratios),
            reason: "Exactly three loss ratios are required (ds1, ds2, ds3)".to_string(),
        });
    }
    for (i, &r) in ratios.iter().enumerate() {
        validate_range(&format!("{}[{}]", field_name, i), r, 0.0, 1.0)?;
    }
    if ratios.windows(2).any(|w| w[0] > w[1]) {
        return Err(AssessmentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{:?}", ratios),
            reason: "Loss ratios must be non-decreasing across damage states".to_string(),
        });
    }
    Ok(())
}
