use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssessmentError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration field '{field}' is missing")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Io,
    Data,
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AssessmentError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::ZipError(_) => ErrorCategory::Io,
            Self::CsvError(_) | Self::SerializationError(_) | Self::ValidationError { .. } => {
                ErrorCategory::Data
            }
            Self::ProcessingError { .. } => ErrorCategory::Numeric,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Numeric => ErrorSeverity::Medium,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::ConfigError { .. } | Self::ConfigValidationError { .. } => {
                "Check the job file against the documented tables and field names".to_string()
            }
            Self::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            Self::InvalidConfigValueError { field, .. } => {
                format!("Correct the value supplied for '{}'", field)
            }
            Self::CsvError(_) => {
                "Verify the CSV delimiter and column headers of the input files".to_string()
            }
            Self::IoError(_) => {
                "Check that the input paths exist and the output folder is writable".to_string()
            }
            Self::ZipError(_) => "Disable output bundling or free up disk space".to_string(),
            Self::SerializationError(_) => {
                "Delete the corrupt settings/summary file and rerun".to_string()
            }
            Self::ProcessingError { .. } => {
                "Review the capacity curve and scale range; widen the tolerance if needed"
                    .to_string()
            }
            Self::ValidationError { .. } => {
                "Fix the reported input data problem and rerun".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Io => format!("File access problem: {}", self),
            ErrorCategory::Data => format!("Input data problem: {}", self),
            ErrorCategory::Numeric => format!("Analysis problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssessmentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_high_severity() {
        let err = AssessmentError::MissingConfigError {
            field: "capacity".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.recovery_suggestion().contains("capacity"));
    }

    #[test]
    fn io_errors_are_critical() {
        let err = AssessmentError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().contains("File access"));
    }

    #[test]
    fn processing_errors_are_numeric() {
        let err = AssessmentError::ProcessingError {
            message: "did not converge".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Numeric);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }
}
