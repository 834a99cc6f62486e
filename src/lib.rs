pub mod config;
pub mod core;
pub mod domain;
pub mod seismic;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::cli::LocalStorage;
pub use crate::core::{engine::AssessmentEngine, pipeline::AssessmentPipeline, refit::RefitPipeline};
pub use utils::error::{AssessmentError, Result};
