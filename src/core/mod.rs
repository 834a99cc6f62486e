pub mod engine;
pub mod pipeline;
pub mod refit;

pub use crate::domain::model::{AssessmentInputs, AssessmentResult, RunReport};
pub use crate::domain::ports::{JobProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
