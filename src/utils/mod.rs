pub mod error;
pub mod logger;
pub mod monitor;
pub mod paths;
#[cfg(feature = "cli")]
pub mod progress;
pub mod validation;
