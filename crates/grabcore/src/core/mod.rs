//! Core utilities, configuration, and common functionality

pub mod config;
pub mod error;
pub mod logging;
pub mod process;

// Re-exports for convenience
pub use config::{Config, ConfigError, DeploymentTier, RetrievalConfig};
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_retrieval_configuration};
