use thiserror::Error;

use crate::core::config::ConfigError;
use crate::download::error::{DeliveryError, RetrievalError};

/// Centralized error types for the application
///
/// Per-layer errors (configuration, retrieval, delivery) convert into this
/// enum so the binary has one type to report. Request-level failures never
/// reach it; they are turned into chat messages by the transport instead.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Telegram API errors
    #[cfg(feature = "telegram")]
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// A URL given on the command line did not parse
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Retrieval failures surfaced outside the bot (CLI)
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Delivery failures surfaced outside the bot (CLI)
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Logger could not be installed
    #[error("Logger error: {0}")]
    Logger(#[from] log::SetLoggerError),

    /// Anyhow errors (bot client setup)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
