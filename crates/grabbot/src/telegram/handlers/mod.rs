//! Telegram bot handler tree configuration
//!
//! The dispatcher schema is built from explicit dependencies, so tests and
//! production use the same tree.

mod commands;
mod downloads;
mod schema;
mod types;

pub use commands::detect_url;
pub use downloads::{failure_text, run_request};
pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
