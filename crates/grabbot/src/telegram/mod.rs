//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;
pub mod keyboard;
pub mod messages;
pub mod pending;
pub mod uploader;

/// Bot type used across handlers
pub type Bot = teloxide::Bot;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use pending::PendingLinks;
pub use uploader::TelegramUploader;
