//! grabcore - retrieval engine behind the grab Telegram bot
//!
//! Turns a media URL plus a requested output kind into a local file that is
//! small enough to deliver, and makes sure that file never outlives the request.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, process helpers
//! - `download`: format policy, extractor driver, artifact lifecycle,
//!   retrieval orchestrator, worker pool, delivery gate

pub mod core;
pub mod download;

// Re-export commonly used types for convenience
pub use core::{AppError, AppResult, Config};
pub use download::{
    deliver, Artifact, DeliveryGate, FormatConstraint, FormatPolicy, GateDecision, MediaKind, RetrievalOutcome,
    RetrievalRequest, RetrievalService, Uploader,
};
