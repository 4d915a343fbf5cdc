//! Retrieval engine: from a URL and a requested kind to a deliverable file.
//!
//! Flow: [`RetrievalService`] admits the request into a worker slot, runs
//! [`retrieval::Retriever`] on the blocking pool (probe → [`FormatPolicy`] →
//! extract → verify), and hands back an [`Artifact`]. [`deliver`] passes it
//! through the [`DeliveryGate`] to an [`Uploader`]. The artifact's guard
//! deletes every file of the request when it is dropped.

pub mod artifact;
pub mod delivery;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod policy;
pub mod pool;
pub mod retrieval;
pub mod types;
pub mod ytdlp;
pub mod ytdlp_errors;

pub use artifact::{Artifact, ArtifactGuard, FileStem};
pub use delivery::{deliver, Delivered, UploadItem, Uploader};
pub use error::{DeliveryError, ExtractError, RetrievalError};
pub use extractor::{ExtractReport, Extractor, ProbedMetadata};
pub use gate::{DeliveryGate, GateDecision};
pub use policy::{FormatConstraint, FormatPolicy};
pub use pool::{AdmissionPolicy, WorkerPool, WorkerSlot};
pub use retrieval::{RetrievalOutcome, RetrievalService, Retriever};
pub use types::{MediaKind, RetrievalRequest};
pub use ytdlp::YtDlpExtractor;
