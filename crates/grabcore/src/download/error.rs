use std::path::PathBuf;
use thiserror::Error;

use crate::core::config::bytes_to_mb;
use crate::core::process::ProcessError;
use crate::download::ytdlp_errors::YtDlpErrorType;

/// Stable reason code for every extraction-path failure
pub const REASON_DOWNLOAD_FAILED: &str = "download_failed";
/// Reason code when admission control turns a request away
pub const REASON_BUSY: &str = "busy";

/// Failure of a single extractor invocation.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Could not run the process at all, or it ran out of time
    #[error("{stage}: {source}")]
    Process {
        stage: &'static str,
        #[source]
        source: ProcessError,
    },

    /// The extractor ran and exited non-zero
    #[error("{stage} exited with code {code:?} ({kind:?}): {stderr}")]
    Failed {
        stage: &'static str,
        code: Option<i32>,
        kind: YtDlpErrorType,
        stderr: String,
    },

    /// Probe succeeded but its output could not be read
    #[error("unreadable probe output: {0}")]
    BadProbeOutput(String),
}

impl ExtractError {
    /// Category for logs
    pub fn kind(&self) -> Option<&YtDlpErrorType> {
        match self {
            ExtractError::Failed { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

/// Why a retrieval produced no artifact.
///
/// All variants except `Busy` collapse into one user-facing "download failed"
/// message; the details only go to the log.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("probe failed: {0}")]
    ProbeFailed(#[source] ExtractError),

    #[error("extraction failed: {0}")]
    ExtractionFailed(#[source] ExtractError),

    /// Extractor reported success but the expected file is not there
    #[error("extractor reported success but {} is missing", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("cannot prepare work directory: {0}")]
    WorkDir(#[source] std::io::Error),

    /// The blocking worker panicked or was torn down
    #[error("retrieval worker failed: {0}")]
    WorkerFailed(String),

    /// Every worker slot is taken and the pool rejects instead of queueing
    #[error("all {0} retrieval slots are busy")]
    Busy(usize),
}

impl RetrievalError {
    pub fn reason(&self) -> &'static str {
        match self {
            RetrievalError::Busy(_) => REASON_BUSY,
            _ => REASON_DOWNLOAD_FAILED,
        }
    }
}

/// Why a produced artifact did not reach the user.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("file is {:.1} MB, the limit is {:.1} MB", mb(.size_bytes), mb(.ceiling_bytes))]
    TooLarge { size_bytes: u64, ceiling_bytes: u64 },

    /// Transport rejected the upload for a reason other than size
    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("cannot measure artifact: {0}")]
    Measure(#[source] std::io::Error),
}

fn mb(bytes: &u64) -> f64 {
    bytes_to_mb(*bytes)
}
