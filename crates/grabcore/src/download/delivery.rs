//! Gate-then-upload, with cleanup on every path.

use async_trait::async_trait;
use std::path::Path;

use crate::download::artifact::Artifact;
use crate::download::error::DeliveryError;
use crate::download::gate::{DeliveryGate, GateDecision};
use crate::download::types::MediaKind;

/// What the transport needs to send one file.
#[derive(Debug, Clone, Copy)]
pub struct UploadItem<'a> {
    pub path: &'a Path,
    pub kind: MediaKind,
    pub title: &'a str,
    pub duration_secs: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl<'a> UploadItem<'a> {
    pub fn from_artifact(artifact: &'a Artifact) -> Self {
        Self {
            path: artifact.path(),
            kind: artifact.kind(),
            title: artifact.title(),
            duration_secs: artifact.duration_secs(),
            width: artifact.width(),
            height: artifact.height(),
        }
    }
}

/// Chat-transport upload seam.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, item: UploadItem<'_>) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivered {
    pub size_bytes: u64,
    pub kind: MediaKind,
}

/// Gates the artifact and uploads it if it fits.
///
/// Takes the artifact by value: whatever the result, it is dropped before
/// this returns, which deletes its files and frees its worker slot.
pub async fn deliver(
    artifact: Artifact,
    gate: &DeliveryGate,
    uploader: &dyn Uploader,
) -> Result<Delivered, DeliveryError> {
    let size_bytes = match gate.gate(&artifact)? {
        GateDecision::Deliver { size_bytes } => size_bytes,
        GateDecision::Reject {
            size_bytes,
            ceiling_bytes,
        } => {
            return Err(DeliveryError::TooLarge {
                size_bytes,
                ceiling_bytes,
            });
        }
    };

    log::info!("[{}] uploading {} ({} bytes)", artifact.stem(), artifact.kind(), size_bytes);

    match uploader.upload(UploadItem::from_artifact(&artifact)).await {
        Ok(()) => {
            log::info!("[{}] delivered", artifact.stem());
            Ok(Delivered {
                size_bytes,
                kind: artifact.kind(),
            })
        }
        Err(e) => {
            log::error!("[{}] upload failed: {:#}", artifact.stem(), e);
            Err(DeliveryError::UploadFailed(e.to_string()))
        }
    }
}
