//! Delivery gate: the last check before an upload.
//!
//! Measures the real file on disk and compares it with the transport ceiling.
//! The format policy only guesses at size; this is where it is enforced.

use crate::core::config::bytes_to_mb;
use crate::download::artifact::Artifact;
use crate::download::error::DeliveryError;
use crate::download::types::MediaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Deliver { size_bytes: u64 },
    Reject { size_bytes: u64, ceiling_bytes: u64 },
}

impl GateDecision {
    pub fn size_bytes(&self) -> u64 {
        match self {
            GateDecision::Deliver { size_bytes } | GateDecision::Reject { size_bytes, .. } => *size_bytes,
        }
    }

    pub fn size_mb(&self) -> f64 {
        bytes_to_mb(self.size_bytes())
    }

    pub fn is_deliver(&self) -> bool {
        matches!(self, GateDecision::Deliver { .. })
    }
}

/// Size ceilings per media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryGate {
    audio_ceiling_bytes: u64,
    video_ceiling_bytes: u64,
}

impl DeliveryGate {
    /// Same ceiling for every kind
    pub fn new(ceiling_bytes: u64) -> Self {
        Self::with_ceilings(ceiling_bytes, ceiling_bytes)
    }

    pub fn with_ceilings(audio_ceiling_bytes: u64, video_ceiling_bytes: u64) -> Self {
        Self {
            audio_ceiling_bytes,
            video_ceiling_bytes,
        }
    }

    pub fn ceiling_for(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Audio => self.audio_ceiling_bytes,
            MediaKind::Video => self.video_ceiling_bytes,
        }
    }

    /// Rejects iff `size_bytes` is strictly above the ceiling.
    pub fn check(&self, size_bytes: u64, kind: MediaKind) -> GateDecision {
        let ceiling_bytes = self.ceiling_for(kind);
        if size_bytes > ceiling_bytes {
            GateDecision::Reject {
                size_bytes,
                ceiling_bytes,
            }
        } else {
            GateDecision::Deliver { size_bytes }
        }
    }

    /// Measures the artifact and decides.
    pub fn gate(&self, artifact: &Artifact) -> Result<GateDecision, DeliveryError> {
        let size_bytes = artifact.size_bytes().map_err(DeliveryError::Measure)?;
        let decision = self.check(size_bytes, artifact.kind());

        match decision {
            GateDecision::Deliver { .. } => {
                log::info!("[{}] {:.2} MB passes the gate", artifact.stem(), decision.size_mb());
            }
            GateDecision::Reject { ceiling_bytes, .. } => {
                log::warn!(
                    "[{}] {:.2} MB exceeds the {:.2} MB ceiling",
                    artifact.stem(),
                    decision.size_mb(),
                    bytes_to_mb(ceiling_bytes)
                );
            }
        }
        Ok(decision)
    }
}
