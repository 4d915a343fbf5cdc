//! Handler types and dependencies

use grabcore::download::{DeliveryGate, FormatPolicy, RetrievalService};
use grabcore::MediaKind;

use crate::telegram::PendingLinks;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub retrieval: RetrievalService,
    pub gate: DeliveryGate,
    pub pending: PendingLinks,
}

impl HandlerDeps {
    pub fn new(retrieval: RetrievalService, gate: DeliveryGate, pending: PendingLinks) -> Self {
        Self {
            retrieval,
            gate,
            pending,
        }
    }

    pub fn policy(&self) -> &FormatPolicy {
        self.retrieval.retriever().policy()
    }

    /// Ceiling quoted in /start and /help
    pub fn advertised_ceiling(&self) -> u64 {
        self.gate.ceiling_for(MediaKind::Video)
    }
}
