//! Retrieval orchestrator.
//!
//! One request runs: allocate stem → probe → decide constraints → extract →
//! verify the file exists. All of it is blocking work and runs on tokio's
//! blocking pool inside a worker slot, so the dispatcher keeps serving other
//! chats while an extraction is in flight.

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::RetrievalConfig;
use crate::download::artifact::{Artifact, ArtifactGuard};
use crate::download::error::{ExtractError, RetrievalError};
use crate::download::extractor::{Extractor, ProbedMetadata};
use crate::download::policy::FormatPolicy;
use crate::download::pool::{AdmissionPolicy, WorkerPool};
use crate::download::types::RetrievalRequest;
use crate::download::ytdlp::YtDlpExtractor;

/// Title used when the source has none, or the probe was skipped
const FALLBACK_TITLE: &str = "Untitled";

/// Result of one retrieval. Never a panic, never a silent nothing.
#[derive(Debug)]
pub enum RetrievalOutcome {
    Success(Artifact),
    Failure(RetrievalError),
}

impl RetrievalOutcome {
    pub fn into_result(self) -> Result<Artifact, RetrievalError> {
        match self {
            RetrievalOutcome::Success(artifact) => Ok(artifact),
            RetrievalOutcome::Failure(e) => Err(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetrievalOutcome::Success(_))
    }
}

impl From<Result<Artifact, RetrievalError>> for RetrievalOutcome {
    fn from(result: Result<Artifact, RetrievalError>) -> Self {
        match result {
            Ok(artifact) => RetrievalOutcome::Success(artifact),
            Err(e) => RetrievalOutcome::Failure(e),
        }
    }
}

/// Synchronous pipeline for a single request.
pub struct Retriever {
    extractor: Arc<dyn Extractor>,
    policy: FormatPolicy,
    work_dir: PathBuf,
    /// Whether a failed probe fails the request or just leaves the duration unknown
    probe_required: bool,
}

impl Retriever {
    pub fn new(extractor: Arc<dyn Extractor>, policy: FormatPolicy, work_dir: PathBuf, probe_required: bool) -> Self {
        Self {
            extractor,
            policy,
            work_dir,
            probe_required,
        }
    }

    pub fn policy(&self) -> &FormatPolicy {
        &self.policy
    }

    /// Blocks until the artifact exists or the request has failed. Any file
    /// produced on a failure path is already gone when this returns.
    pub fn retrieve_blocking(&self, request: &RetrievalRequest) -> RetrievalOutcome {
        self.run(request).into()
    }

    fn run(&self, request: &RetrievalRequest) -> Result<Artifact, RetrievalError> {
        let guard = ArtifactGuard::acquire(&self.work_dir).map_err(RetrievalError::WorkDir)?;
        let stem = guard.stem().clone();
        let kind = request.kind();

        log::info!("[{}] {} requested for {}", stem, kind, request.url());

        let meta = match self.extractor.probe(request.url()) {
            Ok(meta) => meta,
            Err(e) if self.probe_required => {
                log_extract_error(&stem.to_string(), "probe", &e);
                return Err(RetrievalError::ProbeFailed(e));
            }
            Err(e) => {
                log::warn!("[{}] probe failed, continuing with unknown duration: {}", stem, e);
                ProbedMetadata {
                    title: FALLBACK_TITLE.to_string(),
                    duration_secs: None,
                }
            }
        };

        let constraint = self.policy.decide(kind, meta.duration_secs);
        log::info!(
            "[{}] \"{}\" duration={:?}s → {} max_height={:?} format={}",
            stem,
            meta.title,
            meta.duration_secs,
            constraint.container,
            constraint.max_height,
            constraint.selection
        );

        let report = match self
            .extractor
            .extract(request.url(), &constraint, &guard.output_template())
        {
            Ok(report) => report,
            Err(e) => {
                log_extract_error(&stem.to_string(), "extract", &e);
                return Err(RetrievalError::ExtractionFailed(e));
            }
        };

        let path = guard.expected_path(constraint.container);
        if !path.is_file() {
            log::error!(
                "[{}] {} reported success but {} is missing (found {:?})",
                stem,
                self.extractor.name(),
                path.display(),
                guard.produced_files()
            );
            return Err(RetrievalError::ArtifactMissing(path));
        }

        log::info!("[{}] extracted {}", stem, path.display());
        Ok(Artifact::new(guard, path, meta.title, kind, meta.duration_secs, report))
    }
}

fn log_extract_error(stem: &str, stage: &str, e: &ExtractError) {
    match e.kind() {
        Some(kind) if crate::download::ytdlp_errors::is_operational(kind) => {
            log::error!("[{}] {} failed [{}]: {}", stem, stage, kind, e);
        }
        Some(kind) => log::warn!("[{}] {} failed [{}]: {}", stem, stage, kind, e),
        None => log::error!("[{}] {} failed: {}", stem, stage, e),
    }
}

/// Async front of the [`Retriever`]: admission control plus the blocking pool.
#[derive(Clone)]
pub struct RetrievalService {
    retriever: Arc<Retriever>,
    pool: WorkerPool,
}

impl RetrievalService {
    pub fn new(retriever: Retriever, pool: WorkerPool) -> Self {
        Self {
            retriever: Arc::new(retriever),
            pool,
        }
    }

    /// Production wiring: yt-dlp extractor with the configured tier settings.
    pub fn from_config(config: &RetrievalConfig) -> Self {
        let extractor = Arc::new(YtDlpExtractor::new(config.extractor.clone()));
        let retriever = Retriever::new(
            extractor,
            config.policy.clone(),
            config.work_dir.clone(),
            config.probe_required,
        );
        Self::new(retriever, WorkerPool::new(config.max_concurrent, config.admission))
    }

    /// Waits for (or is refused) a worker slot, then runs the request off the
    /// async executor. The slot travels with the artifact and is freed when
    /// the artifact is dropped.
    pub async fn retrieve(&self, request: RetrievalRequest) -> RetrievalOutcome {
        let slot = match self.pool.admit().await {
            Ok(slot) => slot,
            Err(e) => {
                log::warn!("Rejected {} request for {}: {}", request.kind(), request.url(), e);
                return RetrievalOutcome::Failure(e);
            }
        };

        let retriever = Arc::clone(&self.retriever);
        let joined = tokio::task::spawn_blocking(move || retriever.retrieve_blocking(&request)).await;

        match joined {
            Ok(RetrievalOutcome::Success(mut artifact)) => {
                artifact.attach_slot(slot);
                RetrievalOutcome::Success(artifact)
            }
            Ok(failure) => failure,
            Err(e) => {
                log::error!("Retrieval worker died: {}", e);
                RetrievalOutcome::Failure(RetrievalError::WorkerFailed(e.to_string()))
            }
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn admission_policy(&self) -> AdmissionPolicy {
        self.pool.policy()
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }
}
