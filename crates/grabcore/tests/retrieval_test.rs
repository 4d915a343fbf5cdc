//! End-to-end tests for the retrieval engine: policy, orchestrator, gate,
//! delivery and cleanup, with a fake extractor and uploader.
//!
//! Run with: cargo test -p grabcore --test retrieval_test

mod common;

use common::{files_in, test_url, ExtractMode, FakeExtractor, RecordingUploader, MB};
use grabcore::core::config::mb_to_bytes;
use grabcore::download::{
    deliver, AdmissionPolicy, DeliveryError, DeliveryGate, FormatPolicy, RetrievalError, RetrievalOutcome,
    RetrievalService, Retriever, WorkerPool,
};
use grabcore::{MediaKind, RetrievalRequest};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn service(extractor: Arc<FakeExtractor>, dir: &TempDir, slots: usize, policy: AdmissionPolicy) -> RetrievalService {
    let retriever = Retriever::new(extractor, FormatPolicy::default(), dir.path().to_path_buf(), true);
    RetrievalService::new(retriever, WorkerPool::new(slots, policy))
}

fn standard_gate() -> DeliveryGate {
    DeliveryGate::new(mb_to_bytes(49.5))
}

fn request(kind: MediaKind) -> RetrievalRequest {
    RetrievalRequest::new(test_url(), kind)
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

mod scenarios {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_short_video_gets_high_tier_and_is_delivered() {
        let dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::new(Some(180), 12 * MB));
        let service = service(extractor.clone(), &dir, 2, AdmissionPolicy::Reject);

        let artifact = service.retrieve(request(MediaKind::Video)).await.into_result().unwrap();
        assert_eq!(artifact.title(), "Test Video");
        assert_eq!(artifact.path().extension().unwrap(), "mp4");
        assert_eq!(artifact.height(), Some(720));

        let uploader = RecordingUploader::new();
        let delivered = deliver(artifact, &standard_gate(), &uploader).await.unwrap();
        assert_eq!(delivered.size_bytes, 12 * MB);

        let constraints = extractor.constraints();
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].max_height, Some(720));

        let uploads = uploader.records();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].existed);
        assert_eq!(uploads[0].kind, MediaKind::Video);

        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_long_video_gets_low_tier_and_oversize_is_rejected() {
        let dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::new(Some(1200), 60 * MB));
        let service = service(extractor.clone(), &dir, 2, AdmissionPolicy::Reject);

        let artifact = service.retrieve(request(MediaKind::Video)).await.into_result().unwrap();
        assert_eq!(extractor.constraints()[0].max_height, Some(480));

        let uploader = RecordingUploader::new();
        let err = deliver(artifact, &standard_gate(), &uploader).await.unwrap_err();

        match err {
            DeliveryError::TooLarge {
                size_bytes,
                ceiling_bytes,
            } => {
                assert_eq!(size_bytes, 60 * MB);
                assert_eq!(ceiling_bytes, 51_904_512);
            }
            other => panic!("expected TooLarge, got {:?}", other),
        }
        assert!(uploader.records().is_empty());
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_audio_gets_mp3_regardless_of_duration() {
        for duration in [Some(30), Some(900), Some(5400), None] {
            let dir = TempDir::new().unwrap();
            let extractor = Arc::new(FakeExtractor::new(duration, 4 * MB));
            let service = service(extractor.clone(), &dir, 2, AdmissionPolicy::Reject);

            let artifact = service.retrieve(request(MediaKind::Audio)).await.into_result().unwrap();
            assert_eq!(artifact.path().extension().unwrap(), "mp3");
            assert_eq!(artifact.kind(), MediaKind::Audio);

            let constraint = &extractor.constraints()[0];
            assert_eq!(constraint.container, "mp3");
            assert_eq!(constraint.selection, "bestaudio/best");
            assert_eq!(constraint.max_height, None);

            deliver(artifact, &standard_gate(), &RecordingUploader::new()).await.unwrap();
            assert!(files_in(dir.path()).is_empty());
        }
    }

    #[tokio::test]
    async fn test_extractor_error_is_a_clean_failure() {
        let dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::new(Some(180), MB).with_mode(ExtractMode::Fail));
        let service = service(extractor, &dir, 2, AdmissionPolicy::Reject);

        let outcome = service.retrieve(request(MediaKind::Video)).await;
        let err = outcome.into_result().unwrap_err();

        assert!(matches!(err, RetrievalError::ExtractionFailed(_)));
        assert_eq!(err.reason(), "download_failed");
        assert!(files_in(dir.path()).is_empty());
    }
}

// ============================================================================
// Failure paths
// ============================================================================

mod failures {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_required_probe_failure_fails_before_extraction() {
        let dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::new(Some(180), MB).with_probe_failure());
        let service = service(extractor.clone(), &dir, 2, AdmissionPolicy::Reject);

        let err = service.retrieve(request(MediaKind::Video)).await.into_result().unwrap_err();
        assert!(matches!(err, RetrievalError::ProbeFailed(_)));
        assert!(extractor.constraints().is_empty());
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_optional_probe_failure_treats_duration_as_short() {
        let dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::new(Some(3600), MB).with_probe_failure());
        let retriever = Retriever::new(extractor.clone(), FormatPolicy::default(), dir.path().to_path_buf(), false);
        let service = RetrievalService::new(retriever, WorkerPool::new(1, AdmissionPolicy::Reject));

        let artifact = service.retrieve(request(MediaKind::Video)).await.into_result().unwrap();
        assert_eq!(artifact.title(), "Untitled");
        assert_eq!(artifact.duration_secs(), None);
        assert_eq!(extractor.constraints()[0].max_height, Some(720));

        drop(artifact);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_missing_output_is_a_failure_even_on_reported_success() {
        let dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::new(Some(180), MB).with_mode(ExtractMode::NoFile));
        let service = service(extractor, &dir, 2, AdmissionPolicy::Reject);

        let err = service.retrieve(request(MediaKind::Audio)).await.into_result().unwrap_err();
        match err {
            RetrievalError::ArtifactMissing(path) => assert_eq!(path.extension().unwrap(), "mp3"),
            other => panic!("expected ArtifactMissing, got {:?}", other),
        }
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces_transport_text_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::new(Some(180), MB));
        let service = service(extractor, &dir, 2, AdmissionPolicy::Reject);

        let artifact = service.retrieve(request(MediaKind::Video)).await.into_result().unwrap();
        let uploader = RecordingUploader::failing("Bad Request: wrong file identifier");
        let err = deliver(artifact, &standard_gate(), &uploader).await.unwrap_err();

        match err {
            DeliveryError::UploadFailed(text) => assert!(text.contains("wrong file identifier")),
            other => panic!("expected UploadFailed, got {:?}", other),
        }
        assert!(uploader.records()[0].existed);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_extractor_panic_becomes_worker_failure() {
        let dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::new(Some(180), MB).with_mode(ExtractMode::Panic));
        let service = service(extractor, &dir, 1, AdmissionPolicy::Reject);

        let err = service.retrieve(request(MediaKind::Video)).await.into_result().unwrap_err();
        assert!(matches!(err, RetrievalError::WorkerFailed(_)));
        assert_eq!(err.reason(), "download_failed");
        assert!(files_in(dir.path()).is_empty());

        // the slot came back
        assert_eq!(service.pool().available(), 1);
    }
}

// ============================================================================
// Concurrency and admission
// ============================================================================

mod concurrency {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_retrievals_use_distinct_stems() {
        let dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::new(Some(60), 1024).with_delay(Duration::from_millis(20)));
        let service = service(extractor.clone(), &dir, 16, AdmissionPolicy::Queue);

        let mut handles = Vec::new();
        for i in 0..16 {
            let service = service.clone();
            let kind = if i % 2 == 0 { MediaKind::Audio } else { MediaKind::Video };
            handles.push(tokio::spawn(async move { service.retrieve(request(kind)).await }));
        }

        let mut artifacts = Vec::new();
        for handle in handles {
            artifacts.push(handle.await.unwrap().into_result().unwrap());
        }

        let stems: HashSet<String> = artifacts.iter().map(|a| a.stem().to_string()).collect();
        assert_eq!(stems.len(), 16);

        let templates: HashSet<_> = extractor.output_templates().into_iter().collect();
        assert_eq!(templates.len(), 16);

        drop(artifacts);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_busy_when_all_slots_are_taken() {
        let dir = TempDir::new().unwrap();
        let extractor = Arc::new(FakeExtractor::new(Some(60), 1024));
        let service = service(extractor, &dir, 1, AdmissionPolicy::Reject);
        assert_eq!(service.admission_policy(), AdmissionPolicy::Reject);

        // an undelivered artifact keeps its slot
        let held = service.retrieve(request(MediaKind::Audio)).await.into_result().unwrap();
        assert_eq!(service.pool().available(), 0);

        let outcome = service.retrieve(request(MediaKind::Audio)).await;
        match outcome {
            RetrievalOutcome::Failure(err) => {
                assert!(matches!(err, RetrievalError::Busy(1)));
                assert_eq!(err.reason(), "busy");
            }
            RetrievalOutcome::Success(_) => panic!("second request should have been turned away"),
        }

        drop(held);
        assert_eq!(service.pool().available(), 1);
        assert!(service.retrieve(request(MediaKind::Audio)).await.is_success());
    }
}

// ============================================================================
// Extractor timeouts, with a scripted yt-dlp
// ============================================================================

#[cfg(unix)]
mod timeouts {
    use super::*;
    use pretty_assertions::assert_eq;
    use grabcore::core::config::ExtractorConfig;
    use grabcore::core::process::ProcessError;
    use grabcore::download::{ExtractError, YtDlpExtractor};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    /// Probes fine; on extract, leaves a background writer behind (the way
    /// yt-dlp leaves ffmpeg) and hangs.
    const SLOW_YTDLP: &str = r#"#!/bin/sh
case " $* " in
  *" --dump-single-json "*) echo '{"title":"Slow","duration":60}'; exit 0 ;;
esac
while [ $# -gt 0 ]; do
  [ "$1" = "-o" ] && template="$2"
  shift
done
out=$(printf '%s' "$template" | sed 's/%(ext)s$/mp4/')
( sleep 2; echo data > "$out" ) &
sleep 30
"#;

    fn install_script(dir: &Path) -> String {
        let path = dir.join("yt-dlp");
        std::fs::write(&path, SLOW_YTDLP).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_extract_timeout_leaves_no_late_files() {
        let bin_dir = TempDir::new().unwrap();
        let work_dir = TempDir::new().unwrap();

        let extractor = YtDlpExtractor::new(ExtractorConfig {
            bin: install_script(bin_dir.path()),
            socket_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(10),
            extract_timeout: Duration::from_millis(800),
            player_client: None,
        });
        let retriever = Retriever::new(
            Arc::new(extractor),
            FormatPolicy::default(),
            work_dir.path().to_path_buf(),
            true,
        );
        let service = RetrievalService::new(retriever, WorkerPool::new(1, AdmissionPolicy::Reject));

        match service.retrieve(request(MediaKind::Video)).await {
            RetrievalOutcome::Failure(RetrievalError::ExtractionFailed(ExtractError::Process {
                stage: "extract",
                source: ProcessError::Timeout { .. },
            })) => {}
            other => panic!("expected an extract timeout, got {:?}", other),
        }
        assert!(files_in(work_dir.path()).is_empty());
        assert_eq!(service.pool().available(), 1);

        // past the point where the background writer would have run
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(files_in(work_dir.path()), Vec::<std::path::PathBuf>::new());
    }
}
