use super::*;
use crate::camera::{CameraProvider, MockCameraProvider};
use crate::capture::JpegFrameExtractor;
use crate::error::IdentificationError;
use crate::events::{EventBus, SessionEvent};
use crate::identify::{Assessment, ClassificationService, IdentificationResult, Suggestion};
use crate::share::{PhotoSharer, ShareOutcome};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Classification service answering from a script
struct FakeClassifier {
    suggestions: Vec<(&'static str, f64)>,
    // Calls from this index on fail
    fail_from: usize,
    calls: AtomicUsize,
    // Requests wait for a permit when gated
    gate: Option<Arc<Semaphore>>,
}

impl FakeClassifier {
    fn suggesting(suggestions: Vec<(&'static str, f64)>) -> Arc<Self> {
        Arc::new(Self {
            suggestions,
            fail_from: usize::MAX,
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            suggestions: Vec::new(),
            fail_from: 0,
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    /// Succeeds for the first `successes` calls, then fails
    fn failing_after(successes: usize, suggestions: Vec<(&'static str, f64)>) -> Arc<Self> {
        Arc::new(Self {
            suggestions,
            fail_from: successes,
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    fn gated(suggestions: Vec<(&'static str, f64)>, gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            suggestions,
            fail_from: usize::MAX,
            calls: AtomicUsize::new(0),
            gate: Some(gate),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationService for FakeClassifier {
    async fn identify(&self, image: &str) -> Result<IdentificationResult, IdentificationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!image.starts_with("data:"), "payload must be raw base64");

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        if call >= self.fail_from {
            return Err(IdentificationError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }

        Ok(IdentificationResult {
            suggestions: self
                .suggestions
                .iter()
                .map(|(name, probability)| Suggestion {
                    name: name.to_string(),
                    probability: *probability,
                    similar_images: Vec::new(),
                })
                .collect(),
            is_plant: Some(Assessment {
                binary: true,
                probability: 0.98,
            }),
            is_healthy: None,
        })
    }
}

struct Harness {
    camera: Arc<MockCameraProvider>,
    classifier: Arc<FakeClassifier>,
    bus: Arc<EventBus>,
    controller: CaptureSessionController,
    _downloads: tempfile::TempDir,
}

fn harness_with(camera: MockCameraProvider, classifier: Arc<FakeClassifier>) -> Harness {
    let camera = Arc::new(camera);
    let bus = Arc::new(EventBus::new(64));
    let downloads = tempfile::tempdir().unwrap();
    let sharer = Arc::new(PhotoSharer::new(downloads.path(), None));

    let controller = CaptureSessionController::new(
        Arc::clone(&camera) as Arc<dyn CameraProvider>,
        Arc::new(JpegFrameExtractor::default()),
        Arc::clone(&classifier) as Arc<dyn ClassificationService>,
        sharer,
        Arc::clone(&bus),
        3,
    );

    Harness {
        camera,
        classifier,
        bus,
        controller,
        _downloads: downloads,
    }
}

fn harness(classifier: Arc<FakeClassifier>) -> Harness {
    harness_with(MockCameraProvider::new(64, 48), classifier)
}

fn monstera() -> Vec<(&'static str, f64)> {
    vec![("Monstera deliciosa", 0.91)]
}

async fn next_completion(controller: &mut CaptureSessionController) -> bool {
    timeout(Duration::from_secs(5), controller.wait_for_identification())
        .await
        .expect("identification did not complete")
        .expect("completion channel closed")
}

#[tokio::test]
async fn test_initial_state() {
    let h = harness(FakeClassifier::suggesting(monstera()));
    let snapshot = h.controller.snapshot();

    assert_eq!(snapshot.state, CaptureState::Idle);
    assert!(!snapshot.streaming);
    assert!(!snapshot.has_photo());
    assert!(snapshot.suggestions.is_empty());
    assert!(snapshot.error.is_none());
    assert!(!snapshot.identifying);
}

#[tokio::test]
async fn test_open_camera_streams_at_native_size() {
    let mut h = harness(FakeClassifier::suggesting(monstera()));
    let mut events = h.bus.subscribe();

    assert!(h.controller.open_camera().await);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, CaptureState::Streaming);
    assert!(snapshot.streaming);
    assert_eq!(snapshot.stream_size, Some((64, 48)));
    assert_eq!(h.camera.active_streams(), 1);

    match events.recv().await.unwrap() {
        SessionEvent::CameraOpened { width, height, .. } => {
            assert_eq!((width, height), (64, 48));
        }
        other => panic!("Unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_reopening_keeps_a_single_active_stream() {
    let mut h = harness(FakeClassifier::suggesting(monstera()));

    h.controller.open_camera().await;
    h.controller.open_camera().await;
    h.controller.open_camera().await;

    assert_eq!(h.camera.open_count(), 3);
    assert_eq!(h.camera.active_streams(), 1);
    assert_eq!(h.camera.stop_count(1), 1);
    assert_eq!(h.camera.stop_count(2), 1);
    assert_eq!(h.camera.stop_count(3), 0);
}

#[tokio::test]
async fn test_capture_is_ignored_unless_streaming() {
    let mut h = harness(FakeClassifier::suggesting(monstera()));

    assert!(!h.controller.capture_photo());
    assert_eq!(h.controller.state(), CaptureState::Idle);
    assert!(!h.controller.snapshot().has_photo());
    assert_eq!(h.classifier.calls(), 0);
}

#[tokio::test]
async fn test_capture_with_zero_sized_stream_is_a_no_op() {
    let mut h = harness_with(
        MockCameraProvider::new(0, 0),
        FakeClassifier::suggesting(monstera()),
    );

    h.controller.open_camera().await;
    assert!(!h.controller.capture_photo());

    assert_eq!(h.controller.state(), CaptureState::Streaming);
    assert!(h.controller.has_live_stream());
    assert_eq!(h.classifier.calls(), 0);
}

#[tokio::test]
async fn test_capture_releases_camera_and_identifies() {
    let mut h = harness(FakeClassifier::suggesting(monstera()));

    h.controller.open_camera().await;
    assert!(h.controller.capture_photo());

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, CaptureState::Identifying);
    assert!(snapshot.identifying);
    assert!(!snapshot.streaming);
    assert_eq!(h.camera.active_streams(), 0);
    assert_eq!(h.camera.stop_count(1), 1);

    let photo = snapshot.photo.unwrap();
    assert_eq!((photo.width(), photo.height()), (64, 48));
    assert!(photo.data_uri().starts_with("data:image/jpeg;base64,"));

    assert!(next_completion(&mut h.controller).await);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, CaptureState::Identified);
    assert!(!snapshot.identifying);
    assert_eq!(snapshot.suggestion_lines(), vec!["Monstera deliciosa (91.0%)"]);
    assert!(snapshot.error.is_none());
    assert_eq!(h.classifier.calls(), 1);
}

#[tokio::test]
async fn test_only_top_three_suggestions_are_shown() {
    let mut h = harness(FakeClassifier::suggesting(vec![
        ("Monstera deliciosa", 0.827),
        ("Philodendron bipinnatifidum", 0.1),
        ("Epipremnum aureum", 0.042),
        ("Rhaphidophora tetrasperma", 0.02),
        ("Ficus elastica", 0.011),
    ]));

    h.controller.open_camera().await;
    h.controller.capture_photo();
    next_completion(&mut h.controller).await;

    let lines = h.controller.snapshot().suggestion_lines();
    assert_eq!(
        lines,
        vec![
            "Monstera deliciosa (82.7%)",
            "Philodendron bipinnatifidum (10.0%)",
            "Epipremnum aureum (4.2%)",
        ]
    );
}

#[tokio::test]
async fn test_identification_failure_keeps_photo() {
    let mut h = harness(FakeClassifier::failing());

    h.controller.open_camera().await;
    h.controller.capture_photo();
    assert!(next_completion(&mut h.controller).await);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, CaptureState::Captured);
    assert!(!snapshot.identifying);
    assert!(snapshot.has_photo());
    assert!(snapshot.suggestions.is_empty());
    assert_eq!(
        snapshot.error.map(|e| e.message),
        Some(IDENTIFICATION_ERROR_MESSAGE.to_string())
    );
}

#[tokio::test]
async fn test_retry_after_failure_sends_the_same_photo() {
    let mut h = harness(FakeClassifier::failing());

    h.controller.open_camera().await;
    h.controller.capture_photo();
    next_completion(&mut h.controller).await;
    let first = h.controller.snapshot().photo.unwrap();

    assert!(h.controller.dispatch(UserAction::RetryIdentification).await);
    assert_eq!(h.controller.state(), CaptureState::Identifying);
    next_completion(&mut h.controller).await;

    let second = h.controller.snapshot().photo.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(h.classifier.calls(), 2);
}

#[tokio::test]
async fn test_failed_reidentification_drops_earlier_matches() {
    let mut h = harness(FakeClassifier::failing_after(1, monstera()));

    h.controller.open_camera().await;
    h.controller.capture_photo();
    next_completion(&mut h.controller).await;
    assert_eq!(h.controller.state(), CaptureState::Identified);
    assert_eq!(h.controller.snapshot().suggestions.len(), 1);

    assert!(h.controller.dispatch(UserAction::RetryIdentification).await);
    let pending = h.controller.snapshot();
    assert_eq!(pending.state, CaptureState::Identifying);
    assert!(pending.suggestions.is_empty());
    assert!(pending.health.is_none());

    assert!(next_completion(&mut h.controller).await);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, CaptureState::Captured);
    assert!(snapshot.has_photo());
    assert!(snapshot.suggestions.is_empty());
    assert_eq!(
        snapshot.error.map(|e| e.message),
        Some(IDENTIFICATION_ERROR_MESSAGE.to_string())
    );
    assert_eq!(h.classifier.calls(), 2);
}

#[tokio::test]
async fn test_camera_denied() {
    let mut h = harness_with(
        MockCameraProvider::denying(),
        FakeClassifier::suggesting(monstera()),
    );

    assert!(!h.controller.open_camera().await);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, CaptureState::Idle);
    assert!(!snapshot.streaming);
    assert!(!h.controller.has_live_stream());
    assert_eq!(
        snapshot.error.map(|e| e.message),
        Some(CAMERA_ERROR_MESSAGE.to_string())
    );
}

#[tokio::test]
async fn test_successful_open_clears_previous_error() {
    let mut h = harness_with(
        MockCameraProvider::denying(),
        FakeClassifier::suggesting(monstera()),
    );

    h.controller.open_camera().await;
    assert!(h.controller.snapshot().error.is_some());

    h.camera.set_denied(false);
    h.controller.open_camera().await;
    assert!(h.controller.snapshot().error.is_none());
    assert_eq!(h.controller.state(), CaptureState::Streaming);
}

#[tokio::test]
async fn test_retake_discards_photo_and_results() {
    let mut h = harness(FakeClassifier::suggesting(monstera()));

    h.controller.open_camera().await;
    h.controller.capture_photo();
    next_completion(&mut h.controller).await;
    assert!(h.controller.snapshot().has_photo());

    h.controller.dispatch(UserAction::OpenCamera).await;

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, CaptureState::Streaming);
    assert!(!snapshot.has_photo());
    assert!(snapshot.suggestions.is_empty());
    assert!(snapshot.health.is_none());
    assert_eq!(h.camera.active_streams(), 1);
}

#[tokio::test]
async fn test_stale_response_is_discarded_after_retake() {
    let gate = Arc::new(Semaphore::new(0));
    let mut h = harness(FakeClassifier::gated(monstera(), Arc::clone(&gate)));
    let mut events = h.bus.subscribe();

    h.controller.open_camera().await;
    h.controller.capture_photo();
    let first_generation = h.controller.generation();

    // Retake while the first request is still pending
    h.controller.open_camera().await;
    assert!(h.controller.generation() > first_generation);

    gate.add_permits(1);
    assert!(!next_completion(&mut h.controller).await);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, CaptureState::Streaming);
    assert!(!snapshot.has_photo());
    assert!(snapshot.suggestions.is_empty());

    let mut saw_discard = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::StaleResponseDiscarded { generation } = event {
            assert_eq!(generation, first_generation);
            saw_discard = true;
        }
    }
    assert!(saw_discard);

    // The new capture is still identified normally
    h.controller.capture_photo();
    gate.add_permits(1);
    assert!(next_completion(&mut h.controller).await);
    assert_eq!(h.controller.state(), CaptureState::Identified);
}

#[tokio::test]
async fn test_no_concurrent_identification() {
    let gate = Arc::new(Semaphore::new(0));
    let mut h = harness(FakeClassifier::gated(monstera(), Arc::clone(&gate)));

    h.controller.open_camera().await;
    h.controller.capture_photo();

    assert!(!h.controller.identify_plant());
    h.controller.dispatch(UserAction::RetryIdentification).await;

    gate.add_permits(1);
    next_completion(&mut h.controller).await;
    assert_eq!(h.classifier.calls(), 1);
    assert_eq!(h.controller.state(), CaptureState::Identified);
}

#[tokio::test]
async fn test_external_loop_applies_completions() {
    let mut h = harness(FakeClassifier::suggesting(monstera()));
    let mut completions = h.controller.take_completions().unwrap();
    assert!(h.controller.take_completions().is_none());

    h.controller.open_camera().await;
    h.controller.capture_photo();

    let completion = timeout(Duration::from_secs(5), completions.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completion.generation, h.controller.generation());
    assert!(h.controller.apply_identification(completion));
    assert_eq!(h.controller.state(), CaptureState::Identified);

    assert!(h.controller.wait_for_identification().await.is_none());
}

#[tokio::test]
async fn test_share_downloads_photo() {
    let mut h = harness(FakeClassifier::suggesting(monstera()));

    assert!(h.controller.share_photo().await.is_none());

    h.controller.open_camera().await;
    h.controller.capture_photo();
    next_completion(&mut h.controller).await;

    match h.controller.share_photo().await {
        Some(ShareOutcome::Downloaded { path }) => {
            assert!(path.exists());
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("photo-"));
            assert!(name.ends_with(".jpg"));
        }
        other => panic!("Expected a download, got {:?}", other),
    }
}

#[tokio::test]
async fn test_quit_and_shutdown_release_camera() {
    let mut h = harness(FakeClassifier::suggesting(monstera()));

    h.controller.open_camera().await;
    assert!(!h.controller.dispatch(UserAction::Quit).await);
    assert_eq!(h.camera.active_streams(), 1);

    h.controller.shutdown();
    assert_eq!(h.camera.active_streams(), 0);
    assert_eq!(h.camera.stop_count(1), 1);

    drop(h.controller);
    assert_eq!(h.camera.stop_count(1), 1);
}
