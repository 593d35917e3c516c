use super::state::{CaptureState, ErrorState, SessionSnapshot, UserAction};
use crate::camera::{CameraProvider, LiveStream, StreamRequest};
use crate::capture::FrameExtractor;
use crate::error::IdentificationError;
use crate::events::{EventBus, SessionEvent};
use crate::frame::CapturedImage;
use crate::identify::{ClassificationService, IdentificationResult};
use crate::share::{PhotoSharer, ShareOutcome};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

pub const CAMERA_ERROR_MESSAGE: &str = "Could not access camera";
pub const IDENTIFICATION_ERROR_MESSAGE: &str = "Could not identify plant";

/// Result of an identification request, tagged with the session generation
/// that issued it
#[derive(Debug)]
pub struct IdentificationCompletion {
    pub generation: u64,
    pub outcome: Result<IdentificationResult, IdentificationError>,
}

/// Owns the camera stream, the captured photo and the identification state.
///
/// Every `open_camera` starts a new generation. Identification responses are
/// delivered through a channel and applied only if they belong to the
/// current generation and the pending request.
pub struct CaptureSessionController {
    camera: Arc<dyn CameraProvider>,
    extractor: Arc<dyn FrameExtractor>,
    classifier: Arc<dyn ClassificationService>,
    sharer: Arc<PhotoSharer>,
    event_bus: Arc<EventBus>,
    max_suggestions: usize,

    state: CaptureState,
    stream: Option<LiveStream>,
    photo: Option<Arc<CapturedImage>>,
    result: Option<IdentificationResult>,
    error: Option<ErrorState>,
    generation: u64,
    in_flight: Option<u64>,
    request_task: Option<JoinHandle<()>>,

    completion_tx: mpsc::UnboundedSender<IdentificationCompletion>,
    completion_rx: Option<mpsc::UnboundedReceiver<IdentificationCompletion>>,
}

impl CaptureSessionController {
    pub fn new(
        camera: Arc<dyn CameraProvider>,
        extractor: Arc<dyn FrameExtractor>,
        classifier: Arc<dyn ClassificationService>,
        sharer: Arc<PhotoSharer>,
        event_bus: Arc<EventBus>,
        max_suggestions: usize,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        Self {
            camera,
            extractor,
            classifier,
            sharer,
            event_bus,
            max_suggestions,
            state: CaptureState::Idle,
            stream: None,
            photo: None,
            result: None,
            error: None,
            generation: 0,
            in_flight: None,
            request_task: None,
            completion_tx,
            completion_rx: Some(completion_rx),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_identifying(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_live_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Read-only view for the rendering layer
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            generation: self.generation,
            streaming: self.stream.as_ref().map_or(false, LiveStream::is_active),
            stream_size: self.stream.as_ref().map(LiveStream::intrinsic_size),
            photo: self.photo.clone(),
            suggestions: self
                .result
                .as_ref()
                .map(|result| result.top(self.max_suggestions))
                .unwrap_or_default(),
            health: self
                .result
                .as_ref()
                .and_then(IdentificationResult::health_summary),
            error: self.error.clone(),
            identifying: self.in_flight.is_some(),
        }
    }

    /// Hand the completion channel to an external event loop. Afterwards the
    /// loop must feed completions back through [`Self::apply_identification`].
    pub fn take_completions(
        &mut self,
    ) -> Option<mpsc::UnboundedReceiver<IdentificationCompletion>> {
        self.completion_rx.take()
    }

    /// Apply a user action. Returns `false` once the user asked to quit.
    pub async fn dispatch(&mut self, action: UserAction) -> bool {
        debug!("Dispatching {:?} in state {}", action, self.state);

        match action {
            UserAction::OpenCamera => {
                self.open_camera().await;
            }
            UserAction::CapturePhoto => {
                self.capture_photo();
            }
            UserAction::SharePhoto => {
                self.share_photo().await;
            }
            UserAction::RetryIdentification => {
                self.identify_plant();
            }
            UserAction::Quit => return false,
        }

        true
    }

    /// Open (or reopen) the rear camera. Any existing stream is released and
    /// all previous photo, result and error state is discarded.
    pub async fn open_camera(&mut self) -> bool {
        self.release_stream();

        // Responses for anything issued before this point are now stale
        self.generation += 1;
        self.in_flight = None;
        self.request_task = None;
        self.photo = None;
        self.result = None;
        self.error = None;

        info!("Opening camera (session {})", self.generation);
        match self
            .camera
            .open(&StreamRequest::environment_video_only())
            .await
        {
            Ok(stream) => {
                let (width, height) = stream.intrinsic_size();
                let stream_id = stream.id();
                self.stream = Some(stream);
                self.state = CaptureState::Streaming;
                self.emit(SessionEvent::CameraOpened {
                    stream_id,
                    width,
                    height,
                });
                true
            }
            Err(e) => {
                warn!("Error accessing camera: {}", e);
                self.state = CaptureState::Idle;
                self.error = Some(ErrorState::new(CAMERA_ERROR_MESSAGE));
                self.emit(SessionEvent::CameraDenied {
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    /// Take a still from the live stream, release the camera and start
    /// identification. Does nothing unless streaming.
    pub fn capture_photo(&mut self) -> bool {
        if self.state != CaptureState::Streaming {
            debug!("Ignoring capture in state {}", self.state);
            return false;
        }

        let Some(stream) = self.stream.as_ref() else {
            debug!("Ignoring capture without a live stream");
            return false;
        };

        let image = match self.extractor.extract(stream) {
            Ok(image) => image,
            Err(e) => {
                debug!("Frame extraction skipped: {}", e);
                return false;
            }
        };

        let (width, height) = (image.width(), image.height());
        self.photo = Some(Arc::new(image));
        self.release_stream();
        self.state = CaptureState::Captured;
        info!("Captured {}x{} photo", width, height);
        self.emit(SessionEvent::PhotoCaptured {
            width,
            height,
            timestamp: SystemTime::now(),
        });

        self.identify_plant()
    }

    /// Send the current photo to the classification service. At most one
    /// request is in flight; the response arrives as an
    /// [`IdentificationCompletion`].
    pub fn identify_plant(&mut self) -> bool {
        let Some(photo) = self.photo.as_ref().map(Arc::clone) else {
            debug!("Ignoring identification without a photo");
            return false;
        };

        if let Some(pending) = self.in_flight {
            warn!(
                "Identification for session {} already in flight; ignoring request",
                pending
            );
            return false;
        }

        // A result only stands for the request that produced it
        self.result = None;

        let generation = self.generation;
        self.in_flight = Some(generation);
        self.state = CaptureState::Identifying;
        self.emit(SessionEvent::IdentificationStarted { generation });

        let classifier = Arc::clone(&self.classifier);
        let completion_tx = self.completion_tx.clone();
        self.request_task = Some(tokio::spawn(async move {
            let outcome = classifier.identify(photo.base64_payload()).await;
            if completion_tx
                .send(IdentificationCompletion {
                    generation,
                    outcome,
                })
                .is_err()
            {
                debug!("Session closed before identification {} finished", generation);
            }
        }));

        true
    }

    /// Fold a finished request back into the session. Returns `false` when
    /// the completion was stale and discarded.
    pub fn apply_identification(&mut self, completion: IdentificationCompletion) -> bool {
        let IdentificationCompletion {
            generation,
            outcome,
        } = completion;

        if self.in_flight != Some(generation) {
            debug!(
                "Discarding identification response from session {} (current {})",
                generation, self.generation
            );
            self.emit(SessionEvent::StaleResponseDiscarded { generation });
            return false;
        }

        self.in_flight = None;
        self.request_task = None;

        match outcome {
            Ok(result) => {
                let suggestions = result.suggestions.len();
                info!("Identified photo with {} suggestion(s)", suggestions);
                self.result = Some(result);
                self.error = None;
                self.state = CaptureState::Identified;
                self.emit(SessionEvent::IdentificationCompleted {
                    generation,
                    suggestions,
                });
            }
            Err(e) => {
                warn!("Error identifying plant: {}", e);
                self.error = Some(ErrorState::new(IDENTIFICATION_ERROR_MESSAGE));
                self.state = CaptureState::Captured;
                self.emit(SessionEvent::IdentificationFailed {
                    generation,
                    error: e.to_string(),
                });
            }
        }

        true
    }

    /// Wait for the next completion on the internal channel and apply it.
    /// Returns `None` if the channel was handed out with
    /// [`Self::take_completions`].
    pub async fn wait_for_identification(&mut self) -> Option<bool> {
        let completion = self.completion_rx.as_mut()?.recv().await?;
        Some(self.apply_identification(completion))
    }

    /// Share or download the current photo. Failures are logged only.
    pub async fn share_photo(&self) -> Option<ShareOutcome> {
        let Some(photo) = self.photo.as_ref() else {
            debug!("Ignoring share without a photo");
            return None;
        };

        match self.sharer.share(photo).await {
            Ok(outcome) => {
                self.emit(SessionEvent::PhotoShared {
                    destination: outcome.destination(),
                });
                Some(outcome)
            }
            Err(e) => {
                warn!("Error sharing photo: {}", e);
                None
            }
        }
    }

    /// Release the camera and abandon any pending request
    pub fn shutdown(&mut self) {
        info!("Shutting down capture session");
        if let Some(task) = self.request_task.take() {
            task.abort();
        }
        self.in_flight = None;
        self.generation += 1;
        self.release_stream();
    }

    fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let stream_id = stream.id();
            stream.stop();
            self.emit(SessionEvent::CameraReleased { stream_id });
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(e) = self.event_bus.publish(event) {
            trace!("Session event not delivered: {}", e);
        }
    }
}

impl Drop for CaptureSessionController {
    fn drop(&mut self) {
        if let Some(task) = self.request_task.take() {
            task.abort();
        }
        self.release_stream();
    }
}
