use crate::camera::{CameraProvider, CameraProviderBuilder};
use crate::capture::{FrameExtractor, JpegFrameExtractor};
use crate::config::PlantcamConfig;
use crate::error::{PlantcamError, Result};
use crate::events::EventBus;
use crate::identify::{ClassificationService, PlantIdClient};
use crate::session::CaptureSessionController;
use crate::share::PhotoSharer;
use crate::ui::KeyboardInput;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wires the capture session to its collaborators and the terminal
pub struct PlantcamApp {
    pub(super) config: PlantcamConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) controller: CaptureSessionController,
    pub(super) keyboard: Option<KeyboardInput>,
    pub(super) cancellation_token: CancellationToken,
}

impl PlantcamApp {
    /// Build the application from configuration
    pub fn new(config: PlantcamConfig) -> Result<Self> {
        let camera = CameraProviderBuilder::new()
            .config(config.camera.clone())
            .build()?;
        let classifier: Arc<dyn ClassificationService> =
            Arc::new(PlantIdClient::new(&config.identification)?);
        let sharer = Arc::new(PhotoSharer::from_config(&config.share));

        info!(
            "Identification endpoint {}, downloads in {}",
            config.identification.endpoint,
            sharer.download_dir().display()
        );

        Self::with_components(config, camera, classifier, sharer)
    }

    /// Build the application around explicit collaborators
    pub fn with_components(
        config: PlantcamConfig,
        camera: Arc<dyn CameraProvider>,
        classifier: Arc<dyn ClassificationService>,
        sharer: Arc<PhotoSharer>,
    ) -> Result<Self> {
        config.validate()?;

        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let extractor: Arc<dyn FrameExtractor> =
            Arc::new(JpegFrameExtractor::new(config.camera.jpeg_quality));

        let controller = CaptureSessionController::new(
            camera,
            extractor,
            classifier,
            sharer,
            Arc::clone(&event_bus),
            config.identification.max_suggestions,
        );

        Ok(Self {
            config,
            event_bus,
            controller,
            keyboard: None,
            cancellation_token: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &PlantcamConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn controller(&self) -> &CaptureSessionController {
        &self.controller
    }

    pub(super) fn ensure_running(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(PlantcamError::system("Application already shut down"));
        }
        Ok(())
    }
}
