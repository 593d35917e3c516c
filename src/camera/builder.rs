use super::interface::CameraProvider;
use crate::config::CameraConfig;
use crate::error::{PlantcamError, Result};
use std::sync::Arc;

/// Builder selecting the camera provider for this platform
pub struct CameraProviderBuilder {
    config: Option<CameraConfig>,
}

impl CameraProviderBuilder {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// GStreamer on Linux with the `camera` feature, generated frames otherwise
    pub fn build(self) -> Result<Arc<dyn CameraProvider>> {
        let config = self
            .config
            .ok_or_else(|| PlantcamError::system("Camera configuration must be specified"))?;

        #[cfg(all(feature = "camera", target_os = "linux"))]
        {
            let provider = super::gst::GstCameraProvider::new(config)?;
            Ok(Arc::new(provider))
        }

        #[cfg(not(all(feature = "camera", target_os = "linux")))]
        {
            tracing::warn!(
                "GStreamer camera provider is only available on Linux with the camera feature; \
                 using generated frames"
            );
            let (width, height) = config.resolution;
            Ok(Arc::new(super::mock::MockCameraProvider::new(width, height)))
        }
    }
}

impl Default for CameraProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
