use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlantcamConfig {
    pub camera: CameraConfig,
    pub identification: IdentificationConfig,
    pub share: ShareConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Device index used for environment-facing (rear) requests, e.g. 0 for /dev/video0
    #[serde(default = "default_environment_index")]
    pub environment_index: u32,

    /// Device index used for user-facing (front) requests, if the machine has one
    #[serde(default)]
    pub user_index: Option<u32>,

    /// Requested capture resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// How long to wait for the first frame when opening a stream
    #[serde(default = "default_open_timeout")]
    pub open_timeout_seconds: u32,

    /// JPEG quality for captured stills (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IdentificationConfig {
    /// Classification endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Api-Key header value
    #[serde(default)]
    pub api_key: Option<String>,

    /// Health assessment mode sent with every request
    #[serde(default = "default_health")]
    pub health: String,

    /// Ask the service for similar reference images
    #[serde(default = "default_similar_images")]
    pub similar_images: bool,

    /// Request timeout in seconds
    #[serde(default = "default_identification_timeout")]
    pub timeout_seconds: u32,

    /// Number of suggestions surfaced to the user
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShareConfig {
    /// Directory receiving downloaded photos
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// External command handed the photo path for native sharing
    #[serde(default)]
    pub share_command: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl PlantcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("plantcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.environment_index", default_environment_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.open_timeout_seconds", default_open_timeout())?
            .set_default("camera.jpeg_quality", default_jpeg_quality() as u64)?
            .set_default("identification.endpoint", default_endpoint())?
            .set_default("identification.health", default_health())?
            .set_default("identification.similar_images", default_similar_images())?
            .set_default(
                "identification.timeout_seconds",
                default_identification_timeout(),
            )?
            .set_default(
                "identification.max_suggestions",
                default_max_suggestions() as u64,
            )?
            .set_default("share.download_dir", default_download_dir())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as u64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // PLANTCAM__IDENTIFICATION__API_KEY and friends
            .add_source(Environment::with_prefix("PLANTCAM").separator("__"))
            .build()?;

        let config: PlantcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config.redacted());

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.camera.open_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Camera open_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(ConfigError::Message(
                "Camera jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        if let Err(e) = reqwest::Url::parse(&self.identification.endpoint) {
            return Err(ConfigError::Message(format!(
                "Identification endpoint '{}' is not a valid URL: {}",
                self.identification.endpoint, e
            )));
        }

        if self.identification.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Identification timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.identification.max_suggestions == 0 {
            return Err(ConfigError::Message(
                "Identification max_suggestions must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Log a warning when no API key is configured. Requests still go out and
    /// fail through the normal identification error path.
    pub fn warn_if_missing_api_key(&self) -> bool {
        let missing = self
            .identification
            .api_key
            .as_deref()
            .map_or(true, |key| key.trim().is_empty());

        if missing {
            warn!(
                "No identification API key configured (set identification.api_key or \
                 PLANTCAM__IDENTIFICATION__API_KEY); identification requests will be rejected"
            );
        }

        missing
    }

    /// Copy safe to log
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.identification.api_key.is_some() {
            copy.identification.api_key = Some("<redacted>".to_string());
        }
        copy
    }

    /// Default configuration rendered as TOML
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }
}

impl Default for PlantcamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                environment_index: default_environment_index(),
                user_index: None,
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                open_timeout_seconds: default_open_timeout(),
                jpeg_quality: default_jpeg_quality(),
            },
            identification: IdentificationConfig {
                endpoint: default_endpoint(),
                api_key: None,
                health: default_health(),
                similar_images: default_similar_images(),
                timeout_seconds: default_identification_timeout(),
                max_suggestions: default_max_suggestions(),
            },
            share: ShareConfig {
                download_dir: default_download_dir(),
                share_command: None,
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_environment_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_camera_fps() -> u32 {
    30
}
fn default_open_timeout() -> u32 {
    5
}
fn default_jpeg_quality() -> u8 {
    92
}

fn default_endpoint() -> String {
    "https://plant.id/api/v3/identification".to_string()
}
fn default_health() -> String {
    "auto".to_string()
}
fn default_similar_images() -> bool {
    true
}
fn default_identification_timeout() -> u32 {
    30
}
fn default_max_suggestions() -> usize {
    3
}

fn default_download_dir() -> String {
    "./photos".to_string()
}

fn default_event_bus_capacity() -> usize {
    64
}
