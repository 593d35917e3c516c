use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlantcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Frame extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Identification error: {0}")]
    Identification(#[from] IdentificationError),

    #[error("Share error: {0}")]
    Share(#[from] ShareError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl PlantcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failures while negotiating or running a camera stream
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera access denied: {details}")]
    AccessDenied { details: String },

    #[error("No camera available: {details}")]
    DeviceUnavailable { details: String },

    #[error("Failed to open camera device {device}: {details}")]
    DeviceOpen { device: String, details: String },

    #[error("Camera produced no frames within {timeout_ms}ms")]
    NoFrames { timeout_ms: u64 },

    #[error("Unsupported stream request: {details}")]
    Unsupported { details: String },

    #[error("Camera configuration error: {details}")]
    Configuration { details: String },
}

/// Failures while sampling a still image from a live stream
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("No drawing context for a {width}x{height} surface")]
    NoDrawingContext { width: u32, height: u32 },

    #[error("Stream has no frame available")]
    NoFrame,

    #[error("Invalid frame: {details}")]
    InvalidFrame { details: String },

    #[error("JPEG encoding failed: {details}")]
    Encode { details: String },
}

#[derive(Error, Debug)]
pub enum IdentificationError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Service responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {details}")]
    Decode { details: String },
}

#[derive(Error, Debug)]
pub enum ShareError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Share command failed: {details}")]
    Command { details: String },

    #[error("Photo payload is not valid base64: {details}")]
    Decode { details: String },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },
}

pub type Result<T> = std::result::Result<T, PlantcamError>;
