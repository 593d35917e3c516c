pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod camera;
pub mod capture;
pub mod identify;
pub mod share;
pub mod session;
pub mod ui;
pub mod app;

pub use config::PlantcamConfig;
pub use error::{PlantcamError, Result};
pub use app::{OnceReport, PlantcamApp, ShutdownReason};
pub use events::{EventBus, SessionEvent};
pub use frame::{CapturedImage, FrameData, FrameFormat};
pub use camera::{CameraProvider, CameraProviderBuilder, LiveStream, MockCameraProvider, StreamRequest};
pub use capture::{FrameExtractor, JpegFrameExtractor};
pub use identify::{ClassificationService, IdentificationResult, PlantIdClient, SuggestionView};
pub use share::{PhotoSharer, ShareOutcome, ShareTarget};
pub use session::{CaptureSessionController, CaptureState, SessionSnapshot, UserAction};
