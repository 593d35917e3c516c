mod builder;
#[cfg(all(feature = "camera", target_os = "linux"))]
mod gst;
mod interface;
mod mock;

pub use builder::CameraProviderBuilder;
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use gst::GstCameraProvider;
pub use interface::{
    CameraProvider, FacingMode, LiveStream, MediaTrack, StreamRequest, TrackKind, TrackSettings,
};
pub use mock::MockCameraProvider;
