use crate::error::CameraError;
use crate::frame::FrameData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Which way the requested camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacingMode {
    /// Rear camera, pointing away from the user
    Environment,
    /// Front camera, pointing at the user
    User,
}

/// Constraints handed to a camera provider when opening a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub facing_mode: FacingMode,
    pub video: bool,
    pub audio: bool,
}

impl StreamRequest {
    /// Rear-facing, video-only stream
    pub fn environment_video_only() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            video: true,
            audio: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Negotiated settings of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// One track of a live stream
pub trait MediaTrack: Send + Sync {
    fn kind(&self) -> TrackKind;

    fn label(&self) -> &str;

    /// Intrinsic settings as negotiated with the device
    fn settings(&self) -> TrackSettings;

    /// Newest frame delivered by the device, if any
    fn current_frame(&self) -> Option<FrameData>;

    /// Stop the track and give the device back. Must be idempotent.
    fn stop(&mut self);

    fn is_live(&self) -> bool;
}

/// Source of live camera streams
#[async_trait]
pub trait CameraProvider: Send + Sync {
    /// Negotiate a stream matching `request`
    async fn open(&self, request: &StreamRequest) -> Result<LiveStream, CameraError>;
}

/// Exclusive handle on an open camera feed.
///
/// Tracks are stopped exactly once, either through [`LiveStream::stop`] or
/// when the handle is dropped.
pub struct LiveStream {
    id: u64,
    facing_mode: FacingMode,
    tracks: Vec<Box<dyn MediaTrack>>,
    released: bool,
}

impl LiveStream {
    pub fn new(id: u64, facing_mode: FacingMode, tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        debug!("Live stream {} created with {} track(s)", id, tracks.len());
        Self {
            id,
            facing_mode,
            tracks,
            released: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn facing_mode(&self) -> FacingMode {
        self.facing_mode
    }

    pub fn tracks(&self) -> &[Box<dyn MediaTrack>] {
        &self.tracks
    }

    /// First video track of the stream
    pub fn video_track(&self) -> Option<&dyn MediaTrack> {
        self.tracks
            .iter()
            .find(|track| track.kind() == TrackKind::Video)
            .map(|track| track.as_ref())
    }

    /// Native (width, height) of the video feed; (0, 0) without a video track
    pub fn intrinsic_size(&self) -> (u32, u32) {
        self.video_track()
            .map(|track| {
                let settings = track.settings();
                (settings.width, settings.height)
            })
            .unwrap_or((0, 0))
    }

    pub fn current_frame(&self) -> Option<FrameData> {
        if self.released {
            return None;
        }
        self.video_track().and_then(|track| track.current_frame())
    }

    pub fn is_active(&self) -> bool {
        !self.released && self.tracks.iter().any(|track| track.is_live())
    }

    /// Stop every track of the stream
    pub fn stop(&mut self) {
        if self.released {
            return;
        }

        for track in self.tracks.iter_mut() {
            debug!("Stopping track '{}' of stream {}", track.label(), self.id);
            track.stop();
        }
        self.released = true;
        info!("Live stream {} released", self.id);
    }
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for LiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveStream")
            .field("id", &self.id)
            .field("facing_mode", &self.facing_mode)
            .field("tracks", &self.tracks.len())
            .field("released", &self.released)
            .finish()
    }
}
