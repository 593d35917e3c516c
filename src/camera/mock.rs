use super::interface::{
    CameraProvider, LiveStream, MediaTrack, StreamRequest, TrackKind, TrackSettings,
};
use crate::error::CameraError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// In-process camera producing generated RGB frames.
///
/// Used by tests and as the provider for builds without GStreamer.
pub struct MockCameraProvider {
    resolution: (u32, u32),
    denied: AtomicBool,
    next_stream_id: AtomicU64,
    stop_counts: Arc<Mutex<HashMap<u64, usize>>>,
}

impl MockCameraProvider {
    /// Create a new mock provider delivering frames of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: (width, height),
            denied: AtomicBool::new(false),
            next_stream_id: AtomicU64::new(1),
            stop_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Provider that refuses every request, like a denied permission prompt
    pub fn denying() -> Self {
        let provider = Self::new(640, 480);
        provider.set_denied(true);
        provider
    }

    pub fn set_denied(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    /// Number of streams granted so far
    pub fn open_count(&self) -> u64 {
        self.next_stream_id.load(Ordering::SeqCst) - 1
    }

    /// How many times the tracks of `stream_id` were stopped
    pub fn stop_count(&self, stream_id: u64) -> usize {
        self.stop_counts.lock().get(&stream_id).copied().unwrap_or(0)
    }

    /// Streams granted and not yet stopped
    pub fn active_streams(&self) -> usize {
        let stopped = self
            .stop_counts
            .lock()
            .values()
            .filter(|count| **count > 0)
            .count();
        self.open_count() as usize - stopped
    }
}

#[async_trait]
impl CameraProvider for MockCameraProvider {
    async fn open(&self, request: &StreamRequest) -> Result<LiveStream, CameraError> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(CameraError::AccessDenied {
                details: "Permission denied".to_string(),
            });
        }

        if request.audio {
            return Err(CameraError::Unsupported {
                details: "mock camera has no audio track".to_string(),
            });
        }

        let stream_id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        self.stop_counts.lock().insert(stream_id, 0);

        let track = MockVideoTrack {
            stream_id,
            label: format!("mock-{:?}-{}", request.facing_mode, stream_id).to_lowercase(),
            resolution: self.resolution,
            frame_counter: AtomicU64::new(0),
            live: true,
            stop_counts: Arc::clone(&self.stop_counts),
        };

        debug!(
            "Mock camera granted stream {} ({}x{})",
            stream_id, self.resolution.0, self.resolution.1
        );

        Ok(LiveStream::new(
            stream_id,
            request.facing_mode,
            vec![Box::new(track)],
        ))
    }
}

struct MockVideoTrack {
    stream_id: u64,
    label: String,
    resolution: (u32, u32),
    frame_counter: AtomicU64,
    live: bool,
    stop_counts: Arc<Mutex<HashMap<u64, usize>>>,
}

impl MediaTrack for MockVideoTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn settings(&self) -> TrackSettings {
        TrackSettings {
            width: self.resolution.0,
            height: self.resolution.1,
            frame_rate: 30,
        }
    }

    fn current_frame(&self) -> Option<FrameData> {
        if !self.live {
            return None;
        }

        let (width, height) = self.resolution;
        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        let shade = (frame_id % 256) as u8;

        // Green gradient, varying per frame
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                let r = ((x * 255) / width.max(1)) as u8 / 4;
                let g = 96u8.saturating_add(((y * 159) / height.max(1)) as u8);
                data.extend_from_slice(&[r, g, shade / 2]);
            }
        }

        Some(FrameData::new(
            frame_id,
            SystemTime::now(),
            data,
            width,
            height,
            FrameFormat::Rgb24,
        ))
    }

    // Every call is recorded so tests can assert streams stop their tracks once
    fn stop(&mut self) {
        self.live = false;
        *self.stop_counts.lock().entry(self.stream_id).or_insert(0) += 1;
    }

    fn is_live(&self) -> bool {
        self.live
    }
}
