use super::interface::{
    CameraProvider, FacingMode, LiveStream, MediaTrack, StreamRequest, TrackKind, TrackSettings,
};
use crate::config::CameraConfig;
use crate::error::CameraError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// GStreamer v4l2 camera provider
pub struct GstCameraProvider {
    config: CameraConfig,
    next_stream_id: AtomicU64,
}

impl GstCameraProvider {
    pub fn new(config: CameraConfig) -> Result<Self, CameraError> {
        gstreamer::init().map_err(|e| CameraError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        info!(
            "GStreamer camera provider ready ({}x{} @ {}fps)",
            config.resolution.0, config.resolution.1, config.fps
        );

        Ok(Self {
            config,
            next_stream_id: AtomicU64::new(1),
        })
    }

    fn device_for(&self, facing_mode: FacingMode) -> Result<String, CameraError> {
        let index = match facing_mode {
            FacingMode::Environment => self.config.environment_index,
            FacingMode::User => self.config.user_index.ok_or_else(|| {
                CameraError::DeviceUnavailable {
                    details: "no user-facing camera configured".to_string(),
                }
            })?,
        };

        let device = format!("/dev/video{}", index);
        if !Path::new(&device).exists() {
            return Err(CameraError::DeviceUnavailable {
                details: format!("{} does not exist", device),
            });
        }

        Ok(device)
    }

    /// Build GStreamer pipeline string for MJPEG capture
    fn build_pipeline_string(&self, device: &str) -> String {
        let (width, height) = self.config.resolution;

        format!(
            "v4l2src device={} io-mode=mmap do-timestamp=true ! \
             image/jpeg,width={},height={},framerate={}/1 ! \
             queue max-size-buffers=2 leaky=downstream ! \
             appsink name=sink sync=false max-buffers=1 drop=true emit-signals=false",
            device, width, height, self.config.fps
        )
    }
}

#[async_trait]
impl CameraProvider for GstCameraProvider {
    async fn open(&self, request: &StreamRequest) -> Result<LiveStream, CameraError> {
        if request.audio || !request.video {
            return Err(CameraError::Unsupported {
                details: "only video-only streams are supported".to_string(),
            });
        }

        let device = self.device_for(request.facing_mode)?;
        let pipeline_desc = self.build_pipeline_string(&device);
        debug!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::Configuration {
                details: "Pipeline has no appsink".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        let (tx, mut rx) = watch::channel(None::<FrameData>);
        let frame_counter = Arc::new(AtomicU64::new(0));

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink
                        .pull_sample()
                        .map_err(|_| gstreamer::FlowError::Eos)?;
                    if let Some(frame) = frame_from_sample(&sample, &frame_counter) {
                        tx.send_replace(Some(frame));
                    }
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let details = pipeline_error(&pipeline).unwrap_or_else(|| e.to_string());
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(classify_open_error(&device, details));
        }

        // Negotiation finishes when the first frame arrives
        let open_timeout = Duration::from_secs(self.config.open_timeout_seconds as u64);
        match tokio::time::timeout(open_timeout, rx.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) | Err(_) => {
                let error = pipeline_error(&pipeline);
                let _ = pipeline.set_state(gstreamer::State::Null);
                return Err(match error {
                    Some(details) => classify_open_error(&device, details),
                    None => CameraError::NoFrames {
                        timeout_ms: open_timeout.as_millis() as u64,
                    },
                });
            }
        }

        let settings = {
            let first = rx.borrow();
            (*first)
                .as_ref()
                .map(|frame| TrackSettings {
                    width: frame.width,
                    height: frame.height,
                    frame_rate: self.config.fps,
                })
                .unwrap_or_default()
        };

        let stream_id = self.next_stream_id.fetch_add(1, Ordering::Relaxed);
        info!(
            "Opened {} as stream {} ({}x{})",
            device, stream_id, settings.width, settings.height
        );

        let track = GstVideoTrack {
            label: device,
            pipeline,
            latest: rx,
            settings,
            live: true,
        };

        Ok(LiveStream::new(
            stream_id,
            request.facing_mode,
            vec![Box::new(track)],
        ))
    }
}

struct GstVideoTrack {
    label: String,
    pipeline: Pipeline,
    latest: watch::Receiver<Option<FrameData>>,
    settings: TrackSettings,
    live: bool,
}

impl MediaTrack for GstVideoTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn settings(&self) -> TrackSettings {
        self.settings
    }

    fn current_frame(&self) -> Option<FrameData> {
        if !self.live {
            return None;
        }
        (*self.latest.borrow()).clone()
    }

    fn stop(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop pipeline for {}: {}", self.label, e);
        } else {
            debug!("Pipeline for {} stopped", self.label);
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for GstVideoTrack {
    fn drop(&mut self) {
        self.stop();
    }
}

fn frame_from_sample(sample: &gstreamer::Sample, counter: &AtomicU64) -> Option<FrameData> {
    let buffer = sample.buffer()?;
    let structure = sample.caps()?.structure(0)?;
    let width = structure.get::<i32>("width").ok()? as u32;
    let height = structure.get::<i32>("height").ok()? as u32;
    let map = buffer.map_readable().ok()?;

    let frame_id = counter.fetch_add(1, Ordering::Relaxed);
    trace!(
        "Captured MJPEG frame {} ({}x{}, {} bytes)",
        frame_id,
        width,
        height,
        map.len()
    );

    Some(FrameData::new(
        frame_id,
        SystemTime::now(),
        map.as_slice().to_vec(),
        width,
        height,
        FrameFormat::Mjpeg,
    ))
}

/// Pop the first error message off the pipeline bus
fn pipeline_error(pipeline: &Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    let message = bus.timed_pop_filtered(
        gstreamer::ClockTime::ZERO,
        &[gstreamer::MessageType::Error],
    )?;

    match message.view() {
        gstreamer::MessageView::Error(err) => Some(match err.debug() {
            Some(debug) => format!("{} ({})", err.error(), debug),
            None => err.error().to_string(),
        }),
        _ => None,
    }
}

fn classify_open_error(device: &str, details: String) -> CameraError {
    let lowered = details.to_lowercase();
    if lowered.contains("permission denied") || lowered.contains("not permitted") {
        CameraError::AccessDenied { details }
    } else if lowered.contains("no such") || lowered.contains("cannot identify") {
        CameraError::DeviceUnavailable { details }
    } else {
        CameraError::DeviceOpen {
            device: device.to_string(),
            details,
        }
    }
}
