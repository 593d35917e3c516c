use crate::camera::LiveStream;
use crate::error::ExtractionError;
use crate::frame::{CapturedImage, FrameData, FrameFormat};
use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use tracing::{debug, trace};

/// Samples one still image out of a live stream
pub trait FrameExtractor: Send + Sync {
    fn extract(&self, stream: &LiveStream) -> Result<CapturedImage, ExtractionError>;
}

/// Draws the current video frame onto a canvas sized to the stream's
/// intrinsic resolution and encodes it as a JPEG data URI.
pub struct JpegFrameExtractor {
    quality: u8,
}

impl JpegFrameExtractor {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    fn encode(&self, canvas: &RgbImage) -> Result<Vec<u8>, ExtractionError> {
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, self.quality);
        encoder
            .encode_image(canvas)
            .map_err(|e| ExtractionError::Encode {
                details: e.to_string(),
            })?;
        Ok(buf)
    }
}

impl Default for JpegFrameExtractor {
    fn default() -> Self {
        Self::new(92)
    }
}

impl FrameExtractor for JpegFrameExtractor {
    fn extract(&self, stream: &LiveStream) -> Result<CapturedImage, ExtractionError> {
        let (width, height) = stream.intrinsic_size();
        if width == 0 || height == 0 {
            return Err(ExtractionError::NoDrawingContext { width, height });
        }

        let frame = stream.current_frame().ok_or(ExtractionError::NoFrame)?;
        if !frame.validate_size() {
            return Err(ExtractionError::InvalidFrame {
                details: format!(
                    "{:?} frame {} has {} bytes for {}x{}",
                    frame.format,
                    frame.id,
                    frame.data.len(),
                    frame.width,
                    frame.height
                ),
            });
        }

        // Already a JPEG of the right size, no need to redraw
        if frame.format == FrameFormat::Mjpeg && (frame.width, frame.height) == (width, height) {
            trace!("Passing MJPEG frame {} through unchanged", frame.id);
            return Ok(CapturedImage::from_jpeg(&frame.data, width, height, Utc::now()));
        }

        let source = frame_to_rgb(&frame)?;
        let mut canvas = RgbImage::new(width, height);
        image::imageops::replace(&mut canvas, &source, 0, 0);

        let jpeg = self.encode(&canvas)?;
        debug!(
            "Encoded {}x{} still from frame {} ({} bytes)",
            width,
            height,
            frame.id,
            jpeg.len()
        );

        Ok(CapturedImage::from_jpeg(&jpeg, width, height, Utc::now()))
    }
}

fn frame_to_rgb(frame: &FrameData) -> Result<RgbImage, ExtractionError> {
    match frame.format {
        FrameFormat::Rgb24 => RgbImage::from_raw(frame.width, frame.height, frame.data.to_vec())
            .ok_or_else(|| ExtractionError::InvalidFrame {
                details: "RGB buffer does not match frame size".to_string(),
            }),
        FrameFormat::Yuyv => {
            let rgb = yuyv_to_rgb24(&frame.data);
            RgbImage::from_raw(frame.width, frame.height, rgb).ok_or_else(|| {
                ExtractionError::InvalidFrame {
                    details: "YUYV buffer does not match frame size".to_string(),
                }
            })
        }
        FrameFormat::Mjpeg => image::load_from_memory_with_format(&frame.data, ImageFormat::Jpeg)
            .map(|decoded| decoded.to_rgb8())
            .map_err(|e| ExtractionError::InvalidFrame {
                details: format!("Failed to decode MJPEG frame: {}", e),
            }),
    }
}

/// BT.601 YUYV (4:2:2) to packed RGB24
fn yuyv_to_rgb24(yuyv: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(yuyv.len() / 2 * 3);

    for chunk in yuyv.chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }

    rgb
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;

    [
        r.clamp(0, 255) as u8,
        g.clamp(0, 255) as u8,
        b.clamp(0, 255) as u8,
    ]
}
