use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::SystemTime;
use serde::{Deserialize, Serialize};

/// Frame format enumeration supporting different video formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// Motion JPEG format - compressed JPEG frames
    Mjpeg,
    /// YUV 4:2:2 format - uncompressed YUV data
    Yuyv,
    /// RGB24 format - uncompressed RGB data
    Rgb24,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Mjpeg => 0, // Variable size, compressed
            FrameFormat::Yuyv => 2,
            FrameFormat::Rgb24 => 3,
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, FrameFormat::Mjpeg)
    }
}

/// A single frame sampled from a live stream
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Frame sequence number within its stream
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared ownership for efficiency)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
}

impl FrameData {
    /// Create a new frame data instance
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Get the expected frame size for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => !self.data.is_empty(),
        }
    }
}

const JPEG_MIME: &str = "image/jpeg";

/// Still photo taken from a live stream, held as a JPEG data URI.
///
/// Never mutated after construction; the session shares it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    data_uri: String,
    width: u32,
    height: u32,
    captured_at: DateTime<Utc>,
}

impl CapturedImage {
    /// Wrap encoded JPEG bytes as a `data:image/jpeg;base64,` URI
    pub fn from_jpeg(jpeg: &[u8], width: u32, height: u32, captured_at: DateTime<Utc>) -> Self {
        Self {
            data_uri: to_data_uri(JPEG_MIME, jpeg),
            width,
            height,
            captured_at,
        }
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    /// Base64 payload without the data-URI envelope
    pub fn base64_payload(&self) -> &str {
        strip_data_uri_prefix(&self.data_uri)
    }

    /// Decoded JPEG bytes
    pub fn jpeg_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.base64_payload())
    }

    pub fn mime_type(&self) -> &'static str {
        JPEG_MIME
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

/// Encode bytes as a base64 data URI
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Remove a `data:<mime>;base64,` envelope if present. Strings without the
/// envelope are returned unchanged.
pub fn strip_data_uri_prefix(value: &str) -> &str {
    if !value.starts_with("data:") {
        return value;
    }

    match value.split_once(',') {
        Some((_, payload)) => payload,
        None => value,
    }
}
