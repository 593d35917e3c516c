use crate::frame::CapturedImage;
use crate::identify::SuggestionView;
use std::fmt;
use std::sync::Arc;

/// Current mode of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Streaming,
    Captured,
    Identifying,
    Identified,
    Errored,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Streaming => "streaming",
            CaptureState::Captured => "captured",
            CaptureState::Identifying => "identifying",
            CaptureState::Identified => "identified",
            CaptureState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Last user-visible failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
    pub message: String,
}

impl ErrorState {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Requests the user can make of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Open the camera, or retake when a photo is already shown
    OpenCamera,
    CapturePhoto,
    SharePhoto,
    /// Re-send the current photo after a failed identification
    RetryIdentification,
    Quit,
}

/// Read-only view of the session for rendering
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: CaptureState,
    pub generation: u64,
    pub streaming: bool,
    pub stream_size: Option<(u32, u32)>,
    pub photo: Option<Arc<CapturedImage>>,
    pub suggestions: Vec<SuggestionView>,
    pub health: Option<String>,
    pub error: Option<ErrorState>,
    pub identifying: bool,
}

impl SessionSnapshot {
    /// Suggestion lines as shown to the user, e.g. `Monstera deliciosa (91.0%)`
    pub fn suggestion_lines(&self) -> Vec<String> {
        self.suggestions.iter().map(ToString::to_string).collect()
    }

    pub fn has_photo(&self) -> bool {
        self.photo.is_some()
    }
}
