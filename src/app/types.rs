use crate::share::ShareOutcome;
use std::fmt;

/// Why the run loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    UserRequest,
    InputClosed,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "received {}", name),
            ShutdownReason::UserRequest => f.write_str("user requested"),
            ShutdownReason::InputClosed => f.write_str("input closed"),
        }
    }
}

/// Outcome of a headless open, capture and identify pass
#[derive(Debug, Clone)]
pub struct OnceReport {
    pub suggestions: Vec<String>,
    pub health: Option<String>,
    pub saved: Option<ShareOutcome>,
}
