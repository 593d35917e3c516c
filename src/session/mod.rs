//! Capture session: the single owner of camera, photo and identification state

mod controller;
mod state;
#[cfg(test)]
mod tests;

pub use controller::{
    CaptureSessionController, IdentificationCompletion, CAMERA_ERROR_MESSAGE,
    IDENTIFICATION_ERROR_MESSAGE,
};
pub use state::{CaptureState, ErrorState, SessionSnapshot, UserAction};
