use crate::error::Result;
use crate::session::UserAction;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Key binding for a pressed key, if any.
///
/// Raw mode delivers Ctrl+C as a key press instead of SIGINT, so it quits.
/// Other Ctrl/Alt chords are unbound.
pub fn action_for_key(code: KeyCode, modifiers: KeyModifiers) -> Option<UserAction> {
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(UserAction::Quit),
            _ => None,
        };
    }
    if modifiers.contains(KeyModifiers::ALT) {
        return None;
    }

    match code {
        KeyCode::Char('o') | KeyCode::Enter => Some(UserAction::OpenCamera),
        KeyCode::Char(' ') | KeyCode::Char('c') => Some(UserAction::CapturePhoto),
        KeyCode::Char('s') => Some(UserAction::SharePhoto),
        KeyCode::Char('r') => Some(UserAction::RetryIdentification),
        KeyCode::Char('q') | KeyCode::Esc => Some(UserAction::Quit),
        _ => None,
    }
}

/// Reads the terminal in raw mode and forwards bound keys as user actions
pub struct KeyboardInput {
    actions: mpsc::UnboundedSender<UserAction>,
    cancellation_token: CancellationToken,
}

impl KeyboardInput {
    pub fn new(actions: mpsc::UnboundedSender<UserAction>) -> Self {
        Self {
            actions,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Start listening for key presses on a blocking thread
    pub fn start(&self) -> Result<()> {
        info!("Keyboard ready: o/Enter open, Space capture, s share, r retry, q quit");

        let actions = self.actions.clone();
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            while !cancellation_token.is_cancelled() {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        let Some(action) = action_for_key(key_event.code, key_event.modifiers)
                        else {
                            debug!("Unbound key: {:?} {:?}", key_event.modifiers, key_event.code);
                            continue;
                        };

                        if actions.send(action).is_err() {
                            debug!("Action receiver closed; keyboard input exiting");
                            break;
                        }
                        if action == UserAction::Quit {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }
            debug!("Keyboard input task exited");
        });

        Ok(())
    }

    pub async fn stop(&self) {
        self.cancellation_token.cancel();

        // Let the polling thread notice and restore the terminal
        tokio::time::sleep(Duration::from_millis(150)).await;
        let _ = disable_raw_mode();
    }
}
