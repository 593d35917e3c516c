use super::PlantcamApp;
use crate::error::Result;
use crate::session::UserAction;
use crate::ui::KeyboardInput;
use tokio::sync::mpsc;
use tracing::info;

impl PlantcamApp {
    /// Start reading the keyboard and return the stream of user actions
    pub fn start_input(&mut self) -> Result<mpsc::UnboundedReceiver<UserAction>> {
        self.ensure_running()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let keyboard = KeyboardInput::new(tx);
        keyboard.start()?;
        self.keyboard = Some(keyboard);

        info!("Keyboard input started");
        Ok(rx)
    }
}
