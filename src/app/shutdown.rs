use super::PlantcamApp;
use tracing::info;

impl PlantcamApp {
    /// Stop input, release the camera and abandon any pending request.
    /// Returns the process exit code.
    pub async fn shutdown(&mut self) -> i32 {
        if self.cancellation_token.is_cancelled() {
            return 0;
        }

        info!("Beginning graceful shutdown");
        self.cancellation_token.cancel();

        if let Some(keyboard) = self.keyboard.take() {
            keyboard.stop().await;
        }

        self.controller.shutdown();

        info!("Shutdown complete");
        0
    }
}
