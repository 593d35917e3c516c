use super::{OnceReport, PlantcamApp, ShutdownReason};
use crate::error::{PlantcamError, Result};
use crate::events::SessionEvent;
use crate::session::{CaptureState, UserAction, CAMERA_ERROR_MESSAGE, IDENTIFICATION_ERROR_MESSAGE};
use crate::ui::SessionView;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

impl PlantcamApp {
    /// Run interactively on the terminal until the user quits or a signal arrives
    pub async fn run(&mut self) -> Result<i32> {
        info!("plantcam is running");

        let actions = match self.start_input() {
            Ok(actions) => actions,
            Err(e) => {
                self.shutdown().await;
                return Err(e);
            }
        };
        let mut view = SessionView::stdout();
        self.run_until_shutdown(actions, &mut view).await
    }

    /// Run the loop, then shut down whether it ended cleanly or not
    pub async fn run_until_shutdown<W: Write>(
        &mut self,
        actions: mpsc::UnboundedReceiver<UserAction>,
        view: &mut SessionView<W>,
    ) -> Result<i32> {
        let outcome = self.run_with(actions, view).await;
        let exit_code = self.shutdown().await;

        match outcome {
            Ok(reason) => {
                info!("Session ended: {}", reason);
                Ok(exit_code)
            }
            Err(e) => {
                error!("Session loop failed: {}", e);
                Err(e)
            }
        }
    }

    /// Drive the session from `actions`, redrawing `view` on every transition
    pub async fn run_with<W: Write>(
        &mut self,
        mut actions: mpsc::UnboundedReceiver<UserAction>,
        view: &mut SessionView<W>,
    ) -> Result<ShutdownReason> {
        self.ensure_running()?;

        let mut completions = self
            .controller
            .take_completions()
            .ok_or_else(|| PlantcamError::system("Identification completions already taken"))?;
        let mut events = self.event_bus.subscribe();
        let mut shutdown_signal = self.setup_signal_handlers();

        self.redraw(view);

        let reason = loop {
            tokio::select! {
                action = actions.recv() => match action {
                    Some(UserAction::Quit) => break ShutdownReason::UserRequest,
                    Some(action) => {
                        self.controller.dispatch(action).await;
                        self.redraw(view);
                    }
                    None => break ShutdownReason::InputClosed,
                },
                Some(completion) = completions.recv() => {
                    self.controller.apply_identification(completion);
                    self.redraw(view);
                }
                event = events.recv() => match event {
                    Ok(event) => {
                        debug!("{}", event.description());
                        self.redraw(view);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("View lagged behind {} session events", skipped);
                        self.redraw(view);
                    }
                    Err(RecvError::Closed) => break ShutdownReason::InputClosed,
                },
                reason = &mut shutdown_signal => {
                    break reason.unwrap_or_else(|_| ShutdownReason::Signal("unknown".to_string()));
                }
            }
        };

        if let Err(e) = self.event_bus.publish(SessionEvent::ShutdownRequested {
            reason: reason.to_string(),
        }) {
            debug!("Shutdown event not delivered: {}", e);
        }

        Ok(reason)
    }

    /// Open the camera, take one photo and identify it without a terminal UI.
    /// With `save` the photo is also shared or downloaded.
    pub async fn run_once(&mut self, save: bool) -> Result<OnceReport> {
        self.ensure_running()?;

        if !self.controller.open_camera().await {
            return Err(PlantcamError::component("camera", CAMERA_ERROR_MESSAGE));
        }

        if !self.controller.capture_photo() {
            return Err(PlantcamError::component(
                "capture",
                "No frame could be taken from the camera",
            ));
        }

        let limit = Duration::from_secs(self.config.identification.timeout_seconds as u64 + 5);
        match timeout(limit, self.controller.wait_for_identification()).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(PlantcamError::system(
                    "Identification completions already taken",
                ))
            }
            Err(_) => {
                return Err(PlantcamError::component(
                    "identify",
                    "Timed out waiting for identification",
                ))
            }
        }

        let saved = if save {
            self.controller.share_photo().await
        } else {
            None
        };

        let snapshot = self.controller.snapshot();
        if snapshot.state != CaptureState::Identified {
            return Err(PlantcamError::component("identify", IDENTIFICATION_ERROR_MESSAGE));
        }

        Ok(OnceReport {
            suggestions: snapshot.suggestion_lines(),
            health: snapshot.health,
            saved,
        })
    }

    fn redraw<W: Write>(&self, view: &mut SessionView<W>) {
        if let Err(e) = view.render(&self.controller.snapshot()) {
            warn!("Failed to render session: {}", e);
        }
    }

    /// Resolve once SIGINT or SIGTERM arrives
    fn setup_signal_handlers(&self) -> oneshot::Receiver<ShutdownReason> {
        let (tx, rx) = oneshot::channel();
        let sender = Arc::new(Mutex::new(Some(tx)));
        let token = self.cancellation_token.clone();

        #[cfg(unix)]
        {
            let sender = Arc::clone(&sender);
            let token = token.clone();
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

                tokio::select! {
                    Some(()) = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                        if let Some(tx) = sender.lock().take() {
                            let _ = tx.send(ShutdownReason::Signal("SIGTERM".to_string()));
                        }
                    }
                    _ = token.cancelled() => {}
                }
            });
        }

        tokio::spawn(async move {
            tokio::select! {
                Ok(()) = signal::ctrl_c() => {
                    info!("Received SIGINT signal (Ctrl+C)");
                    if let Some(tx) = sender.lock().take() {
                        let _ = tx.send(ShutdownReason::Signal("SIGINT".to_string()));
                    }
                }
                _ = token.cancelled() => {}
            }
        });

        rx
    }
}
