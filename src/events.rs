use crate::error::EventBusError;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Transitions of the capture session, published so the view can re-render
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A live stream was granted by the camera provider
    CameraOpened { stream_id: u64, width: u32, height: u32 },
    /// A live stream had all of its tracks stopped
    CameraReleased { stream_id: u64 },
    /// The camera provider refused or failed to open a stream
    CameraDenied { reason: String },
    /// A still photo was sampled from the stream
    PhotoCaptured {
        width: u32,
        height: u32,
        timestamp: SystemTime,
    },
    /// An identification request went out
    IdentificationStarted { generation: u64 },
    /// An identification request came back with suggestions
    IdentificationCompleted { generation: u64, suggestions: usize },
    /// An identification request failed
    IdentificationFailed { generation: u64, error: String },
    /// A response for an abandoned capture arrived and was dropped
    StaleResponseDiscarded { generation: u64 },
    /// The photo was shared or downloaded
    PhotoShared { destination: String },
    /// Shutdown requested by the user or a signal
    ShutdownRequested { reason: String },
}

impl SessionEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SessionEvent::CameraOpened {
                stream_id,
                width,
                height,
            } => format!("Camera stream {} opened ({}x{})", stream_id, width, height),
            SessionEvent::CameraReleased { stream_id } => {
                format!("Camera stream {} released", stream_id)
            }
            SessionEvent::CameraDenied { reason } => format!("Camera denied: {}", reason),
            SessionEvent::PhotoCaptured { width, height, .. } => {
                format!("Photo captured ({}x{})", width, height)
            }
            SessionEvent::IdentificationStarted { generation } => {
                format!("Identification started (session {})", generation)
            }
            SessionEvent::IdentificationCompleted {
                generation,
                suggestions,
            } => format!(
                "Identification completed (session {}, {} suggestions)",
                generation, suggestions
            ),
            SessionEvent::IdentificationFailed { generation, error } => {
                format!("Identification failed (session {}): {}", generation, error)
            }
            SessionEvent::StaleResponseDiscarded { generation } => {
                format!("Discarded stale response from session {}", generation)
            }
            SessionEvent::PhotoShared { destination } => {
                format!("Photo shared to {}", destination)
            }
            SessionEvent::ShutdownRequested { reason } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::CameraOpened { .. } => "camera_opened",
            SessionEvent::CameraReleased { .. } => "camera_released",
            SessionEvent::CameraDenied { .. } => "camera_denied",
            SessionEvent::PhotoCaptured { .. } => "photo_captured",
            SessionEvent::IdentificationStarted { .. } => "identification_started",
            SessionEvent::IdentificationCompleted { .. } => "identification_completed",
            SessionEvent::IdentificationFailed { .. } => "identification_failed",
            SessionEvent::StaleResponseDiscarded { .. } => "stale_response_discarded",
            SessionEvent::PhotoShared { .. } => "photo_shared",
            SessionEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Broadcast bus carrying session events to the view and other observers
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: SessionEvent) -> Result<usize, EventBusError> {
        match &event {
            SessionEvent::CameraDenied { reason } => {
                warn!("Camera denied: {}", reason);
            }
            SessionEvent::IdentificationFailed { error, .. } => {
                warn!("Identification failed: {}", error);
            }
            SessionEvent::ShutdownRequested { reason } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => {
                debug!("Event: {}", event.description());
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let subscriber_count = event_bus
            .publish(SessionEvent::CameraOpened {
                stream_id: 1,
                width: 640,
                height: 480,
            })
            .unwrap();
        assert_eq!(subscriber_count, 1);

        let received = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.event_type(), "camera_opened");
        assert_eq!(received.description(), "Camera stream 1 opened (640x480)");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_fails() {
        let event_bus = EventBus::new(10);
        assert_eq!(event_bus.subscriber_count(), 0);

        let result = event_bus.publish(SessionEvent::ShutdownRequested {
            reason: "test".to_string(),
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.clone().subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus
            .publish(SessionEvent::IdentificationStarted { generation: 3 })
            .unwrap();

        for receiver in [&mut receiver1, &mut receiver2] {
            let event = receiver.recv().await.unwrap();
            assert!(matches!(
                event,
                SessionEvent::IdentificationStarted { generation: 3 }
            ));
        }
    }
}
