//! Session-scoped broadcast events for decoupled listeners.

use ota_schema::PipelineEvent;
use tokio::sync::broadcast;

const CAPACITY: usize = 16;

/// Fan-out of [`PipelineEvent`]s. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self { sender }
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn publish(&self, event: PipelineEvent) {
        tracing::debug!("Broadcast {event:?}");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_see_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(PipelineEvent::ExtractFinished);
        bus.publish(PipelineEvent::InstallFinished {
            package_name: "update.zip".into(),
        });

        assert_eq!(rx.recv().await.unwrap(), PipelineEvent::ExtractFinished);
        assert_eq!(rx.recv().await.unwrap(), PipelineEvent::InstallFinished {
            package_name: "update.zip".into()
        });
    }

    #[test]
    fn test_publish_without_subscribers() {
        EventBus::new().publish(PipelineEvent::ExtractErrored);
    }
}
