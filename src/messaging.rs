//! Domain event publishing. Events go out after the transaction that caused
//! them has committed; a failed publish is logged and never undoes the write.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::events::DomainEvent;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent);

    async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(event).await;
        }
    }
}

/// Writes events to the log only.
#[derive(Debug, Clone, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: DomainEvent) {
        info!(subject = event.subject(), ?event, "domain event");
    }
}

#[derive(Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub async fn connect(url: &str) -> Result<Self, async_nats::ConnectError> {
        let client = async_nats::connect(url).await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: DomainEvent) {
        let subject = event.subject();
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(subject, error = %e, "failed to encode domain event");
                return;
            }
        };
        if let Err(e) = self.client.publish(subject.to_string(), payload.into()).await {
            warn!(subject, error = %e, "failed to publish domain event");
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use recording::RecordingPublisher;

#[cfg(any(test, feature = "test-util"))]
mod recording {
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    use super::EventPublisher;
    use crate::domain::events::DomainEvent;

    /// Keeps published events in memory.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingPublisher {
        events: Arc<Mutex<Vec<DomainEvent>>>,
    }

    impl RecordingPublisher {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn events(&self) -> Vec<DomainEvent> {
            self.events.lock().await.clone()
        }
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, event: DomainEvent) {
            self.events.lock().await.push(event);
        }
    }
}
