//! Outbound domain events.

use async_trait::async_trait;

use crate::domain::events::DomainEvent;

/// Called after the state change has committed. Failures are logged,
/// never returned.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent);

    async fn publish_all(&self, events: &[DomainEvent]) {
        for event in events {
            self.publish(event).await;
        }
    }
}

pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, event: &DomainEvent) {
        tracing::trace!(subject = %event.subject(), "event dropped, no broker configured");
    }
}

pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client) -> Self { Self { client } }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: &DomainEvent) {
        let subject = event.subject();
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(%subject, error = %e, "failed to encode event");
                return;
            }
        };
        if let Err(e) = self.client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(%subject, error = %e, "failed to publish event");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every published event for assertions.
    #[derive(Default)]
    pub struct RecordingPublisher {
        events: Mutex<Vec<DomainEvent>>,
    }

    impl RecordingPublisher {
        pub fn subjects(&self) -> Vec<String> {
            self.events.lock().unwrap().iter().map(DomainEvent::subject).collect()
        }
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, event: &DomainEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
