//! Publishes cart events to NATS as JSON, one subject per event type.

use crate::domain::events::{CartEvent, EventSink, TracingEventSink};

pub struct NatsEventSink {
    client: async_nats::Client,
    subject_prefix: String,
}

impl NatsEventSink {
    pub fn new(client: async_nats::Client, subject_prefix: impl Into<String>) -> Self {
        Self { client, subject_prefix: subject_prefix.into() }
    }

    pub fn subject_for(&self, event: &CartEvent) -> String {
        format!("{}.{}", self.subject_prefix, event.kind())
    }
}

impl EventSink for NatsEventSink {
    fn emit(&self, event: &CartEvent) {
        TracingEventSink.emit(event);

        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, kind = event.kind(), "failed to encode cart event");
                return;
            }
        };
        let subject = self.subject_for(event);
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                tracing::warn!(error = %e, %subject, "failed to publish cart event");
            }
        });
    }
}
