use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use anyhow::Result;

// ============================================================================
// Event Envelope - Metadata around committed domain events
// ============================================================================

/// Wraps a domain event with identity, ordering and actor metadata.
/// Envelopes are committed together with the aggregate snapshot they produced
/// and form the audit trail of that aggregate.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EventEnvelope<E> {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub sequence_number: i64,

    pub event_type: String,
    pub event_version: i32,

    pub event_data: E,

    // Correlation groups the envelopes written by one request
    pub correlation_id: Uuid,

    pub user_id: Option<Uuid>,

    pub timestamp: DateTime<Utc>,

    pub metadata: HashMap<String, String>,
}

impl<E: DomainEvent> EventEnvelope<E> {
    pub fn new(
        aggregate_id: Uuid,
        sequence_number: i64,
        event_data: E,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            sequence_number,
            event_type: event_data.type_name().to_string(),
            event_version: E::event_version(),
            event_data,
            correlation_id,
            user_id: None,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }
}

impl<E> EventEnvelope<E> {
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Wrap a batch of freshly emitted events into envelopes numbered after
/// `expected_version`.
pub fn envelop<E: DomainEvent>(
    aggregate_id: Uuid,
    expected_version: i64,
    events: Vec<E>,
    correlation_id: Uuid,
    user_id: Uuid,
) -> Vec<EventEnvelope<E>> {
    events
        .into_iter()
        .zip(expected_version + 1..)
        .map(|(event, seq)| {
            EventEnvelope::new(aggregate_id, seq, event, correlation_id).with_user(user_id)
        })
        .collect()
}

// ============================================================================
// Domain Event Trait
// ============================================================================

pub trait DomainEvent: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync {
    /// Name of the concrete variant, used as the envelope's `event_type`
    fn type_name(&self) -> &'static str;

    fn event_version() -> i32 where Self: Sized { 1 }
}

pub fn serialize_event<E: Serialize>(event: &E) -> Result<String> {
    Ok(serde_json::to_string(event)?)
}
