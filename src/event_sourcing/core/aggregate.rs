use uuid::Uuid;
use anyhow::Result;
use super::event::EventEnvelope;

// ============================================================================
// Aggregate Root Pattern
// ============================================================================
//
// Key Principles:
// 1. Commands are validated against current state before anything is written
// 2. Accepted commands produce events; events are facts
// 3. State only changes by applying events
// 4. The version is the sequence number of the last committed event
//
// ============================================================================

/// Generic aggregate contract.
///
/// Type Parameters:
/// - `Event`: facts emitted by the aggregate
/// - `Command`: intents handled by the aggregate
/// - `Error`: business rule violations
pub trait Aggregate: Sized + Send + Sync {
    type Event;
    type Command;
    type Error;

    /// Validate a creation command and emit the events that bring the
    /// aggregate into existence.
    fn initial_events(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Create new aggregate from first event
    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error>;

    /// Apply subsequent events to update state
    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error>;

    /// Handle command against current state and emit events.
    /// An empty vector means the command is an accepted no-op.
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    fn aggregate_id(&self) -> Uuid;

    /// Sequence number of the last committed event (0 = never committed)
    fn version(&self) -> i64;

    fn set_version(&mut self, version: i64);

    /// Rebuild aggregate state from its committed history
    fn load_from_events(events: &[EventEnvelope<Self::Event>]) -> Result<Self>
    where
        Self::Error: std::fmt::Display,
    {
        let Some((first, rest)) = events.split_first() else {
            anyhow::bail!("No events to load");
        };

        let mut aggregate = Self::apply_first_event(&first.event_data)
            .map_err(|e| anyhow::anyhow!("Failed to apply first event: {}", e))?;
        aggregate.set_version(first.sequence_number);

        for envelope in rest {
            aggregate.apply_event(&envelope.event_data)
                .map_err(|e| anyhow::anyhow!("Failed to apply event: {}", e))?;
            aggregate.set_version(envelope.sequence_number);
        }

        Ok(aggregate)
    }
}
