// ============================================================================
// Event Sourcing Core - Generic Abstractions
// ============================================================================
//
// Nothing in here knows about orders, menus or users.
//
// ============================================================================

pub mod aggregate;
pub mod event;

pub use aggregate::Aggregate;
pub use event::{DomainEvent, EventEnvelope, envelop, serialize_event};
