// ============================================================================
// Order Domain - the canteen order lifecycle
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (LineItem, OrderStatus) and exact money helpers
// - Events (OrderPlaced, OrderStatusAdvanced, OrderCancelled)
// - Commands (PlaceOrder, AdvanceStatus, CancelOrder)
// - Errors (OrderError enum)
// - Aggregate (Order, with the status state machine)
// - Pricing (OrderBuilder, turns requested lines into a priced order)
// - Authorization (role/capability table and ownership checks)
// - Command handler and query service
//
// ============================================================================

pub mod value_objects;
pub mod money;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod filter;
pub mod authorization;
pub mod pricing;
pub mod command_handler;
pub mod queries;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use filter::OrderFilter;
pub use authorization::{Actor, Capability, Role};
pub use pricing::{BuiltOrder, OrderBuilder, PricingPolicy};
pub use command_handler::{CancellationAck, OrderCommandHandler};
pub use queries::{DailySummary, OrderQueryService};
