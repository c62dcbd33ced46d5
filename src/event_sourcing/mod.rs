// ============================================================================
// Event Sourcing Infrastructure
// ============================================================================
//
// Generic aggregate/event contracts. Domain-specific code is in src/domain/,
// persistence lives in src/store/.
//
// ============================================================================

mod core;

pub use self::core::*;
