// ============================================================================
// Collaborator Ports - menu catalog and user directory
// ============================================================================
//
// The ordering core consumes these; it never owns or mutates menu data.
//
// ============================================================================

mod items;
mod users;

pub use items::{CatalogItem, CatalogLookup, InMemoryCatalog};
pub use users::{InMemoryUserDirectory, UserContact, UserDirectory};
