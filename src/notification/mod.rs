// ============================================================================
// Notifications - outbound customer messages on order milestones
// ============================================================================

pub mod sms;
pub mod templates;

use async_trait::async_trait;

pub use sms::{format_phone_number, SmsGateway, SmsNotifier};
pub use templates::Template;

/// Delivers a rendered message to a phone number.
///
/// Callers treat failures as non-fatal: the order change they report on has
/// already been committed.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, phone: &str, message: &str) -> anyhow::Result<()>;
}
