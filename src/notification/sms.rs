use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::SmsConfig;
use crate::notification::NotificationSink;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};

/// Transport to an SMS provider; returns the provider's message id.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, to: &str, from: &str, body: &str) -> Result<String>;
}

/// Normalise a stored phone number to E.164.
///
/// Separators are dropped, a bare national number gets `country_code`
/// prepended, and anything already carrying a code just gains the `+`.
pub fn format_phone_number(raw: &str, country_code: &str) -> Result<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        anyhow::bail!("phone number '{}' contains no digits", raw);
    }

    if digits.len() == 10 {
        return Ok(format!("+{}{}", country_code, digits));
    }
    Ok(format!("+{}", digits))
}

pub struct SmsNotifier {
    config: SmsConfig,
    gateway: Option<Arc<dyn SmsGateway>>,
    circuit_breaker: CircuitBreaker,
}

impl SmsNotifier {
    /// Sends through `gateway` when credentials are configured, otherwise
    /// only logs the message.
    pub fn new(config: SmsConfig, gateway: Arc<dyn SmsGateway>) -> Self {
        let gateway = if config.is_configured() {
            Some(gateway)
        } else {
            tracing::warn!("SMS credentials missing or placeholders, notifications will be logged only");
            None
        };

        let cb_config = CircuitBreakerConfig {
            failure_threshold: 5,
            cool_down: Duration::from_secs(30),
            success_threshold: 2,
        };

        Self {
            config,
            gateway,
            circuit_breaker: CircuitBreaker::new(cb_config),
        }
    }

    pub fn is_live(&self) -> bool {
        self.gateway.is_some()
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }
}

#[async_trait]
impl NotificationSink for SmsNotifier {
    async fn notify(&self, phone: &str, message: &str) -> Result<()> {
        let to = format_phone_number(phone, &self.config.country_code)?;

        let (gateway, from) = match (&self.gateway, self.config.from_number.as_deref()) {
            (Some(gateway), Some(from)) => (gateway, from),
            _ => {
                tracing::info!(to = %to, message = %message, "SMS (log only)");
                return Ok(());
            }
        };

        let result = self.circuit_breaker.call(gateway.send(&to, from, message)).await;

        match result {
            Ok(message_id) => {
                tracing::info!(to = %to, message_id = %message_id, "SMS sent");
                Ok(())
            }
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::error!(to = %to, "Circuit breaker open - SMS gateway unavailable");
                Err(anyhow::anyhow!("Circuit breaker open for SMS gateway"))
            }
            Err(CircuitBreakerError::OperationFailed(e)) => {
                tracing::error!(error = %e, to = %to, "Failed to send SMS");
                Err(e)
            }
        }
    }
}
