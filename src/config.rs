use std::time::Duration;

use crate::domain::order::PricingPolicy;
use crate::utils::RetryConfig;

/// Placeholder values shipped in sample env files; treated as unset
const PLACEHOLDER_PREFIX: &str = "your_";

/// SMS gateway settings
#[derive(Debug, Clone, Default)]
pub struct SmsConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    /// Country calling code prepended to bare national numbers
    pub country_code: String,
}

impl SmsConfig {
    /// All credentials present and none of them a placeholder
    pub fn is_configured(&self) -> bool {
        [&self.account_sid, &self.auth_token, &self.from_number]
            .iter()
            .all(|value| {
                value
                    .as_deref()
                    .is_some_and(|v| !v.trim().is_empty() && !v.starts_with(PLACEHOLDER_PREFIX))
            })
    }
}

/// Process configuration, read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sms: SmsConfig,
    /// Upper bound on one notification attempt
    pub notify_timeout: Duration,
    pub max_line_quantity: i32,
    /// Attempts used when retrying an operation that hit `Conflict`
    pub conflict_retries: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            sms: SmsConfig {
                account_sid: lookup("CANTEEN_SMS_ACCOUNT_SID"),
                auth_token: lookup("CANTEEN_SMS_AUTH_TOKEN"),
                from_number: lookup("CANTEEN_SMS_FROM"),
                country_code: lookup("CANTEEN_SMS_COUNTRY_CODE")
                    .map(|code| code.trim().trim_start_matches('+').to_string())
                    .filter(|code| !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or_else(|| "91".into()),
            },
            notify_timeout: Duration::from_millis(
                lookup("CANTEEN_NOTIFY_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5000),
            ),
            max_line_quantity: lookup("CANTEEN_MAX_LINE_QUANTITY")
                .and_then(|v| v.parse().ok())
                .filter(|q: &i32| *q >= 1)
                .unwrap_or(100),
            conflict_retries: lookup("CANTEEN_CONFLICT_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        }
    }

    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            max_line_quantity: self.max_line_quantity,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::with_attempts(self.conflict_retries)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
