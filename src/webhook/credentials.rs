//! Credential management for webhook verification.

use secrecy::{ExposeSecret, SecretString};

/// Default environment variable holding the webhook key.
pub const ENV_WEBHOOK_KEY: &str = "WHITEBIT_WEBHOOK_KEY";
/// Default environment variable holding the webhook secret.
pub const ENV_WEBHOOK_SECRET: &str = "WHITEBIT_WEBHOOK_SECRET";

/// Webhook key and secret issued by WhiteBIT.
#[derive(Clone)]
pub struct WebhookCredentials {
    /// The public webhook key, echoed in the `X-TXC-APIKEY` header.
    pub webhook_key: String,
    /// The secret used to sign payloads.
    secret: SecretString,
}

impl WebhookCredentials {
    /// Create new credentials from a webhook key and secret.
    pub fn new(webhook_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            webhook_key: webhook_key.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// Get the secret for signing.
    ///
    /// This method exposes the secret - use carefully.
    pub fn expose_secret(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Read credentials from `WHITEBIT_WEBHOOK_KEY` and
    /// `WHITEBIT_WEBHOOK_SECRET`.
    ///
    /// Returns `None` if either variable is not set.
    pub fn try_from_env() -> Option<Self> {
        Self::try_from_env_vars(ENV_WEBHOOK_KEY, ENV_WEBHOOK_SECRET)
    }

    /// Read credentials from custom environment variable names.
    ///
    /// Returns `None` if either variable is not set.
    pub fn try_from_env_vars(key_var: &str, secret_var: &str) -> Option<Self> {
        let webhook_key = std::env::var(key_var).ok()?;
        let secret = std::env::var(secret_var).ok()?;
        Some(Self::new(webhook_key, secret))
    }
}

impl std::fmt::Debug for WebhookCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookCredentials")
            .field("webhook_key", &self.webhook_key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
