//! HMAC-SHA512 signatures for webhook payloads.
//!
//! WhiteBIT signs the base64 payload header as sent:
//! ```text
//! X-TXC-SIGNATURE = hex(HMAC-SHA512(X-TXC-PAYLOAD, secret))
//! ```

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::WhitebitError;
use crate::webhook::WebhookCredentials;

type HmacSha512 = Hmac<Sha512>;

fn mac(credentials: &WebhookCredentials, payload: &str) -> Result<HmacSha512, WhitebitError> {
    let mut mac = HmacSha512::new_from_slice(credentials.expose_secret().as_bytes())
        .map_err(|e| WhitebitError::Webhook(format!("Invalid HMAC key: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Compute the hex signature WhiteBIT would send for `payload`.
///
/// # Example
///
/// ```rust
/// use whitebit_api_client::webhook::{WebhookCredentials, sign_payload};
///
/// let credentials = WebhookCredentials::new("key", "secret");
/// let signature = sign_payload(&credentials, "eyJpZCI6IjEifQ==").unwrap();
/// assert_eq!(signature.len(), 128);
/// ```
pub fn sign_payload(credentials: &WebhookCredentials, payload: &str) -> Result<String, WhitebitError> {
    Ok(hex::encode(mac(credentials, payload)?.finalize().into_bytes()))
}

/// Check a hex signature against `payload` in constant time.
pub fn verify_signature(
    credentials: &WebhookCredentials,
    payload: &str,
    signature: &str,
) -> Result<(), WhitebitError> {
    let expected = hex::decode(signature.trim())
        .map_err(|_| WhitebitError::Webhook("signature is not valid hex".into()))?;
    mac(credentials, payload)?
        .verify_slice(&expected)
        .map_err(|_| WhitebitError::Webhook("signature mismatch".into()))
}
