//! Verification and dispatch of WhiteBIT webhook deliveries.
//!
//! This module holds the pure logic only: the embedding HTTP server passes the
//! request headers to [`WebhookDispatcher::process`].

mod credentials;
pub mod payload;
mod signature;
mod verifier;

pub use credentials::{ENV_WEBHOOK_KEY, ENV_WEBHOOK_SECRET, WebhookCredentials};
pub use payload::{
    CodeApplyParams, Confirmations, TransactionParams, WebhookEvent, WebhookRequest,
};
pub use signature::{sign_payload, verify_signature};
pub use verifier::{
    HEADER_API_KEY, HEADER_PAYLOAD, HEADER_SIGNATURE, WebhookDispatcher, verification_body,
};
