//! Header verification and method dispatch for incoming webhooks.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use crate::error::WhitebitError;
use crate::webhook::payload::{WebhookEvent, WebhookRequest, methods};
use crate::webhook::signature::verify_signature;
use crate::webhook::WebhookCredentials;

/// Header carrying the webhook key.
pub const HEADER_API_KEY: &str = "X-TXC-APIKEY";
/// Header carrying the base64 encoded body.
pub const HEADER_PAYLOAD: &str = "X-TXC-PAYLOAD";
/// Header carrying the hex HMAC-SHA512 of the payload header.
pub const HEADER_SIGNATURE: &str = "X-TXC-SIGNATURE";

type Handler = Box<dyn Fn(&WebhookRequest, WebhookEvent) -> Result<(), WhitebitError> + Send + Sync>;

fn header<'a>(headers: &'a [(&str, &str)], name: &str) -> Result<&'a str, WhitebitError> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| *value)
        .ok_or_else(|| WhitebitError::Webhook(format!("missing header {name}")))
}

/// Verifies webhook deliveries and routes them to per-method handlers.
///
/// Handlers for every documented method are registered on construction and
/// only log the event; replace them with [`register_handler`](Self::register_handler).
pub struct WebhookDispatcher {
    credentials: WebhookCredentials,
    handlers: HashMap<String, Handler>,
}

impl WebhookDispatcher {
    pub fn new(credentials: WebhookCredentials) -> Self {
        let mut dispatcher = Self {
            credentials,
            handlers: HashMap::new(),
        };
        dispatcher.register_handler(methods::CODE_APPLY, log_event);
        for method in methods::TRANSACTION {
            dispatcher.register_handler(method, log_event);
        }
        dispatcher
    }

    /// Replace the handler for `method`.
    pub fn register_handler<F>(&mut self, method: &str, handler: F)
    where
        F: Fn(&WebhookRequest, WebhookEvent) -> Result<(), WhitebitError> + Send + Sync + 'static,
    {
        self.handlers.insert(method.to_string(), Box::new(handler));
    }

    /// Check the headers of a delivery and decode its body.
    ///
    /// The key must match, the signature must be valid for the payload header,
    /// and the decoded body must carry `id`, `method` and `params`.
    pub fn verify(&self, headers: &[(&str, &str)]) -> Result<WebhookRequest, WhitebitError> {
        let api_key = header(headers, HEADER_API_KEY)?;
        let payload = header(headers, HEADER_PAYLOAD)?;
        let signature = header(headers, HEADER_SIGNATURE)?;

        if api_key != self.credentials.webhook_key {
            return Err(WhitebitError::Webhook("webhook key mismatch".into()));
        }
        verify_signature(&self.credentials, payload, signature)?;

        let body = BASE64
            .decode(payload.trim())
            .map_err(|e| WhitebitError::Webhook(format!("payload is not valid base64: {e}")))?;
        let value: Value = serde_json::from_slice(&body)?;
        for field in ["id", "method", "params"] {
            if value.get(field).is_none() {
                return Err(WhitebitError::Webhook(format!("payload has no `{field}`")));
            }
        }
        serde_json::from_value(value)
            .map_err(|e| WhitebitError::Webhook(format!("malformed payload: {e}")))
    }

    /// Run the handler registered for `request.method`.
    pub fn handle(&self, request: &WebhookRequest) -> Result<(), WhitebitError> {
        let handler = self.handlers.get(&request.method).ok_or_else(|| {
            WhitebitError::Webhook(format!("no handler for method {}", request.method))
        })?;
        let event = request
            .event()
            .map_err(|e| WhitebitError::Webhook(format!("invalid {} params: {e}", request.method)))?;
        tracing::debug!(id = %request.id, method = %request.method, "Dispatching webhook");
        handler(request, event)
    }

    /// [`verify`](Self::verify) then [`handle`](Self::handle).
    pub fn process(&self, headers: &[(&str, &str)]) -> Result<WebhookRequest, WhitebitError> {
        let request = self.verify(headers).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected webhook delivery");
        })?;
        self.handle(&request)?;
        Ok(request)
    }
}

impl std::fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<_> = self.handlers.keys().collect();
        methods.sort();
        f.debug_struct("WebhookDispatcher")
            .field("credentials", &self.credentials)
            .field("methods", &methods)
            .finish()
    }
}

fn log_event(request: &WebhookRequest, event: WebhookEvent) -> Result<(), WhitebitError> {
    match event {
        WebhookEvent::CodeApply(params) => {
            tracing::info!(id = %request.id, code = %params.code, "Code applied");
        }
        WebhookEvent::Transaction(tx) => {
            tracing::info!(
                id = %request.id,
                method = %request.method,
                ticker = %tx.ticker,
                amount = %tx.amount,
                hash = %tx.transaction_hash,
                "Transaction event"
            );
        }
        WebhookEvent::Other(params) => {
            tracing::info!(id = %request.id, method = %request.method, %params, "Webhook event");
        }
    }
    Ok(())
}

/// Body to serve at `/whiteBIT-verification` so WhiteBIT can confirm
/// ownership of the webhook endpoint.
pub fn verification_body(credentials: &WebhookCredentials) -> Value {
    Value::Array(vec![Value::String(credentials.webhook_key.clone())])
}
