//! Example: Verifying and dispatching a webhook delivery.
//!
//! Run with: cargo run --example webhook_verify

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing_subscriber::EnvFilter;
use whitebit_api_client::webhook::{
    HEADER_API_KEY, HEADER_PAYLOAD, HEADER_SIGNATURE, WebhookCredentials, WebhookDispatcher,
    WebhookEvent, payload::methods, sign_payload, verification_body,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let credentials = WebhookCredentials::try_from_env()
        .unwrap_or_else(|| WebhookCredentials::new("webhook_key", "webhook_secret"));
    println!("Verification body: {}", verification_body(&credentials));

    let mut dispatcher = WebhookDispatcher::new(credentials.clone());
    dispatcher.register_handler(methods::DEPOSIT_PROCESSED, |request, event| {
        if let WebhookEvent::Transaction(tx) = event {
            println!("Deposit {} processed: {} {}", request.id, tx.amount, tx.ticker);
        }
        Ok(())
    });

    // Simulate what WhiteBIT would send.
    let body = serde_json::json!({
        "id": "0d5bb3a0-7f36-4b35-9a0b-8d4b1c3c8a11",
        "method": "deposit.processed",
        "params": {
            "address": "wallet_address",
            "amount": "0.5",
            "createdAt": 1631031469,
            "currency": "Bitcoin",
            "fee": "0",
            "memo": "",
            "method": 1,
            "ticker": "BTC",
            "transactionHash": "tx_hash"
        }
    });
    let payload = BASE64.encode(body.to_string());
    let signature = sign_payload(&credentials, &payload)?;

    let headers = [
        (HEADER_API_KEY, credentials.webhook_key.as_str()),
        (HEADER_PAYLOAD, payload.as_str()),
        (HEADER_SIGNATURE, signature.as_str()),
    ];
    let request = dispatcher.process(&headers)?;
    println!("Handled {}", request.method);

    let forged = [
        (HEADER_API_KEY, credentials.webhook_key.as_str()),
        (HEADER_PAYLOAD, payload.as_str()),
        (HEADER_SIGNATURE, "00"),
    ];
    if let Err(e) = dispatcher.process(&forged) {
        println!("Rejected forged delivery: {e}");
    }

    Ok(())
}
