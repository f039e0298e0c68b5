//! Webhook payload models.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::types::TransactionMethod;
use crate::types::serde_helpers::{default_on_error, empty_string_as_none};

/// Webhook method names.
pub mod methods {
    pub const CODE_APPLY: &str = "code.apply";
    pub const DEPOSIT_ACCEPTED: &str = "deposit.accepted";
    pub const DEPOSIT_UPDATED: &str = "deposit.updated";
    pub const DEPOSIT_PROCESSED: &str = "deposit.processed";
    pub const DEPOSIT_CANCELED: &str = "deposit.canceled";
    pub const WITHDRAW_UNCONFIRMED: &str = "withdraw.unconfirmed";
    pub const WITHDRAW_PENDING: &str = "withdraw.pending";
    pub const WITHDRAW_CANCELED: &str = "withdraw.canceled";
    pub const WITHDRAW_SUCCESSFUL: &str = "withdraw.successful";

    /// Methods whose params are a [`TransactionParams`](super::TransactionParams).
    pub const TRANSACTION: &[&str] = &[
        DEPOSIT_ACCEPTED,
        DEPOSIT_UPDATED,
        DEPOSIT_PROCESSED,
        DEPOSIT_CANCELED,
        WITHDRAW_UNCONFIRMED,
        WITHDRAW_PENDING,
        WITHDRAW_CANCELED,
        WITHDRAW_SUCCESSFUL,
    ];
}

/// Decoded webhook body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookRequest {
    /// UUID identifying this delivery.
    pub id: String,
    /// The event name.
    pub method: String,
    /// Raw event params; see [`WebhookRequest::event`].
    pub params: Value,
}

impl WebhookRequest {
    /// Interpret `params` according to `method`.
    pub fn event(&self) -> Result<WebhookEvent, serde_json::Error> {
        let method = self.method.as_str();
        if method == methods::CODE_APPLY {
            return serde_json::from_value(self.params.clone()).map(WebhookEvent::CodeApply);
        }
        if methods::TRANSACTION.contains(&method) {
            return serde_json::from_value(self.params.clone()).map(WebhookEvent::Transaction);
        }
        Ok(WebhookEvent::Other(self.params.clone()))
    }
}

/// Typed webhook params.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// A WhiteBIT code was applied.
    CodeApply(CodeApplyParams),
    /// A deposit or withdrawal changed state.
    Transaction(TransactionParams),
    /// A method this library does not model.
    Other(Value),
}

/// `code.apply` params.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CodeApplyParams {
    /// The applied code.
    pub code: String,
    /// Strictly increasing per delivery.
    #[serde(default)]
    pub nonce: Option<u64>,
}

/// Block confirmation progress of a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Confirmations {
    /// Current confirmations.
    pub actual: u32,
    /// Confirmations required to credit the deposit.
    pub required: u32,
}

/// Deposit and withdrawal params.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    /// Wallet address.
    pub address: String,
    /// Amount.
    pub amount: Decimal,
    /// Creation time (unix seconds).
    pub created_at: i64,
    /// Currency name.
    pub currency: String,
    /// Description.
    #[serde(deserialize_with = "empty_string_as_none::deserialize", default)]
    pub description: Option<String>,
    /// Fee.
    pub fee: Decimal,
    /// Memo or destination tag.
    #[serde(deserialize_with = "empty_string_as_none::deserialize", default)]
    pub memo: Option<String>,
    /// Deposit or withdrawal.
    #[serde(default)]
    pub method: Option<TransactionMethod>,
    /// Network, for multi-network currencies.
    #[serde(default)]
    pub network: Option<String>,
    /// Exchange status code.
    #[serde(default)]
    pub status: Option<i64>,
    /// Currency ticker.
    pub ticker: String,
    /// On-chain transaction hash.
    pub transaction_hash: String,
    /// Unique transaction ID.
    #[serde(default)]
    pub unique_id: Option<String>,
    /// Confirmation progress.
    #[serde(deserialize_with = "default_on_error::deserialize", default)]
    pub confirmations: Option<Confirmations>,
    /// Strictly increasing per delivery.
    #[serde(default)]
    pub nonce: Option<u64>,
}
