//! Common domain types for the WhiteBIT API.

use serde::{Deserialize, Serialize};

/// Taker side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy
    Buy,
    /// Sell
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Direction of a webhook transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TransactionMethod {
    /// Incoming funds
    Deposit,
    /// Outgoing funds
    Withdraw,
}

impl TryFrom<u8> for TransactionMethod {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Deposit),
            2 => Ok(Self::Withdraw),
            other => Err(format!("unknown transaction method {other}")),
        }
    }
}

impl From<TransactionMethod> for u8 {
    fn from(method: TransactionMethod) -> Self {
        match method {
            TransactionMethod::Deposit => 1,
            TransactionMethod::Withdraw => 2,
        }
    }
}
