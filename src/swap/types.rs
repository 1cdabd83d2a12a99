//! Swap API request and response types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Token descriptor attached to quotes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub mint: String,
    pub decimals: u8,
}

/// Price quote for swapping `amount_in` of one token into another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    #[serde(default)]
    pub amount_in: f64,
    #[serde(default)]
    pub amount_out: f64,
    #[serde(default)]
    pub min_amount_out: f64,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub execution_price: f64,
    #[serde(default)]
    pub price_impact: f64,
    #[serde(default)]
    pub fee: f64,
    pub platform_fee: Option<f64>,
    #[serde(rename = "platformFeeUI")]
    pub platform_fee_ui: Option<f64>,
    pub base_currency: Option<Currency>,
    pub quote_currency: Option<Currency>,
    /// Fields this client does not model
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Parameters for building a swap transaction
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub from: String,
    pub to: String,
    /// Token amount, or an API keyword such as `auto` or `50%`
    pub from_amount: String,
    pub slippage: f64,
    pub payer: String,
    pub priority_fee: Option<f64>,
    pub force_legacy: bool,
}

impl SwapRequest {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("from", self.from.clone()),
            ("to", self.to.clone()),
            ("fromAmount", self.from_amount.clone()),
            ("slippage", self.slippage.to_string()),
            ("payer", self.payer.clone()),
            ("forceLegacy", self.force_legacy.to_string()),
        ];
        if let Some(fee) = self.priority_fee {
            query.push(("priorityFee", fee.to_string()));
        }
        query
    }
}

/// Unsigned swap transaction as built by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    /// Base64 encoded transaction, signed by nobody yet
    pub txn: String,
    #[serde(default)]
    pub is_jupiter: bool,
    /// Copied from the request; the API does not echo it
    #[serde(default)]
    pub force_legacy: bool,
    #[serde(rename = "type", default)]
    pub tx_type: Option<String>,
    pub rate: Option<RateQuote>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl SwapResponse {
    /// Wire format the payload must be signed in
    pub fn transaction_format(&self) -> TransactionFormat {
        if self.is_jupiter && !self.force_legacy {
            TransactionFormat::Versioned
        } else {
            TransactionFormat::Legacy
        }
    }
}

/// Serialization format of a transaction payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionFormat {
    Legacy,
    Versioned,
}
