//! Swap execution on top of the transaction sender
//!
//! Quotes and unsigned transactions come from the swap API. Signing is
//! delegated to a `TransactionSigner`; this crate never holds keys.

mod client;
mod types;

pub use client::SwapApiClient;
pub use types::{Currency, RateQuote, SwapRequest, SwapResponse, TransactionFormat};

use crate::error::SwapResult;
use crate::sender::{SendOptions, SerializedTransaction, TransactionSender, TransactionSignature};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// A transaction after signing, with its identifying signature
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    pub transaction: SerializedTransaction,
    pub signature: TransactionSignature,
}

/// External signing capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Base58 public key of the fee payer
    fn public_key(&self) -> String;

    /// Sign a serialized, unsigned transaction in the given format
    async fn sign(&self, unsigned: &[u8], format: TransactionFormat)
        -> SwapResult<SignedTransaction>;
}

/// Quotes, signs and sends swaps
pub struct SwapExecutor {
    api: SwapApiClient,
    sender: TransactionSender,
    signer: Arc<dyn TransactionSigner>,
}

impl SwapExecutor {
    pub fn new(
        api: SwapApiClient,
        sender: TransactionSender,
        signer: Arc<dyn TransactionSigner>,
    ) -> Self {
        Self {
            api,
            sender,
            signer,
        }
    }

    pub async fn get_rate(
        &self,
        from: &str,
        to: &str,
        amount: f64,
        slippage: f64,
    ) -> SwapResult<RateQuote> {
        self.api.get_rate(from, to, amount, slippage).await
    }

    /// Build a swap paid for by the signer's key
    pub async fn get_swap_instructions(
        &self,
        from: &str,
        to: &str,
        from_amount: &str,
        slippage: f64,
        priority_fee: Option<f64>,
        force_legacy: bool,
    ) -> SwapResult<SwapResponse> {
        let request = SwapRequest {
            from: from.to_string(),
            to: to.to_string(),
            from_amount: from_amount.to_string(),
            slippage,
            payer: self.signer.public_key(),
            priority_fee,
            force_legacy,
        };
        self.api.get_swap_instructions(&request).await
    }

    /// Sign the swap transaction, send it and wait for it to land
    pub async fn perform_swap(
        &self,
        swap: &SwapResponse,
        options: &SendOptions,
    ) -> SwapResult<String> {
        let unsigned = SerializedTransaction::from_base64(&swap.txn)?;
        let format = swap.transaction_format();

        let signed = self.signer.sign(unsigned.as_bytes(), format).await?;
        let expiry = self.sender.ledger().get_latest_blockhash().await?;

        info!(
            "Performing {:?} swap {} (last valid height {})",
            format, signed.signature, expiry.last_valid_block_height
        );

        let signature = self
            .sender
            .send(signed.transaction, signed.signature, expiry, options)
            .await?;

        Ok(signature.into_string())
    }
}
