//! Ledger module - the RPC surface the sender depends on
//!
//! This module provides:
//! - The `LedgerClient` trait: submit, signature status, latest blockhash, block height
//! - A JSON-RPC implementation with multi-endpoint failover
//! - Shared wire types (commitment levels, statuses, submit options)

pub mod rpc;
pub mod types;

pub use rpc::RpcLedgerClient;
pub use types::{BlockhashWithExpiry, CommitmentLevel, SignatureStatus, SubmitConfig};

use crate::error::RpcError;

use async_trait::async_trait;

/// Client for the four ledger calls the sender needs.
///
/// Every call is independently safe to repeat: submit is idempotent for
/// identical bytes and the rest are pure reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a signed, serialized transaction and return its signature
    async fn submit_transaction(
        &self,
        transaction: &[u8],
        config: &SubmitConfig,
    ) -> Result<String, RpcError>;

    /// Look up a signature; `None` means the node has not seen it
    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, RpcError>;

    /// Fetch a recent blockhash with its last valid block height
    async fn get_latest_blockhash(&self) -> Result<BlockhashWithExpiry, RpcError>;

    /// Current block height
    async fn get_block_height(&self) -> Result<u64, RpcError>;
}
