//! Error types for the swap sender

use thiserror::Error;

/// JSON-RPC error codes a node returns when it is overloaded or behind.
/// These clear up on their own, unlike a rejected transaction.
const RETRYABLE_RPC_CODES: &[i64] = &[
    -32005, // node is behind / rate limited
    -32004, // block not available
    -32014, // block status not yet available
    -32016, // minimum context slot not reached
    429,
];

/// Errors from the ledger RPC layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Timeout waiting for {method}")]
    Timeout { method: String },

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("All RPC endpoints failed for {method}")]
    AllEndpointsFailed { method: String },
}

impl RpcError {
    /// Check if the call may succeed if simply repeated
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport(_)
            | RpcError::Timeout { .. }
            | RpcError::AllEndpointsFailed { .. } => true,
            RpcError::Rpc { code, .. } => RETRYABLE_RPC_CODES.contains(code),
            RpcError::InvalidResponse(_) => false,
        }
    }
}

/// Terminal failures of a single send attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SendError {
    /// The first submission was rejected; nothing was broadcast.
    #[error("Transaction submission failed: {0}")]
    SubmissionFailed(#[source] RpcError),

    /// The blockhash window closed before the transaction was seen.
    #[error(
        "Transaction expired: block height {block_height} passed last valid height \
         {last_valid_block_height} (buffer {buffer}) after {attempts} attempts"
    )]
    Expired {
        block_height: u64,
        last_valid_block_height: u64,
        buffer: u64,
        attempts: u32,
    },

    /// The network processed the transaction and it failed.
    #[error("Transaction {signature} failed on-chain: {error}")]
    TransactionFailed { signature: String, error: String },

    /// Status never resolved. The transaction may still land.
    #[error("Transaction {signature} not confirmed after {attempts} attempts (last block height {last_block_height:?})")]
    NotConfirmed {
        signature: String,
        attempts: u32,
        last_block_height: Option<u64>,
    },

    /// Every status poll failed at the RPC layer.
    #[error("Network error confirming {signature} after {attempts} attempts: {source}")]
    NetworkError {
        signature: String,
        attempts: u32,
        #[source]
        source: RpcError,
    },
}

impl SendError {
    /// Check if rebuilding the transaction with a fresh blockhash is sensible
    pub fn is_retryable_with_fresh_blockhash(&self) -> bool {
        match self {
            SendError::Expired { .. } => true,
            SendError::SubmissionFailed(e) => e.is_retryable(),
            // May still land; the caller must re-query before resending.
            SendError::NotConfirmed { .. } | SendError::NetworkError { .. } => false,
            SendError::TransactionFailed { .. } => false,
        }
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SendError::SubmissionFailed(_) => "submission_failed",
            SendError::Expired { .. } => "expired",
            SendError::TransactionFailed { .. } => "transaction_failed",
            SendError::NotConfirmed { .. } => "not_confirmed",
            SendError::NetworkError { .. } => "network_error",
        }
    }
}

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error("Swap API error: {0}")]
    SwapApi(String),

    #[error("Failed to decode transaction: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for swap sender operations
pub type SwapResult<T> = Result<T, SwapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_classification() {
        assert!(RpcError::Timeout { method: "getBlockHeight".into() }.is_retryable());
        assert!(RpcError::Rpc { code: -32005, message: "node is behind".into() }.is_retryable());
        assert!(!RpcError::Rpc {
            code: -32002,
            message: "Transaction simulation failed".into()
        }
        .is_retryable());
        assert!(!RpcError::InvalidResponse("missing result".into()).is_retryable());
    }

    #[test]
    fn test_send_error_retry_advice() {
        let expired = SendError::Expired {
            block_height: 1_100,
            last_valid_block_height: 1_200,
            buffer: 150,
            attempts: 2,
        };
        assert!(expired.is_retryable_with_fresh_blockhash());
        assert_eq!(expired.kind(), "expired");

        let failed = SendError::TransactionFailed {
            signature: "sig".into(),
            error: "InstructionError".into(),
        };
        assert!(!failed.is_retryable_with_fresh_blockhash());

        let pending = SendError::NotConfirmed {
            signature: "sig".into(),
            attempts: 30,
            last_block_height: Some(10),
        };
        assert!(!pending.is_retryable_with_fresh_blockhash());
    }
}
