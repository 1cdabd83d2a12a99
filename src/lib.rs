//! Swap Sender - broadcast and confirm signed Solana transactions
//!
//! Submits a signed transaction, keeps re-broadcasting it while polling its
//! status, and decides within the blockhash validity window whether it
//! landed.

pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod sender;
pub mod swap;

pub use config::Settings;
pub use error::{RpcError, SendError, SwapError, SwapResult};
pub use ledger::{BlockhashWithExpiry, CommitmentLevel, LedgerClient, RpcLedgerClient};
pub use sender::{SendOptions, SerializedTransaction, TransactionSender, TransactionSignature};
pub use swap::{SwapApiClient, SwapExecutor, TransactionSigner};
