//! Confirmation polling with block-height expiry
//!
//! Each tick samples the current block height first, then the signature
//! status. The height check runs on every tick so that expiry is detected
//! even while status queries are failing.

use super::options::SendOptions;
use super::transaction::TransactionSignature;
use crate::error::{RpcError, SendError};
use crate::ledger::{BlockhashWithExpiry, CommitmentLevel, LedgerClient};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Waiter state. `Polling` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaiterState {
    Polling,
    Confirmed,
    Expired,
    NotFound,
}

/// Terminal result of confirmation polling
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationOutcome {
    /// Status reached the target commitment
    Confirmed(TransactionSignature),
    /// Block height passed `last_valid_block_height - buffer`
    Expired {
        block_height: u64,
        last_valid_block_height: u64,
        buffer: u64,
        attempts: u32,
    },
    /// The network processed the transaction and it failed
    TransactionFailed { error: String, attempts: u32 },
    /// Attempts ran out while the status was still unresolved
    NotFoundAfterRetries {
        attempts: u32,
        last_block_height: Option<u64>,
    },
    /// Attempts ran out and no status query ever succeeded
    NetworkError { attempts: u32, source: RpcError },
}

impl ConfirmationOutcome {
    pub fn state(&self) -> WaiterState {
        match self {
            ConfirmationOutcome::Confirmed(_) => WaiterState::Confirmed,
            ConfirmationOutcome::Expired { .. } => WaiterState::Expired,
            ConfirmationOutcome::TransactionFailed { .. }
            | ConfirmationOutcome::NotFoundAfterRetries { .. }
            | ConfirmationOutcome::NetworkError { .. } => WaiterState::NotFound,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmationOutcome::Confirmed(_))
    }

    /// Map onto the caller-facing result
    pub fn into_result(
        self,
        signature: &TransactionSignature,
    ) -> Result<TransactionSignature, SendError> {
        match self {
            ConfirmationOutcome::Confirmed(confirmed) => Ok(confirmed),
            ConfirmationOutcome::Expired {
                block_height,
                last_valid_block_height,
                buffer,
                attempts,
            } => Err(SendError::Expired {
                block_height,
                last_valid_block_height,
                buffer,
                attempts,
            }),
            ConfirmationOutcome::TransactionFailed { error, .. } => {
                Err(SendError::TransactionFailed {
                    signature: signature.to_string(),
                    error,
                })
            }
            ConfirmationOutcome::NotFoundAfterRetries {
                attempts,
                last_block_height,
            } => Err(SendError::NotConfirmed {
                signature: signature.to_string(),
                attempts,
                last_block_height,
            }),
            ConfirmationOutcome::NetworkError { attempts, source } => {
                Err(SendError::NetworkError {
                    signature: signature.to_string(),
                    attempts,
                    source,
                })
            }
        }
    }
}

/// Bookkeeping carried across ticks
#[derive(Debug, Default)]
struct Progress {
    last_block_height: Option<u64>,
    last_error: Option<RpcError>,
    status_seen: bool,
}

/// Polls a signature until it confirms, fails, expires, or attempts run out
pub struct ConfirmationWaiter {
    ledger: Arc<dyn LedgerClient>,
    signature: TransactionSignature,
    last_valid_block_height: u64,
    buffer: u64,
    max_attempts: u32,
    poll_interval: Duration,
    rpc_retry_delay: Duration,
    commitment: CommitmentLevel,
}

impl ConfirmationWaiter {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        signature: TransactionSignature,
        expiry: &BlockhashWithExpiry,
        options: &SendOptions,
    ) -> Self {
        Self {
            ledger,
            signature,
            last_valid_block_height: expiry.last_valid_block_height,
            buffer: options.block_height_expiry_buffer,
            max_attempts: options.max_confirmation_attempts.max(1),
            poll_interval: options.confirmation_poll_interval,
            rpc_retry_delay: options.rpc_retry_delay,
            commitment: options.commitment,
        }
    }

    /// Height after which the transaction is treated as expired.
    ///
    /// The buffer only ever shrinks the window.
    pub fn expiry_height(&self) -> u64 {
        self.last_valid_block_height.saturating_sub(self.buffer)
    }

    fn is_expired(&self, block_height: u64) -> bool {
        block_height > self.expiry_height()
    }

    /// Poll until a terminal outcome. Makes at most `max_attempts` ticks.
    pub async fn wait(&self) -> ConfirmationOutcome {
        let mut progress = Progress::default();

        for attempt in 1..=self.max_attempts {
            let mut rpc_failed = false;

            if let Some(outcome) = self.tick(attempt, &mut progress, &mut rpc_failed).await {
                return outcome;
            }

            if attempt < self.max_attempts {
                let delay = if rpc_failed {
                    self.rpc_retry_delay
                } else {
                    self.poll_interval
                };
                sleep(delay).await;
            }
        }

        let attempts = self.max_attempts;
        match progress.last_error {
            Some(source) if !progress.status_seen => {
                warn!(
                    "No status for {} after {} attempts, every query failed: {}",
                    self.signature, attempts, source
                );
                ConfirmationOutcome::NetworkError { attempts, source }
            }
            _ => {
                warn!(
                    "Transaction {} not confirmed after {} attempts (last height {:?}, expiry height {})",
                    self.signature,
                    attempts,
                    progress.last_block_height,
                    self.expiry_height()
                );
                ConfirmationOutcome::NotFoundAfterRetries {
                    attempts,
                    last_block_height: progress.last_block_height,
                }
            }
        }
    }

    async fn tick(
        &self,
        attempt: u32,
        progress: &mut Progress,
        rpc_failed: &mut bool,
    ) -> Option<ConfirmationOutcome> {
        crate::metrics::record_confirmation_poll();

        // Expiry first, on a height sampled during this tick.
        match self.ledger.get_block_height().await {
            Ok(block_height) => {
                progress.last_block_height = Some(block_height);
                crate::metrics::record_block_height(block_height);

                if self.is_expired(block_height) {
                    info!(
                        "Transaction {} expired: height {} > {} (last valid {}, buffer {})",
                        self.signature,
                        block_height,
                        self.expiry_height(),
                        self.last_valid_block_height,
                        self.buffer
                    );
                    return Some(ConfirmationOutcome::Expired {
                        block_height,
                        last_valid_block_height: self.last_valid_block_height,
                        buffer: self.buffer,
                        attempts: attempt,
                    });
                }
            }
            Err(e) => {
                // No fresh height this tick; expiry is re-evaluated next tick.
                warn!(
                    "Block height query failed for {} (attempt {}/{}): {}",
                    self.signature, attempt, self.max_attempts, e
                );
                progress.last_error = Some(e);
                *rpc_failed = true;
            }
        }

        match self.ledger.get_signature_status(self.signature.as_str()).await {
            Ok(Some(status)) => {
                progress.status_seen = true;

                if status.is_failed() {
                    let error = status
                        .err
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    warn!("Transaction {} failed on-chain: {}", self.signature, error);
                    return Some(ConfirmationOutcome::TransactionFailed {
                        error,
                        attempts: attempt,
                    });
                }

                if status.satisfies(self.commitment) {
                    info!(
                        "Transaction {} reached {} at slot {} (attempt {})",
                        self.signature,
                        status
                            .confirmation_status
                            .map(|c| c.to_string())
                            .unwrap_or_default(),
                        status.slot,
                        attempt
                    );
                    return Some(ConfirmationOutcome::Confirmed(self.signature.clone()));
                }

                debug!(
                    "Transaction {} at {:?}, waiting for {} (attempt {}/{})",
                    self.signature,
                    status.confirmation_status,
                    self.commitment,
                    attempt,
                    self.max_attempts
                );
            }
            Ok(None) => {
                progress.status_seen = true;
                debug!(
                    "Transaction {} not yet seen (attempt {}/{})",
                    self.signature, attempt, self.max_attempts
                );
            }
            Err(e) => {
                warn!(
                    "Status query failed for {} (attempt {}/{}): {}",
                    self.signature, attempt, self.max_attempts, e
                );
                progress.last_error = Some(e);
                *rpc_failed = true;
            }
        }

        None
    }
}
