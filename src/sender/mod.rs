//! Transaction sender - broadcast and confirmation for signed transactions
//!
//! A send submits the transaction once, then runs two loops side by side:
//! - the broadcaster, re-submitting the same bytes on a fixed cadence
//! - the confirmation waiter, polling status against the block-height expiry
//!
//! The waiter decides the outcome. The broadcaster is cancelled and joined
//! before `send` returns, so no submission happens after the call completes.

mod broadcaster;
mod confirmation;
mod options;
mod transaction;

pub use broadcaster::{BroadcastReport, Broadcaster};
pub use confirmation::{ConfirmationOutcome, ConfirmationWaiter, WaiterState};
pub use options::SendOptions;
pub use transaction::{SerializedTransaction, TransactionSignature};

use crate::error::SendError;
use crate::ledger::{BlockhashWithExpiry, LedgerClient};

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Sends signed transactions and waits for them to land
#[derive(Clone)]
pub struct TransactionSender {
    ledger: Arc<dyn LedgerClient>,
}

impl TransactionSender {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// The ledger client used for every call
    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    /// Submit `transaction` and wait until it confirms, fails, or expires.
    ///
    /// `expiry` must be the blockhash metadata fetched right before signing.
    /// Only a failure of the first submission is returned immediately; later
    /// resend failures are logged and ignored.
    pub async fn send(
        &self,
        transaction: SerializedTransaction,
        signature: TransactionSignature,
        expiry: BlockhashWithExpiry,
        options: &SendOptions,
    ) -> Result<TransactionSignature, SendError> {
        let send_id = Uuid::new_v4();
        let started = Instant::now();

        info!(
            "[{}] Sending transaction {} ({} bytes, blockhash {}, last valid height {})",
            send_id,
            signature,
            transaction.len(),
            expiry.blockhash,
            expiry.last_valid_block_height
        );

        match self
            .ledger
            .submit_transaction(transaction.as_bytes(), &options.submit)
            .await
        {
            Ok(submitted) => {
                crate::metrics::record_tx_submitted();
                if submitted != signature.as_str() {
                    warn!(
                        "[{}] Node returned signature {} for transaction {}",
                        send_id, submitted, signature
                    );
                }
            }
            Err(e) => {
                error!("[{}] Failed to submit transaction {}: {}", send_id, signature, e);
                crate::metrics::record_tx_submit_failed();
                let err = SendError::SubmissionFailed(e);
                crate::metrics::record_outcome(err.kind());
                return Err(err);
            }
        }

        if options.skip_confirmation_check {
            info!(
                "[{}] Transaction {} submitted, confirmation check skipped",
                send_id, signature
            );
            crate::metrics::record_outcome("unconfirmed");
            return Ok(signature);
        }

        let (outcome, report) = self
            .broadcast_until_confirmed(transaction, &signature, &expiry, options)
            .await;

        let elapsed = started.elapsed();
        crate::metrics::record_send_latency(elapsed.as_secs_f64());

        let result = outcome.into_result(&signature);
        match &result {
            Ok(confirmed) => {
                info!(
                    "[{}] Transaction {} confirmed in {:?} ({} resends)",
                    send_id, confirmed, elapsed, report.resends
                );
                crate::metrics::record_outcome("confirmed");
            }
            Err(e) => {
                warn!(
                    "[{}] Transaction {} not landed after {:?} ({} resends, {} failed): {}",
                    send_id, signature, elapsed, report.resends, report.failures, e
                );
                crate::metrics::record_outcome(e.kind());
            }
        }

        result
    }

    /// Race the broadcaster against the waiter; the waiter's outcome wins.
    async fn broadcast_until_confirmed(
        &self,
        transaction: SerializedTransaction,
        signature: &TransactionSignature,
        expiry: &BlockhashWithExpiry,
        options: &SendOptions,
    ) -> (ConfirmationOutcome, BroadcastReport) {
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let broadcaster = Broadcaster::new(
            self.ledger.clone(),
            transaction,
            signature.clone(),
            options.resend_interval,
            &options.submit,
        );
        let mut broadcast = tokio::spawn(broadcaster.run(cancel_rx));

        let waiter =
            ConfirmationWaiter::new(self.ledger.clone(), signature.clone(), expiry, options);
        let waiting = waiter.wait();
        tokio::pin!(waiting);

        let mut early_report = None;
        let outcome = loop {
            tokio::select! {
                outcome = &mut waiting => break outcome,
                joined = &mut broadcast, if early_report.is_none() => {
                    // Only a panic ends the broadcaster without a signal.
                    error!("Broadcaster for {} stopped before confirmation", signature);
                    early_report = Some(joined.unwrap_or_default());
                }
            }
        };

        // Level-triggered: stays raised even if the receiver has not polled yet.
        let _ = cancel_tx.send(true);

        let report = match early_report {
            Some(report) => report,
            None => match broadcast.await {
                Ok(report) => report,
                Err(e) => {
                    error!("Broadcaster for {} panicked: {}", signature, e);
                    BroadcastReport::default()
                }
            },
        };

        debug!(
            "Broadcaster for {} joined: {} resends, {} failed",
            signature, report.resends, report.failures
        );

        (outcome, report)
    }
}
