//! Fixed-cadence re-broadcast of an already submitted transaction
//!
//! Resends keep the transaction visible to leaders even when individual
//! nodes drop it. The loop does not look at confirmation state; only the
//! cancellation signal stops it.

use super::options::MIN_RESEND_INTERVAL;
use super::transaction::{SerializedTransaction, TransactionSignature};
use crate::ledger::{LedgerClient, SubmitConfig};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};

/// What the broadcaster did before it was stopped
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Resends accepted by a node
    pub resends: u32,
    /// Resends rejected or lost in transit
    pub failures: u32,
}

/// Re-submits the same bytes every `interval` until cancelled
pub struct Broadcaster {
    ledger: Arc<dyn LedgerClient>,
    transaction: SerializedTransaction,
    signature: TransactionSignature,
    interval: Duration,
    submit: SubmitConfig,
}

impl Broadcaster {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        transaction: SerializedTransaction,
        signature: TransactionSignature,
        interval: Duration,
        submit: &SubmitConfig,
    ) -> Self {
        Self {
            ledger,
            transaction,
            signature,
            interval: interval.max(MIN_RESEND_INTERVAL),
            submit: submit.for_resend(),
        }
    }

    /// Resend until `cancel` is raised or its sender is dropped.
    ///
    /// The signal is checked before every submission; an in-flight request
    /// is allowed to finish.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        loop {
            if *cancel.borrow() {
                break;
            }

            let signalled = tokio::select! {
                _ = sleep(self.interval) => None,
                changed = cancel.changed() => Some(changed.is_ok()),
            };

            match signalled {
                None => {}
                // Sender gone: nobody is waiting on this transaction any more.
                Some(false) => break,
                Some(true) => continue,
            }

            if *cancel.borrow() {
                break;
            }

            match self
                .ledger
                .submit_transaction(self.transaction.as_bytes(), &self.submit)
                .await
            {
                Ok(signature) => {
                    report.resends += 1;
                    crate::metrics::record_resend();
                    if signature != self.signature.as_str() {
                        warn!(
                            "Resend of {} returned unexpected signature {}",
                            self.signature, signature
                        );
                    } else {
                        debug!("Resent transaction {} ({})", self.signature, report.resends);
                    }
                }
                Err(e) => {
                    report.failures += 1;
                    crate::metrics::record_resend_failure();
                    warn!("Failed to resend transaction {}: {}", self.signature, e);
                }
            }
        }

        debug!(
            "Broadcaster for {} stopped after {} resends ({} failed)",
            self.signature, report.resends, report.failures
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use crate::ledger::MockLedgerClient;

    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::timeout;

    fn broadcaster(ledger: MockLedgerClient, interval_ms: u64) -> Broadcaster {
        Broadcaster::new(
            Arc::new(ledger),
            SerializedTransaction::new(vec![1, 2, 3]),
            TransactionSignature::new("sig"),
            Duration::from_millis(interval_ms),
            &SubmitConfig {
                skip_preflight: false,
                skip_duplicates: true,
                ..SubmitConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_resends_until_cancelled() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_submit_transaction()
            .withf(|tx, config| {
                tx == [1, 2, 3] && config.skip_preflight && !config.skip_duplicates
            })
            .returning(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("sig".to_string())
            });

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(broadcaster(ledger, 10).run(cancel_rx));

        tokio::time::sleep(Duration::from_millis(55)).await;
        cancel_tx.send(true).unwrap();

        let report = timeout(Duration::from_millis(100), handle)
            .await
            .expect("broadcaster did not stop within one tick")
            .unwrap();

        assert!(report.resends >= 2, "only {} resends", report.resends);
        assert_eq!(report.failures, 0);
        assert_eq!(report.resends, calls.load(Ordering::SeqCst));

        let after_stop = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_loop() {
        let mut ledger = MockLedgerClient::new();
        ledger.expect_submit_transaction().returning(|_, _| {
            Err(RpcError::Rpc {
                code: -32002,
                message: "This transaction has already been processed".to_string(),
            })
        });

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(broadcaster(ledger, 5).run(cancel_rx));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!handle.is_finished());

        cancel_tx.send(true).unwrap();
        let report = handle.await.unwrap();
        assert_eq!(report.resends, 0);
        assert!(report.failures >= 2);
    }

    #[tokio::test]
    async fn test_no_resend_before_first_interval() {
        let mut ledger = MockLedgerClient::new();
        ledger.expect_submit_transaction().times(0);

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(broadcaster(ledger, 1_000).run(cancel_rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_tx.send(true).unwrap();

        let report = timeout(Duration::from_millis(100), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn test_zero_interval_is_paced() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let mut ledger = MockLedgerClient::new();
        ledger.expect_submit_transaction().returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("sig".to_string())
        });

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(broadcaster(ledger, 0).run(cancel_rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_tx.send(true).unwrap();
        handle.await.unwrap();

        // One resend per millisecond at most, plus timer slack.
        assert!(calls.load(Ordering::SeqCst) <= 40);
    }

    #[tokio::test]
    async fn test_dropped_sender_stops_loop() {
        let mut ledger = MockLedgerClient::new();
        ledger.expect_submit_transaction().times(0);

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(broadcaster(ledger, 1_000).run(cancel_rx));
        drop(cancel_tx);

        let report = timeout(Duration::from_millis(100), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.resends, 0);
    }
}
