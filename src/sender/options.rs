//! Options controlling a single send

use crate::config::SenderConfig;
use crate::ledger::{CommitmentLevel, SubmitConfig};

use std::time::Duration;

/// Shortest pause the broadcaster takes between resends
pub const MIN_RESEND_INTERVAL: Duration = Duration::from_millis(1);

/// Per-call send configuration. Read-only once handed to the sender.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOptions {
    /// Upper bound on confirmation ticks
    pub max_confirmation_attempts: u32,
    /// Delay between confirmation ticks
    pub confirmation_poll_interval: Duration,
    /// Delay between re-broadcasts
    pub resend_interval: Duration,
    /// Blocks subtracted from the last valid block height before comparing
    pub block_height_expiry_buffer: u64,
    /// Delay after a tick whose RPC queries failed
    pub rpc_retry_delay: Duration,
    /// Return right after the first accepted submission.
    ///
    /// The returned signature may never land; callers opting in accept that.
    pub skip_confirmation_check: bool,
    /// Commitment a status must reach to count as confirmed
    pub commitment: CommitmentLevel,
    /// Options for the first submission. Resends always use
    /// [`SubmitConfig::for_resend`].
    pub submit: SubmitConfig,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            max_confirmation_attempts: 30,
            confirmation_poll_interval: Duration::from_millis(1_000),
            resend_interval: Duration::from_millis(1_000),
            block_height_expiry_buffer: 150,
            rpc_retry_delay: Duration::from_millis(1_000),
            skip_confirmation_check: false,
            commitment: CommitmentLevel::Confirmed,
            submit: SubmitConfig::default(),
        }
    }
}

impl SendOptions {
    /// At least one confirmation tick always runs
    pub fn with_max_confirmation_attempts(mut self, attempts: u32) -> Self {
        self.max_confirmation_attempts = attempts.max(1);
        self
    }

    pub fn with_confirmation_poll_interval(mut self, interval: Duration) -> Self {
        self.confirmation_poll_interval = interval;
        self
    }

    /// Clamped to [`MIN_RESEND_INTERVAL`]
    pub fn with_resend_interval(mut self, interval: Duration) -> Self {
        self.resend_interval = interval.max(MIN_RESEND_INTERVAL);
        self
    }

    pub fn with_block_height_expiry_buffer(mut self, buffer: u64) -> Self {
        self.block_height_expiry_buffer = buffer;
        self
    }

    pub fn with_rpc_retry_delay(mut self, delay: Duration) -> Self {
        self.rpc_retry_delay = delay;
        self
    }

    pub fn with_skip_confirmation_check(mut self, skip: bool) -> Self {
        self.skip_confirmation_check = skip;
        self
    }

    pub fn with_commitment(mut self, commitment: CommitmentLevel) -> Self {
        self.commitment = commitment;
        self
    }

    pub fn with_submit_config(mut self, submit: SubmitConfig) -> Self {
        self.submit = submit;
        self
    }

    /// Worst-case time spent confirming, excluding RPC latency
    pub fn confirmation_budget(&self) -> Duration {
        self.confirmation_poll_interval
            .max(self.rpc_retry_delay)
            .saturating_mul(self.max_confirmation_attempts.saturating_sub(1))
    }
}

impl From<&SenderConfig> for SendOptions {
    fn from(config: &SenderConfig) -> Self {
        Self {
            max_confirmation_attempts: config.max_confirmation_attempts,
            confirmation_poll_interval: Duration::from_millis(config.confirmation_poll_interval_ms),
            resend_interval: Duration::from_millis(config.resend_interval_ms),
            block_height_expiry_buffer: config.block_height_expiry_buffer,
            rpc_retry_delay: Duration::from_millis(config.rpc_retry_delay_ms),
            skip_confirmation_check: config.skip_confirmation_check,
            commitment: config.commitment,
            submit: SubmitConfig {
                skip_preflight: config.skip_preflight,
                skip_duplicates: false,
                preflight_commitment: config.commitment,
                max_retries: config.max_retries,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SendOptions::default();
        assert_eq!(options.max_confirmation_attempts, 30);
        assert_eq!(options.confirmation_poll_interval, Duration::from_secs(1));
        assert_eq!(options.resend_interval, Duration::from_secs(1));
        assert_eq!(options.block_height_expiry_buffer, 150);
        assert!(!options.skip_confirmation_check);
        assert!(options.submit.skip_preflight);
    }

    #[test]
    fn test_from_config_matches_defaults() {
        assert_eq!(SendOptions::from(&SenderConfig::default()), SendOptions::default());
    }

    #[test]
    fn test_builders_clamp_degenerate_values() {
        let options = SendOptions::default()
            .with_max_confirmation_attempts(0)
            .with_resend_interval(Duration::ZERO);
        assert_eq!(options.max_confirmation_attempts, 1);
        assert_eq!(options.resend_interval, MIN_RESEND_INTERVAL);
    }

    #[test]
    fn test_confirmation_budget() {
        let options = SendOptions::default()
            .with_max_confirmation_attempts(3)
            .with_confirmation_poll_interval(Duration::from_millis(10))
            .with_rpc_retry_delay(Duration::from_millis(5));
        assert_eq!(options.confirmation_budget(), Duration::from_millis(20));
    }
}
