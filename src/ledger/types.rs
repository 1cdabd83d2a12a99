//! Wire-level types shared by ledger clients

use serde::{Deserialize, Serialize};
use std::fmt;

/// Commitment level reported for a signature.
///
/// Ordered by strength, so `status >= target` means the target is met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentLevel {
    Processed,
    Confirmed,
    Finalized,
}

impl Default for CommitmentLevel {
    fn default() -> Self {
        CommitmentLevel::Confirmed
    }
}

impl fmt::Display for CommitmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommitmentLevel::Processed => "processed",
            CommitmentLevel::Confirmed => "confirmed",
            CommitmentLevel::Finalized => "finalized",
        };
        f.write_str(s)
    }
}

/// Status of a signature as last seen by a node
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    /// `None` once the block is rooted
    pub confirmations: Option<u64>,
    /// Execution error, present when the transaction landed but failed
    pub err: Option<serde_json::Value>,
    pub confirmation_status: Option<CommitmentLevel>,
}

impl SignatureStatus {
    /// Whether the network processed the transaction and rejected it
    pub fn is_failed(&self) -> bool {
        matches!(self.err, Some(ref e) if !e.is_null())
    }

    /// Whether the status has reached at least `target`
    pub fn satisfies(&self, target: CommitmentLevel) -> bool {
        self.confirmation_status.map_or(false, |level| level >= target)
    }
}

/// A recent blockhash and the last block height at which it is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockhashWithExpiry {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// Options passed with every submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitConfig {
    /// Skip the node's preflight simulation
    pub skip_preflight: bool,
    /// Let the client drop a byte-identical resubmission it recently sent
    pub skip_duplicates: bool,
    /// Commitment used for preflight simulation
    pub preflight_commitment: CommitmentLevel,
    /// How often the node itself retries; `None` leaves it to the node
    pub max_retries: Option<usize>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            skip_preflight: true,
            skip_duplicates: false,
            preflight_commitment: CommitmentLevel::Confirmed,
            max_retries: None,
        }
    }
}

impl SubmitConfig {
    /// Config for re-broadcasts: never simulate, never suppress duplicates
    pub fn for_resend(&self) -> Self {
        Self {
            skip_preflight: true,
            skip_duplicates: false,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_commitment_ordering() {
        assert!(CommitmentLevel::Finalized > CommitmentLevel::Confirmed);
        assert!(CommitmentLevel::Confirmed > CommitmentLevel::Processed);
    }

    #[test]
    fn test_signature_status_parsing() {
        let status: SignatureStatus = serde_json::from_value(json!({
            "slot": 72,
            "confirmations": null,
            "err": null,
            "status": { "Ok": null },
            "confirmationStatus": "finalized"
        }))
        .unwrap();

        assert!(!status.is_failed());
        assert!(status.satisfies(CommitmentLevel::Confirmed));
        assert!(status.satisfies(CommitmentLevel::Finalized));
    }

    #[test]
    fn test_failed_status() {
        let status: SignatureStatus = serde_json::from_value(json!({
            "slot": 5,
            "confirmations": 1,
            "err": { "InstructionError": [0, "Custom"] },
            "confirmationStatus": "processed"
        }))
        .unwrap();

        assert!(status.is_failed());
        assert!(!status.satisfies(CommitmentLevel::Confirmed));
    }

    #[test]
    fn test_resend_config_overrides() {
        let first = SubmitConfig {
            skip_preflight: false,
            skip_duplicates: true,
            preflight_commitment: CommitmentLevel::Finalized,
            max_retries: Some(0),
        };
        let resend = first.for_resend();
        assert!(resend.skip_preflight);
        assert!(!resend.skip_duplicates);
        assert_eq!(resend.preflight_commitment, CommitmentLevel::Finalized);
        assert_eq!(resend.max_retries, Some(0));
    }
}
