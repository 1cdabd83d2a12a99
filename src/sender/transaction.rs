//! Immutable transaction payload and signature handles

use crate::error::SwapResult;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A fully signed, serialized transaction.
///
/// Cloning shares the same bytes; the payload is never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct SerializedTransaction(Arc<[u8]>);

impl SerializedTransaction {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    /// Decode a base64 payload as returned by swap APIs and wallets
    pub fn from_base64(encoded: &str) -> SwapResult<Self> {
        let bytes = BASE64_STANDARD.decode(encoded.trim())?;
        Ok(Self::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for SerializedTransaction {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for SerializedTransaction {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for SerializedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializedTransaction")
            .field("len", &self.0.len())
            .finish()
    }
}

/// The transaction's first signature, which identifies it on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionSignature(String);

impl TransactionSignature {
    pub fn new(signature: impl Into<String>) -> Self {
        Self(signature.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TransactionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TransactionSignature {
    fn from(signature: String) -> Self {
        Self(signature)
    }
}

impl From<&str> for TransactionSignature {
    fn from(signature: &str) -> Self {
        Self(signature.to_string())
    }
}
