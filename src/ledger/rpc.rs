//! JSON-RPC ledger client with multi-endpoint support and automatic failover

use super::types::{BlockhashWithExpiry, SignatureStatus, SubmitConfig};
use super::LedgerClient;
use crate::config::RpcConfig;
use crate::error::RpcError;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sha3::{Digest, Sha3_256};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// `{ context, value }` wrapper used by most ledger reads
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

/// A previously accepted submission, kept for duplicate suppression
struct RecentSubmission {
    signature: String,
    submitted_at: Instant,
}

/// Ledger client over HTTP JSON-RPC with automatic failover
pub struct RpcLedgerClient {
    /// RPC configuration
    config: RpcConfig,
    /// Shared HTTP client (connection pooling, per-request timeout)
    http: reqwest::Client,
    /// Current active endpoint index
    current_endpoint: AtomicUsize,
    /// JSON-RPC request id counter
    request_id: AtomicU64,
    /// Accepted submissions keyed by SHA3-256 of the payload
    recent_submissions: DashMap<[u8; 32], RecentSubmission>,
}

impl RpcLedgerClient {
    /// Create a new ledger client
    pub fn new(config: RpcConfig) -> Result<Self, RpcError> {
        if config.urls.is_empty() {
            return Err(RpcError::Transport("No RPC endpoints configured".to_string()));
        }

        for url in &config.urls {
            reqwest::Url::parse(url)
                .map_err(|e| RpcError::Transport(format!("Invalid RPC URL '{}': {}", url, e)))?;
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        debug!("Ledger client configured with {} endpoint(s)", config.urls.len());

        Ok(Self {
            config,
            http,
            current_endpoint: AtomicUsize::new(0),
            request_id: AtomicU64::new(1),
            recent_submissions: DashMap::new(),
        })
    }

    /// Get the active endpoint URL
    pub fn endpoint(&self) -> &str {
        let idx = self.current_endpoint.load(Ordering::Acquire);
        &self.config.urls[idx % self.config.urls.len()]
    }

    /// Switch to next available endpoint
    pub fn failover(&self) {
        self.advance_from(self.current_endpoint.load(Ordering::Acquire));
    }

    /// Move the active index past `failed`, unless another call already moved it
    fn advance_from(&self, failed: usize) {
        let next = (failed + 1) % self.config.urls.len();
        if self
            .current_endpoint
            .compare_exchange(failed, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            warn!("Ledger RPC failover to endpoint {}", next);
            crate::metrics::record_rpc_failover();
        }
    }

    /// Health check
    pub async fn health_check(&self) -> bool {
        match self.get_block_height().await {
            Ok(height) => {
                crate::metrics::record_block_height(height);
                true
            }
            Err(e) => {
                error!("Ledger health check failed: {}", e);
                false
            }
        }
    }

    /// Issue a JSON-RPC call, failing over on transport errors.
    ///
    /// An error object returned by a node is final: the node answered.
    /// Each call walks every endpoint once from the active one, even when
    /// concurrent calls move the shared index.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let len = self.config.urls.len();
        let start = self.current_endpoint.load(Ordering::Acquire) % len;

        for offset in 0..len {
            let idx = (start + offset) % len;
            let url = &self.config.urls[idx];
            match self.call_endpoint(url, method, &params).await {
                Ok(result) => return Ok(result),
                Err(e @ RpcError::Rpc { .. }) => return Err(e),
                Err(e) => {
                    warn!("{} failed on {}: {}", method, url, e);
                    self.advance_from(idx);
                }
            }
        }

        Err(RpcError::AllEndpointsFailed {
            method: method.to_string(),
        })
    }

    async fn call_endpoint<T: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        params: &Value,
    ) -> Result<T, RpcError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(method, e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(RpcError::Rpc {
                code: 429,
                message: "Too many requests".to_string(),
            });
        }
        if !status.is_success() {
            return Err(RpcError::Transport(format!("HTTP {} from {}", status, url)));
        }

        let envelope: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(format!("{}: {}", method, e)))?;

        if let Some(err) = envelope.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| RpcError::InvalidResponse(format!("{}: missing result", method)))
    }

    fn duplicate_of(&self, key: &[u8; 32]) -> Option<String> {
        let window = Duration::from_millis(self.config.duplicate_window_ms);
        self.recent_submissions
            .get(key)
            .filter(|entry| entry.submitted_at.elapsed() < window)
            .map(|entry| entry.signature.clone())
    }

    fn remember_submission(&self, key: [u8; 32], signature: &str) {
        let window = Duration::from_millis(self.config.duplicate_window_ms);
        self.recent_submissions
            .retain(|_, entry| entry.submitted_at.elapsed() < window);
        self.recent_submissions.insert(
            key,
            RecentSubmission {
                signature: signature.to_string(),
                submitted_at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn submit_transaction(
        &self,
        transaction: &[u8],
        config: &SubmitConfig,
    ) -> Result<String, RpcError> {
        let mut key = [0u8; 32];
        key.copy_from_slice(&Sha3_256::digest(transaction));

        if config.skip_duplicates {
            if let Some(signature) = self.duplicate_of(&key) {
                debug!(
                    "Suppressing duplicate submission {} ({})",
                    hex::encode(&key[..8]),
                    signature
                );
                return Ok(signature);
            }
        }

        let mut options = json!({
            "encoding": "base64",
            "skipPreflight": config.skip_preflight,
            "preflightCommitment": config.preflight_commitment,
        });
        if let Some(max_retries) = config.max_retries {
            options["maxRetries"] = json!(max_retries);
        }

        let encoded = BASE64_STANDARD.encode(transaction);
        let signature: String = self
            .call("sendTransaction", json!([encoded, options]))
            .await?;

        self.remember_submission(key, &signature);
        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let statuses: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": false }]),
            )
            .await?;

        Ok(statuses.value.into_iter().next().flatten())
    }

    async fn get_latest_blockhash(&self) -> Result<BlockhashWithExpiry, RpcError> {
        let latest: WithContext<BlockhashWithExpiry> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.config.commitment }]),
            )
            .await?;

        Ok(latest.value)
    }

    async fn get_block_height(&self) -> Result<u64, RpcError> {
        self.call(
            "getBlockHeight",
            json!([{ "commitment": self.config.commitment }]),
        )
        .await
    }
}

impl std::fmt::Debug for RpcLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedgerClient")
            .field("endpoint", &self.endpoint())
            .field("endpoints", &self.config.urls.len())
            .field("timeout_ms", &self.config.timeout_ms)
            .finish()
    }
}

fn map_transport_error(method: &str, e: reqwest::Error) -> RpcError {
    if e.is_timeout() {
        RpcError::Timeout {
            method: method.to_string(),
        }
    } else {
        RpcError::Transport(e.to_string())
    }
}
