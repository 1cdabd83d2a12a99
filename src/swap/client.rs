//! HTTP client for the swap quote API

use super::types::{RateQuote, SwapRequest, SwapResponse};
use crate::config::SwapApiConfig;
use crate::error::{SwapError, SwapResult};

use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

/// Client for the `/rate` and `/swap` endpoints
#[derive(Debug, Clone)]
pub struct SwapApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl SwapApiClient {
    pub fn new(config: &SwapApiConfig) -> SwapResult<Self> {
        reqwest::Url::parse(&config.base_url).map_err(|e| {
            SwapError::Config(format!("Invalid swap API URL '{}': {}", config.base_url, e))
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Quote a swap of `amount` from one mint to another
    pub async fn get_rate(
        &self,
        from: &str,
        to: &str,
        amount: f64,
        slippage: f64,
    ) -> SwapResult<RateQuote> {
        let query = [
            ("from", from.to_string()),
            ("to", to.to_string()),
            ("amount", amount.to_string()),
            ("slippage", slippage.to_string()),
        ];

        self.get("rate", &query).await.map_err(|e| {
            error!("Error fetching rate: {}", e);
            e
        })
    }

    /// Build an unsigned swap transaction for `request.payer`
    pub async fn get_swap_instructions(&self, request: &SwapRequest) -> SwapResult<SwapResponse> {
        let mut swap: SwapResponse = self.get("swap", &request.query()).await.map_err(|e| {
            error!("Error fetching swap instructions: {}", e);
            e
        })?;

        swap.force_legacy = request.force_legacy;
        Ok(swap)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> SwapResult<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self.http.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SwapError::SwapApi(format!("{} returned {}: {}", path, status, body)));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn spawn_api() -> String {
        let app = Router::new()
            .route(
                "/rate",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    let amount: f64 = params["amount"].parse().unwrap_or_default();
                    Json(json!({
                        "amountIn": amount,
                        "amountOut": amount * 150.0,
                        "minAmountOut": amount * 148.5,
                        "currentPrice": 150.0,
                        "executionPrice": 150.0,
                        "priceImpact": 0.0,
                        "fee": 0.000005,
                        "slippage": params["slippage"],
                    }))
                }),
            )
            .route(
                "/swap",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    if params.get("payer").map(String::as_str) != Some("Payer111") {
                        return Err((StatusCode::BAD_REQUEST, "missing payer"));
                    }
                    Ok(Json(json!({
                        "txn": "AQIDBA==",
                        "isJupiter": true,
                        "type": "v0",
                        "echo": Value::from(params.get("priorityFee").cloned()),
                    })))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn client(base_url: String) -> SwapApiClient {
        SwapApiClient::new(&SwapApiConfig {
            base_url,
            timeout_ms: 2_000,
        })
        .unwrap()
    }

    fn request(payer: &str) -> SwapRequest {
        SwapRequest {
            from: "So11111111111111111111111111111111111111112".to_string(),
            to: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
            from_amount: "0.5".to_string(),
            slippage: 15.0,
            payer: payer.to_string(),
            priority_fee: Some(0.0001),
            force_legacy: true,
        }
    }

    #[tokio::test]
    async fn test_get_rate() {
        let api = client(spawn_api().await);
        let quote = api.get_rate("A", "B", 2.0, 10.0).await.unwrap();
        assert_eq!(quote.amount_out, 300.0);
        assert_eq!(quote.extra.get("slippage"), Some(&json!("10")));
    }

    #[tokio::test]
    async fn test_swap_sets_force_legacy() {
        let api = client(spawn_api().await);
        let swap = api.get_swap_instructions(&request("Payer111")).await.unwrap();

        assert_eq!(swap.txn, "AQIDBA==");
        assert!(swap.is_jupiter);
        assert!(swap.force_legacy);
        assert_eq!(swap.extra.get("echo"), Some(&json!("0.0001")));
    }

    #[tokio::test]
    async fn test_error_status_surfaces() {
        let api = client(spawn_api().await);
        let err = api
            .get_swap_instructions(&request("someone-else"))
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::SwapApi(ref msg) if msg.contains("400")));
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let result = SwapApiClient::new(&SwapApiConfig {
            base_url: "::not a url".to_string(),
            timeout_ms: 1_000,
        });
        assert!(matches!(result, Err(SwapError::Config(_))));
    }
}
