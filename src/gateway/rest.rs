//! REST implementation of the gateway client.
//!
//! Transport failures and 5xx responses are retried with exponential backoff
//! up to the configured cap; 4xx responses are business rejections and are
//! surfaced immediately without retry. The server-side secret is injected via
//! `GatewayConfig` at construction time and sent as HTTP Basic auth.

use crate::config::GatewayConfig;
use crate::gateway::client::GatewayClient;
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::types::{
    GatewayCancellation, GatewayConfirmRequest, GatewayConfirmation, GatewayEnvironment,
};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug)]
pub struct RestGatewayClient {
    config: GatewayConfig,
    client: Client,
    auth_header: String,
}

impl RestGatewayClient {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        if config.secret_key.trim().is_empty() {
            return Err(GatewayError::Configuration {
                message: "gateway secret key is empty".to_string(),
            });
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Configuration {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;
        let auth_header = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(format!("{}:", config.secret_key))
        );
        Ok(Self { config, client, auth_header })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn post_json(&self, url: &str, body: &JsonValue) -> GatewayResult<JsonValue> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(url)
                .header("Authorization", &self.auth_header)
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    if status.is_success() {
                        return serde_json::from_str(&text).map_err(|e| {
                            GatewayError::InvalidResponse {
                                message: format!("invalid gateway JSON response: {}", e),
                            }
                        });
                    }

                    if status.as_u16() == 429 {
                        if attempt < self.config.max_retries {
                            tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(GatewayError::RateLimited { retry_after_seconds: None });
                    }

                    if status.is_client_error() {
                        // Business rejection. The gateway reports a stable
                        // code plus a human message.
                        let parsed: JsonValue = serde_json::from_str(&text).unwrap_or_default();
                        let code = parsed
                            .get("code")
                            .and_then(|v| v.as_str())
                            .unwrap_or("UNKNOWN")
                            .to_string();
                        let message = parsed
                            .get("message")
                            .and_then(|v| v.as_str())
                            .unwrap_or(&text)
                            .to_string();
                        return Err(GatewayError::Rejected { code, message });
                    }

                    if attempt < self.config.max_retries {
                        warn!(
                            status = %status,
                            attempt = attempt + 1,
                            "gateway server error, retrying"
                        );
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(GatewayError::Network {
                        message: format!("HTTP {}: {}", status, text),
                    });
                }
                Err(e) => {
                    if attempt < self.config.max_retries {
                        warn!(error = %e, attempt = attempt + 1, "gateway request failed, retrying");
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(GatewayError::Network {
                        message: format!("gateway request failed: {}", e),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl GatewayClient for RestGatewayClient {
    async fn confirm(&self, request: &GatewayConfirmRequest) -> GatewayResult<GatewayConfirmation> {
        let body = serde_json::json!({
            "paymentKey": request.payment_key,
            "orderId": request.order_id,
            "amount": request.amount,
        });
        let raw = self.post_json(&self.endpoint("/v1/payments/confirm"), &body).await?;

        let method = raw.get("method").and_then(|v| v.as_str()).map(|v| v.to_string());
        info!(
            order_id = %request.order_id,
            method = method.as_deref().unwrap_or("unknown"),
            "gateway capture confirmed"
        );
        Ok(GatewayConfirmation { payment_key: request.payment_key.clone(), method, raw })
    }

    async fn cancel(
        &self,
        payment_key: &str,
        amount: i64,
        reason: &str,
    ) -> GatewayResult<GatewayCancellation> {
        let body = serde_json::json!({
            "cancelAmount": amount,
            "cancelReason": reason,
        });
        let url = self.endpoint(&format!("/v1/payments/{}/cancel", payment_key));
        let raw = self.post_json(&url, &body).await?;
        info!(amount, "gateway reversal confirmed");
        Ok(GatewayCancellation { payment_key: payment_key.to_string(), raw })
    }

    fn environment(&self) -> GatewayEnvironment {
        self.config.environment
    }
}
