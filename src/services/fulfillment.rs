//! Secondary backend propagator.
//!
//! Mirrors confirmed payment state into the order-management backend used
//! for fulfillment and inventory. Called only after the primary store has
//! committed; its failures degrade the confirmation result and are never
//! allowed to undo a capture or a local write.

use crate::config::FulfillmentConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentUpdate {
    pub order_id: String,
    pub payment_key: String,
    pub method: Option<String>,
    /// The gateway's raw confirmation payload, passed through untouched.
    pub gateway_payload: JsonValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    /// The backend has no endpoint for this order (404): nothing to sync,
    /// not a failure.
    NothingToSync,
}

#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
    #[error("Fulfillment backend request failed: {message}")]
    Network { message: String },

    #[error("Fulfillment backend rejected the update: HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Fulfillment client misconfigured: {message}")]
    Configuration { message: String },
}

impl FulfillmentError {
    pub fn is_retryable(&self) -> bool {
        match self {
            FulfillmentError::Network { .. } => true,
            FulfillmentError::Rejected { status, .. } => *status >= 500,
            FulfillmentError::Configuration { .. } => false,
        }
    }
}

#[async_trait]
pub trait FulfillmentClient: Send + Sync {
    async fn push_confirmation(
        &self,
        update: &FulfillmentUpdate,
    ) -> Result<SyncOutcome, FulfillmentError>;
}

pub struct RestFulfillmentClient {
    config: FulfillmentConfig,
    client: Client,
}

impl RestFulfillmentClient {
    pub fn new(config: FulfillmentConfig) -> Result<Self, FulfillmentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FulfillmentError::Configuration {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl FulfillmentClient for RestFulfillmentClient {
    async fn push_confirmation(
        &self,
        update: &FulfillmentUpdate,
    ) -> Result<SyncOutcome, FulfillmentError> {
        let url = format!(
            "{}/internal/orders/{}/payment-confirmed",
            self.config.base_url, update.order_id
        );
        let response = self
            .client
            .post(&url)
            .json(update)
            .send()
            .await
            .map_err(|e| FulfillmentError::Network { message: e.to_string() })?;

        let status = response.status();
        if status.is_success() {
            info!(order_id = %update.order_id, "confirmation propagated to fulfillment backend");
            return Ok(SyncOutcome::Synced);
        }
        if status.as_u16() == 404 {
            info!(order_id = %update.order_id, "fulfillment backend has no record, nothing to sync");
            return Ok(SyncOutcome::NothingToSync);
        }

        let message = response.text().await.unwrap_or_default();
        Err(FulfillmentError::Rejected { status: status.as_u16(), message })
    }
}
