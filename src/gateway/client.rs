use crate::gateway::error::GatewayResult;
use crate::gateway::types::{
    GatewayCancellation, GatewayConfirmRequest, GatewayConfirmation, GatewayEnvironment,
};
use async_trait::async_trait;

/// Thin client over the external money-movement gateway, the authoritative
/// record of capture and reversal. Implementations hold no state beyond
/// connection plumbing.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Capture the charge for `{payment_key, order_id, amount}`.
    async fn confirm(&self, request: &GatewayConfirmRequest) -> GatewayResult<GatewayConfirmation>;

    /// Reverse a captured charge for the full amount.
    async fn cancel(
        &self,
        payment_key: &str,
        amount: i64,
        reason: &str,
    ) -> GatewayResult<GatewayCancellation>;

    fn environment(&self) -> GatewayEnvironment;
}
