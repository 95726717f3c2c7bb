//! Cancellation orchestrator.
//!
//! Cancellation must never diverge from the gateway's ledger: the order is
//! marked CANCELED only when no capture ever occurred or the gateway has
//! confirmed the reversal.

use crate::config::OrderPolicyConfig;
use crate::database::{OrderStore, TransitionRequest};
use crate::error::AppResult;
use crate::gateway::{GatewayClient, GatewayError};
use crate::orders::{
    CancellationOutcome, CancellationRequest, OrderStatus, PaymentStatus,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_CANCEL_REASON: &str = "customer requested cancellation";

pub struct CancellationService {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn GatewayClient>,
    notifications: Arc<crate::services::notification::NotificationService>,
    policy: OrderPolicyConfig,
}

impl CancellationService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn GatewayClient>,
        notifications: Arc<crate::services::notification::NotificationService>,
        policy: OrderPolicyConfig,
    ) -> Self {
        Self { store, gateway, notifications, policy }
    }

    pub async fn cancel(&self, request: CancellationRequest) -> AppResult<CancellationOutcome> {
        let Some(aggregate) = self.store.find_by_order_id(&request.order_id).await? else {
            return Ok(CancellationOutcome::NotFound);
        };

        if !request.principal.owns(&aggregate.order) {
            warn!(
                order_id = %request.order_id,
                user_id = %request.principal.user_id,
                "cancellation attempted by non-owner"
            );
            return Ok(CancellationOutcome::Forbidden);
        }

        if aggregate.order.status == OrderStatus::Canceled {
            return Ok(CancellationOutcome::AlreadyCanceled);
        }

        if !self.is_eligible(aggregate.order.status, aggregate.order.created_at) {
            info!(
                order_id = %request.order_id,
                status = %aggregate.order.status,
                created_at = %aggregate.order.created_at,
                "cancellation window expired"
            );
            return Ok(CancellationOutcome::WindowExpired);
        }

        // Phase 1: reverse the capture at the gateway, if one exists. On
        // rejection the money has not been returned, so local state must
        // keep its prior value.
        let reversal_key = match (&aggregate.payment.payment_key, aggregate.payment.status) {
            (Some(key), status) if status != PaymentStatus::Canceled => Some(key.clone()),
            _ => None,
        };
        let needs_reversal = reversal_key.is_some();
        if let Some(payment_key) = reversal_key.as_deref() {
            let reason = request.reason.as_deref().unwrap_or(DEFAULT_CANCEL_REASON);
            match self
                .gateway
                .cancel(payment_key, aggregate.order.total_amount, reason)
                .await
            {
                Ok(_) => {
                    info!(
                        order_id = %request.order_id,
                        amount = aggregate.order.total_amount,
                        "gateway reversal succeeded"
                    );
                }
                Err(err @ GatewayError::Rejected { .. }) => {
                    let reason = err.cancel_reject_reason();
                    warn!(
                        order_id = %request.order_id,
                        reason = %reason,
                        error = %err,
                        "gateway rejected reversal; order state unchanged"
                    );
                    return Ok(CancellationOutcome::CancelRejected { reason });
                }
                Err(err) => return Err(err.into()),
            }
        }

        // Phase 2: single local transaction over both rows.
        let transition =
            TransitionRequest::cancellation(&request.order_id, aggregate.order.status);
        let applied = match self.store.conditional_transition(transition).await {
            Ok(applied) => applied,
            Err(db_err) => {
                if needs_reversal {
                    // Reversal already happened at the gateway; this is the
                    // cancellation analog of a capture without a local
                    // record and needs out-of-band reconciliation.
                    error!(
                        order_id = %request.order_id,
                        error = %db_err,
                        incident = "reversal_without_local_record",
                        "gateway reversal succeeded but local persist failed; manual reconciliation required"
                    );
                }
                return Err(db_err.into());
            }
        };

        if !applied {
            let current = self.store.find_by_order_id(&request.order_id).await?;
            return match current {
                Some(aggregate) if aggregate.order.status == OrderStatus::Canceled => {
                    Ok(CancellationOutcome::AlreadyCanceled)
                }
                _ => Err(crate::error::AppError::conflicting_update(&request.order_id)),
            };
        }

        let now = Utc::now();
        let mut aggregate = aggregate;
        aggregate.order.status = OrderStatus::Canceled;
        aggregate.order.updated_at = now;
        aggregate.payment.status = PaymentStatus::Canceled;
        aggregate.payment.updated_at = now;

        info!(order_id = %request.order_id, "order canceled");

        let notifications = Arc::clone(&self.notifications);
        let order_for_notification = aggregate.order.clone();
        tokio::spawn(async move {
            notifications.notify_order_canceled(&order_for_notification).await;
        });

        Ok(CancellationOutcome::Canceled { aggregate })
    }

    /// Pure eligibility rules. The transition graph gates everything: a
    /// status with no edge to CANCELED (FAILED, CANCELED itself) is never
    /// eligible. Beyond that, PENDING is always cancelable (no money has
    /// moved), COMPLETED is covered by the configurable override, and every
    /// other status is only cancelable within the configured window from
    /// order creation.
    fn is_eligible(
        &self,
        status: OrderStatus,
        created_at: chrono::DateTime<Utc>,
    ) -> bool {
        if !status.can_transition_to(OrderStatus::Canceled) {
            return false;
        }
        match status {
            OrderStatus::Pending => true,
            OrderStatus::Completed if self.policy.allow_completed_cancellation => true,
            _ => {
                let window = Duration::hours(self.policy.cancellation_window_hours);
                Utc::now().signed_duration_since(created_at) <= window
            }
        }
    }
}
