//! Confirmation orchestrator.
//!
//! Turns a client-submitted "payment was authorized" signal into a durable
//! state transition across the gateway, the primary store and the secondary
//! backend. Phase order matters: the gateway capture is the real-world side
//! effect, the local transaction is the system of record, and everything
//! after phase 2 is best-effort.

use crate::database::{OrderStore, TransitionRequest};
use crate::error::AppResult;
use crate::gateway::types::PaymentKeyKind;
use crate::gateway::{GatewayClient, GatewayConfirmRequest, GatewayError};
use crate::orders::{
    ConfirmationOutcome, ConfirmationRequest, OrderAggregate, OrderStatus, PaymentStatus,
};
use crate::services::fulfillment::{FulfillmentClient, FulfillmentUpdate};
use crate::services::notification::NotificationService;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct ConfirmationService {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn GatewayClient>,
    fulfillment: Arc<dyn FulfillmentClient>,
    notifications: Arc<NotificationService>,
}

impl ConfirmationService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn GatewayClient>,
        fulfillment: Arc<dyn FulfillmentClient>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self { store, gateway, fulfillment, notifications }
    }

    pub async fn confirm(&self, request: ConfirmationRequest) -> AppResult<ConfirmationOutcome> {
        // Pure validation, before any I/O.
        if request.payment_key.trim().is_empty() {
            return Ok(ConfirmationOutcome::InvalidRequest {
                message: "payment_key is required".to_string(),
            });
        }
        if request.order_id.trim().is_empty() {
            return Ok(ConfirmationOutcome::InvalidRequest {
                message: "order_id is required".to_string(),
            });
        }
        if request.amount <= 0 {
            return Ok(ConfirmationOutcome::InvalidRequest {
                message: format!("amount must be positive, got {}", request.amount),
            });
        }

        // The token's shape is the only signal that distinguishes "user
        // abandoned the widget" from "user paid"; a checkout-session
        // identifier must never be accepted as proof of payment.
        match PaymentKeyKind::classify(&request.payment_key, self.gateway.environment()) {
            PaymentKeyKind::CapturedPayment => {}
            PaymentKeyKind::CheckoutSession => {
                info!(order_id = %request.order_id, "confirm called with checkout session identifier");
                return Ok(ConfirmationOutcome::PaymentNotCompleted);
            }
            PaymentKeyKind::Unrecognized => {
                return Ok(ConfirmationOutcome::InvalidRequest {
                    message: "payment_key is not a captured payment identifier".to_string(),
                });
            }
        }

        let Some(aggregate) = self.store.find_by_order_id(&request.order_id).await? else {
            return Ok(ConfirmationOutcome::InvalidRequest {
                message: format!("order '{}' does not exist", request.order_id),
            });
        };

        if request.amount != aggregate.order.total_amount {
            return Ok(ConfirmationOutcome::InvalidRequest {
                message: format!(
                    "amount {} does not match order total {}",
                    request.amount, aggregate.order.total_amount
                ),
            });
        }

        // Idempotent replay: a terminal payment is never re-confirmed with
        // the gateway; double submission must not capture twice.
        if aggregate.payment.status.is_terminal() {
            info!(
                order_id = %request.order_id,
                payment_status = %aggregate.payment.status,
                "confirmation replay on terminal payment"
            );
            return Ok(ConfirmationOutcome::AlreadyConfirmed { aggregate });
        }

        // Phase 1: gateway capture. A business rejection means no charge
        // occurred; state is untouched and the caller may retry with
        // corrected input.
        let confirmation = match self
            .gateway
            .confirm(&GatewayConfirmRequest {
                payment_key: request.payment_key.clone(),
                order_id: request.order_id.clone(),
                amount: request.amount,
            })
            .await
        {
            Ok(confirmation) => confirmation,
            Err(GatewayError::Rejected { code, message }) => {
                warn!(
                    order_id = %request.order_id,
                    code = %code,
                    "gateway rejected confirmation"
                );
                return Ok(ConfirmationOutcome::GatewayRejected { code, message });
            }
            Err(err) => return Err(err.into()),
        };

        // Phase 2: single local transaction over both rows. From here on the
        // money has moved; failures are consistency incidents, not client
        // errors.
        let approved_at = Utc::now();
        let transition =
            TransitionRequest::confirmation(&request.order_id, &request.payment_key, approved_at);
        let applied = match self.store.conditional_transition(transition).await {
            Ok(applied) => applied,
            Err(db_err) => {
                error!(
                    order_id = %request.order_id,
                    payment_key = %request.payment_key,
                    error = %db_err,
                    incident = "capture_without_local_record",
                    "money captured at gateway but local persist failed; manual reconciliation required"
                );
                return Ok(ConfirmationOutcome::LocalPersistFailedAfterCapture {
                    payment_key: request.payment_key,
                });
            }
        };

        if !applied {
            // A concurrent confirmation won the conditional update. Re-read
            // and report the replay.
            let current = self.store.find_by_order_id(&request.order_id).await?;
            return match current {
                Some(aggregate) if aggregate.payment.status.is_terminal() => {
                    Ok(ConfirmationOutcome::AlreadyConfirmed { aggregate })
                }
                _ => Err(crate::error::AppError::conflicting_update(&request.order_id)),
            };
        }

        let mut aggregate = aggregate;
        aggregate.order.status = OrderStatus::Paid;
        aggregate.order.updated_at = approved_at;
        aggregate.payment.status = PaymentStatus::Completed;
        aggregate.payment.payment_key = Some(request.payment_key.clone());
        aggregate.payment.approved_at = Some(approved_at);
        aggregate.payment.updated_at = approved_at;

        info!(
            order_id = %request.order_id,
            amount = request.amount,
            "payment confirmed and recorded"
        );

        // Phase 4 is triggered by phase 2 success, independent of phase 3.
        let notifications = Arc::clone(&self.notifications);
        let order_for_notification = aggregate.order.clone();
        tokio::spawn(async move {
            notifications.notify_payment_completed(&order_for_notification).await;
        });

        // Phase 3: best-effort propagation. Never rolls anything back.
        let update = FulfillmentUpdate {
            order_id: request.order_id.clone(),
            payment_key: request.payment_key.clone(),
            method: confirmation.method.clone(),
            gateway_payload: confirmation.raw.clone(),
        };
        match self.fulfillment.push_confirmation(&update).await {
            Ok(_) => Ok(ConfirmationOutcome::Confirmed { aggregate }),
            Err(err) => {
                warn!(
                    order_id = %request.order_id,
                    error = %err,
                    retryable = err.is_retryable(),
                    "secondary backend propagation failed; confirmation stands"
                );
                Ok(ConfirmationOutcome::ConfirmedWithoutSecondarySync { aggregate })
            }
        }
    }
}
