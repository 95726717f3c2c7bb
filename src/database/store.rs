//! The order/payment store seam.
//!
//! Orchestrators never issue unconditional writes: every mutation is a
//! `conditional_transition` guarded by the expected prior statuses, executed
//! as a single local transaction over both rows. A losing concurrent writer
//! observes `Ok(false)` and re-reads instead of corrupting state.

use crate::database::error::DatabaseError;
use crate::orders::{OrderAggregate, OrderStatus, PaymentStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One guarded order+payment transition.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub order_id: String,
    pub expected_order_status: OrderStatus,
    /// `None` means "any payment status except CANCELED"; used by the
    /// cancellation path, where the payment may be PENDING, COMPLETED or
    /// FAILED at the time the order is canceled.
    pub expected_payment_status: Option<PaymentStatus>,
    pub new_order_status: OrderStatus,
    pub new_payment_status: PaymentStatus,
    /// Set only by the confirmation path.
    pub payment_key: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl TransitionRequest {
    /// The confirmation phase-2 write: payment PENDING -> COMPLETED with the
    /// captured key, order PENDING -> PAID.
    pub fn confirmation(order_id: &str, payment_key: &str, approved_at: DateTime<Utc>) -> Self {
        Self {
            order_id: order_id.to_string(),
            expected_order_status: OrderStatus::Pending,
            expected_payment_status: Some(PaymentStatus::Pending),
            new_order_status: OrderStatus::Paid,
            new_payment_status: PaymentStatus::Completed,
            payment_key: Some(payment_key.to_string()),
            approved_at: Some(approved_at),
        }
    }

    /// The cancellation phase-2 write: order -> CANCELED from its current
    /// status, payment -> CANCELED whatever non-canceled state it is in.
    pub fn cancellation(order_id: &str, expected_order_status: OrderStatus) -> Self {
        Self {
            order_id: order_id.to_string(),
            expected_order_status,
            expected_payment_status: None,
            new_order_status: OrderStatus::Canceled,
            new_payment_status: PaymentStatus::Canceled,
            payment_key: None,
            approved_at: None,
        }
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Load the order together with its payment record.
    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderAggregate>, DatabaseError>;

    /// Apply the transition if and only if both rows are in the expected
    /// states. Returns whether the transition was applied; `false` is a
    /// clean no-op (a concurrent writer got there first).
    async fn conditional_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<bool, DatabaseError>;
}
