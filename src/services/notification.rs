//! Notification dispatcher.
//!
//! Invoked asynchronously after terminal transitions. Delivery (SMS, email)
//! is owned by an external system with its own retry logic; this service
//! only emits the structured events and must never affect an orchestrator
//! result. Failures here are logged, full stop.

use crate::orders::Order;
use tracing::{error, info};

pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        Self
    }

    pub async fn notify_payment_completed(&self, order: &Order) {
        info!(
            order_id = %order.id,
            amount = order.total_amount,
            phone = order.customer_phone.as_deref().unwrap_or("unknown"),
            "NOTIFICATION: payment completed"
        );
    }

    pub async fn notify_payment_failed(&self, order: &Order) {
        error!(
            order_id = %order.id,
            amount = order.total_amount,
            "NOTIFICATION: payment failed"
        );
    }

    pub async fn notify_order_canceled(&self, order: &Order) {
        info!(
            order_id = %order.id,
            amount = order.total_amount,
            phone = order.customer_phone.as_deref().unwrap_or("unknown"),
            "NOTIFICATION: order canceled"
        );
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}
