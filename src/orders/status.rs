//! Order and payment status state machines.
//!
//! Every local mutation in this subsystem is a guarded transition along the
//! graphs defined here. `Completed -> Canceled` is a deliberate business
//! override of normal terminality and is additionally gated by
//! `OrderPolicyConfig::allow_completed_cancellation` at the orchestrator
//! level.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipping,
    Completed,
    Canceled,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Failed => "failed",
        }
    }

    /// Valid successor statuses.
    pub fn valid_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => {
                &[OrderStatus::Paid, OrderStatus::Failed, OrderStatus::Canceled]
            }
            OrderStatus::Paid => &[OrderStatus::Shipping, OrderStatus::Canceled],
            OrderStatus::Shipping => &[OrderStatus::Completed, OrderStatus::Canceled],
            // Cancellation after completion is an explicit business override.
            OrderStatus::Completed => &[OrderStatus::Canceled],
            OrderStatus::Canceled => &[],
            OrderStatus::Failed => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Canceled | OrderStatus::Failed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "shipping" => Ok(OrderStatus::Shipping),
            "completed" => Ok(OrderStatus::Completed),
            "canceled" | "cancelled" => Ok(OrderStatus::Canceled),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Canceled,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Failed => "failed",
        }
    }

    /// A terminal payment is replayed idempotently by the confirmation
    /// orchestrator instead of being re-confirmed with the gateway.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "canceled" | "cancelled" => Ok(PaymentStatus::Canceled),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}
