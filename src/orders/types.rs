//! Domain entities and orchestrator request/outcome types.

use crate::orders::status::{OrderStatus, PaymentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One purchase intent. `id` doubles as the gateway-facing order reference;
/// it is globally unique and immutable once created. `items` is read-only to
/// this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    /// Minor currency units, no fractional component.
    pub total_amount: i64,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub items: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Exactly one per order, created PENDING at checkout before any gateway
/// interaction. `payment_key` and `approved_at` are set only when a
/// confirmation succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: String,
    pub payment_key: Option<String>,
    pub status: PaymentStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The order/payment pair, always loaded and mutated together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAggregate {
    pub order: Order,
    pub payment: Payment,
}

/// Submitted once per checkout redirect; may legitimately arrive more than
/// once (browser back, double-click, manual retry).
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationRequest {
    pub payment_key: String,
    pub order_id: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalRole {
    Customer,
    /// Authorized override role; may cancel any order.
    Admin,
}

impl FromStr for PrincipalRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "customer" => Ok(PrincipalRole::Customer),
            "admin" => Ok(PrincipalRole::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// The authenticated caller, as injected by the upstream auth layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: PrincipalRole,
}

impl Principal {
    pub fn customer(user_id: Uuid) -> Self {
        Self { user_id, role: PrincipalRole::Customer }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self { user_id, role: PrincipalRole::Admin }
    }

    pub fn owns(&self, order: &Order) -> bool {
        self.role == PrincipalRole::Admin || self.user_id == order.customer_id
    }
}

#[derive(Debug, Clone)]
pub struct CancellationRequest {
    pub order_id: String,
    pub principal: Principal,
    pub reason: Option<String>,
}

/// Result of a confirmation orchestration. Success variants carry the
/// post-transition aggregate so callers can render the new state without a
/// second read.
#[derive(Debug, Clone)]
pub enum ConfirmationOutcome {
    /// Gateway capture, local persist and secondary sync all succeeded.
    Confirmed { aggregate: OrderAggregate },
    /// Customer has paid and the authoritative state is correct, but the
    /// secondary backend did not acknowledge the propagation.
    ConfirmedWithoutSecondarySync { aggregate: OrderAggregate },
    /// Idempotent replay: the payment was already in a terminal state, so no
    /// gateway call was made and the existing aggregate is returned.
    AlreadyConfirmed { aggregate: OrderAggregate },
    /// The submitted key has the shape of an unfinished checkout session, not
    /// a captured payment; the user never finished the hosted payment form.
    PaymentNotCompleted,
    /// The gateway refused the capture; nothing was charged, nothing mutated.
    GatewayRejected { code: String, message: String },
    /// Money was captured at the gateway but the local write failed. Requires
    /// out-of-band reconciliation; logged as an operational incident.
    LocalPersistFailedAfterCapture { payment_key: String },
    InvalidRequest { message: String },
}

impl ConfirmationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ConfirmationOutcome::Confirmed { .. } => "confirmed",
            ConfirmationOutcome::ConfirmedWithoutSecondarySync { .. } => {
                "confirmed_without_secondary_sync"
            }
            ConfirmationOutcome::AlreadyConfirmed { .. } => "already_confirmed",
            ConfirmationOutcome::PaymentNotCompleted => "payment_not_completed",
            ConfirmationOutcome::GatewayRejected { .. } => "gateway_rejected",
            ConfirmationOutcome::LocalPersistFailedAfterCapture { .. } => {
                "local_persist_failed_after_capture"
            }
            ConfirmationOutcome::InvalidRequest { .. } => "invalid_request",
        }
    }
}

/// Stable local reasons for a gateway-side cancellation rejection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelRejectReason {
    AuthorizationMissing,
    NotFound,
    AlreadyCanceled,
    ProviderError,
}

impl fmt::Display for CancelRejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CancelRejectReason::AuthorizationMissing => "authorization_missing",
            CancelRejectReason::NotFound => "not_found",
            CancelRejectReason::AlreadyCanceled => "already_canceled",
            CancelRejectReason::ProviderError => "provider_error",
        };
        write!(f, "{}", label)
    }
}

/// Result of a cancellation orchestration.
#[derive(Debug, Clone)]
pub enum CancellationOutcome {
    Canceled { aggregate: OrderAggregate },
    /// Idempotent no-op; the order was already canceled.
    AlreadyCanceled,
    Forbidden,
    WindowExpired,
    /// The gateway refused the reversal; the money has not been returned and
    /// the order keeps its prior state.
    CancelRejected { reason: CancelRejectReason },
    NotFound,
}

impl CancellationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CancellationOutcome::Canceled { .. } => "canceled",
            CancellationOutcome::AlreadyCanceled => "already_canceled",
            CancellationOutcome::Forbidden => "forbidden",
            CancellationOutcome::WindowExpired => "window_expired",
            CancellationOutcome::CancelRejected { .. } => "cancel_rejected",
            CancellationOutcome::NotFound => "not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(customer: Uuid) -> Order {
        Order {
            id: "ord_1".to_string(),
            customer_id: customer,
            status: OrderStatus::Pending,
            total_amount: 50000,
            customer_name: Some("Kim".to_string()),
            customer_phone: Some("+821012345678".to_string()),
            items: json!([{"name": "widget", "qty": 1}]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_and_admin_pass_ownership_check() {
        let owner = Uuid::new_v4();
        let order = order(owner);

        assert!(Principal::customer(owner).owns(&order));
        assert!(Principal::admin(Uuid::new_v4()).owns(&order));
        assert!(!Principal::customer(Uuid::new_v4()).owns(&order));
    }

    #[test]
    fn confirmation_request_deserializes_from_redirect_payload() {
        let req: ConfirmationRequest = serde_json::from_value(json!({
            "payment_key": "tpay_9f8a7b6c5d4e",
            "order_id": "ord_1",
            "amount": 50000
        }))
        .expect("deserialization should succeed");
        assert_eq!(req.order_id, "ord_1");
        assert_eq!(req.amount, 50000);
    }

    #[test]
    fn outcome_labels_are_stable() {
        assert_eq!(ConfirmationOutcome::PaymentNotCompleted.label(), "payment_not_completed");
        assert_eq!(CancellationOutcome::WindowExpired.label(), "window_expired");
        assert_eq!(CancelRejectReason::AuthorizationMissing.to_string(), "authorization_missing");
    }
}
