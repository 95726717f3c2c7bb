//! Caller-facing endpoints. These map orchestrator outcomes to HTTP; the
//! orchestration contract itself lives in `services`.

use crate::error::AppError;
use crate::orders::{
    CancellationOutcome, CancellationRequest, ConfirmationOutcome, ConfirmationRequest,
    OrderAggregate, Principal, PrincipalRole,
};
use crate::services::{CancellationService, ConfirmationService};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub struct ApiState {
    pub confirmations: Arc<ConfirmationService>,
    pub cancellations: Arc<CancellationService>,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/payments/confirm", post(confirm_payment))
        .route("/api/orders/{order_id}/cancel", post(cancel_order))
        .with_state(state)
}

/// POST /api/payments/confirm
///
/// Body is the checkout-redirect payload `{payment_key, order_id, amount}`;
/// the endpoint is safe to call repeatedly.
async fn confirm_payment(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ConfirmationRequest>,
) -> Result<Response, AppError> {
    let outcome = state.confirmations.confirm(request).await?;
    Ok(confirmation_response(outcome))
}

fn aggregate_body(status: &str, aggregate: &OrderAggregate) -> serde_json::Value {
    json!({
        "status": status,
        "order_id": aggregate.order.id,
        "order_status": aggregate.order.status,
        "payment_status": aggregate.payment.status,
        "approved_at": aggregate.payment.approved_at,
    })
}

fn confirmation_response(outcome: ConfirmationOutcome) -> Response {
    match outcome {
        ConfirmationOutcome::Confirmed { aggregate } => {
            let mut body = aggregate_body("confirmed", &aggregate);
            body["secondary_sync"] = json!("synced");
            (StatusCode::OK, Json(body)).into_response()
        }
        ConfirmationOutcome::ConfirmedWithoutSecondarySync { aggregate } => {
            let mut body = aggregate_body("confirmed", &aggregate);
            body["secondary_sync"] = json!("pending");
            (StatusCode::OK, Json(body)).into_response()
        }
        ConfirmationOutcome::AlreadyConfirmed { aggregate } => {
            (StatusCode::OK, Json(aggregate_body("already_confirmed", &aggregate)))
                .into_response()
        }
        ConfirmationOutcome::PaymentNotCompleted => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "PAYMENT_NOT_COMPLETED",
                "message": "the payment has not been completed at the gateway",
            })),
        )
            .into_response(),
        ConfirmationOutcome::GatewayRejected { code, message } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "GATEWAY_REJECTED",
                "code": code,
                "message": message,
            })),
        )
            .into_response(),
        ConfirmationOutcome::LocalPersistFailedAfterCapture { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "RECONCILIATION_REQUIRED",
                "message": "payment was captured but could not be recorded; support has been notified",
            })),
        )
            .into_response(),
        ConfirmationOutcome::InvalidRequest { message } => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "INVALID_REQUEST",
                "message": message,
            })),
        )
            .into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct CancelBody {
    #[serde(default)]
    reason: Option<String>,
}

/// POST /api/orders/{order_id}/cancel
///
/// The upstream auth layer injects the caller via `x-user-id` and
/// `x-user-role` headers.
async fn cancel_order(
    State(state): State<Arc<ApiState>>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let principal = principal_from_headers(&headers)?;
    // The body is optional; an absent or non-JSON body means no reason given.
    let reason = serde_json::from_slice::<CancelBody>(&body).ok().and_then(|b| b.reason);

    let outcome = state
        .cancellations
        .cancel(CancellationRequest { order_id, principal, reason })
        .await?;
    Ok(cancellation_response(outcome))
}

fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, AppError> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::missing_field("x-user-id"))?;
    let user_id = Uuid::parse_str(user_id).map_err(|_| {
        AppError::new(crate::error::AppErrorKind::Validation(
            crate::error::ValidationError::InvalidField {
                field: "x-user-id".to_string(),
                reason: "must be a UUID".to_string(),
            },
        ))
    })?;
    let role = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("customer")
        .parse::<PrincipalRole>()
        .map_err(|reason| {
            AppError::new(crate::error::AppErrorKind::Validation(
                crate::error::ValidationError::InvalidField {
                    field: "x-user-role".to_string(),
                    reason,
                },
            ))
        })?;
    Ok(Principal { user_id, role })
}

fn cancellation_response(outcome: CancellationOutcome) -> Response {
    match outcome {
        CancellationOutcome::Canceled { aggregate } => {
            (StatusCode::OK, Json(aggregate_body("canceled", &aggregate))).into_response()
        }
        CancellationOutcome::AlreadyCanceled => (
            StatusCode::OK,
            Json(json!({"status": "already_canceled"})),
        )
            .into_response(),
        CancellationOutcome::Forbidden => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "FORBIDDEN",
                "message": "only the order owner may cancel this order",
            })),
        )
            .into_response(),
        CancellationOutcome::WindowExpired => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "CANCELLATION_WINDOW_EXPIRED",
                "message": "the order is no longer eligible for cancellation",
            })),
        )
            .into_response(),
        CancellationOutcome::CancelRejected { reason } => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "CANCEL_REJECTED",
                "reason": reason,
            })),
        )
            .into_response(),
        CancellationOutcome::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "ORDER_NOT_FOUND",
                "message": "no such order",
            })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_parses_from_headers() {
        let mut headers = HeaderMap::new();
        let id = Uuid::new_v4();
        headers.insert("x-user-id", id.to_string().parse().unwrap());
        headers.insert("x-user-role", "admin".parse().unwrap());

        let principal = principal_from_headers(&headers).expect("should parse");
        assert_eq!(principal.user_id, id);
        assert_eq!(principal.role, PrincipalRole::Admin);
    }

    #[test]
    fn missing_user_id_is_a_validation_error() {
        let headers = HeaderMap::new();
        let err = principal_from_headers(&headers).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn role_defaults_to_customer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", Uuid::new_v4().to_string().parse().unwrap());
        let principal = principal_from_headers(&headers).expect("should parse");
        assert_eq!(principal.role, PrincipalRole::Customer);
    }
}
