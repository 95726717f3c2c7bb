//! Cancellation saga behavior: ownership, eligibility windows, gateway
//! reversal and the conditional local write.

mod support;

use orderdesk::config::OrderPolicyConfig;
use orderdesk::orders::{
    CancelRejectReason, CancellationOutcome, CancellationRequest, OrderStatus, PaymentStatus,
    Principal,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use support::*;
use uuid::Uuid;

fn cancel_request(principal: Principal) -> CancellationRequest {
    CancellationRequest { order_id: ORDER_ID.to_string(), principal, reason: None }
}

#[tokio::test]
async fn pending_order_cancels_without_gateway_reversal() {
    let customer = Uuid::new_v4();
    let store = Arc::new(MemoryOrderStore::new());
    store.seed(pending_aggregate(customer));
    let gateway = Arc::new(MockGateway::succeeding());
    let service = cancellation_service(store.clone(), gateway.clone(), OrderPolicyConfig::default());

    let outcome = service.cancel(cancel_request(Principal::customer(customer))).await.unwrap();

    assert!(matches!(outcome, CancellationOutcome::Canceled { .. }));
    // No capture ever happened, so there is nothing to reverse.
    assert_eq!(gateway.cancel_calls.load(Ordering::SeqCst), 0);

    let stored = store.get(ORDER_ID).unwrap();
    assert_eq!(stored.order.status, OrderStatus::Canceled);
    assert_eq!(stored.payment.status, PaymentStatus::Canceled);
}

#[tokio::test]
async fn paid_order_within_window_reverses_then_cancels() {
    let customer = Uuid::new_v4();
    let store = Arc::new(MemoryOrderStore::new());
    store.seed(aggregate(customer, OrderStatus::Paid, PaymentStatus::Completed, aged(2)));
    let gateway = Arc::new(MockGateway::succeeding());
    let service = cancellation_service(store.clone(), gateway.clone(), OrderPolicyConfig::default());

    let outcome = service.cancel(cancel_request(Principal::customer(customer))).await.unwrap();

    let label = outcome.label();
    let CancellationOutcome::Canceled { aggregate } = outcome else {
        panic!("expected Canceled, got {label}");
    };
    assert_eq!(aggregate.order.status, OrderStatus::Canceled);
    assert_eq!(gateway.cancel_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn paid_order_past_window_is_not_cancelable() {
    let customer = Uuid::new_v4();
    let store = Arc::new(MemoryOrderStore::new());
    store.seed(aggregate(customer, OrderStatus::Paid, PaymentStatus::Completed, aged(30)));
    let gateway = Arc::new(MockGateway::succeeding());
    let service = cancellation_service(store.clone(), gateway.clone(), OrderPolicyConfig::default());

    let outcome = service.cancel(cancel_request(Principal::customer(customer))).await.unwrap();

    assert!(matches!(outcome, CancellationOutcome::WindowExpired));
    assert_eq!(gateway.cancel_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.get(ORDER_ID).unwrap().order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn completed_order_cancels_under_the_business_override() {
    let customer = Uuid::new_v4();
    let store = Arc::new(MemoryOrderStore::new());
    store.seed(aggregate(customer, OrderStatus::Completed, PaymentStatus::Completed, aged(30)));
    let gateway = Arc::new(MockGateway::succeeding());
    let service = cancellation_service(store.clone(), gateway.clone(), OrderPolicyConfig::default());

    let outcome = service.cancel(cancel_request(Principal::customer(customer))).await.unwrap();

    assert!(matches!(outcome, CancellationOutcome::Canceled { .. }));
    assert_eq!(gateway.cancel_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.get(ORDER_ID).unwrap().order.status, OrderStatus::Canceled);
}

#[tokio::test]
async fn completed_override_can_be_disabled() {
    let customer = Uuid::new_v4();
    let store = Arc::new(MemoryOrderStore::new());
    store.seed(aggregate(customer, OrderStatus::Completed, PaymentStatus::Completed, aged(30)));
    let gateway = Arc::new(MockGateway::succeeding());
    let policy =
        OrderPolicyConfig { cancellation_window_hours: 24, allow_completed_cancellation: false };
    let service = cancellation_service(store, gateway.clone(), policy);

    let outcome = service.cancel(cancel_request(Principal::customer(customer))).await.unwrap();

    assert!(matches!(outcome, CancellationOutcome::WindowExpired));
    assert_eq!(gateway.cancel_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_order_is_terminal_even_inside_the_window() {
    let customer = Uuid::new_v4();
    let store = Arc::new(MemoryOrderStore::new());
    store.seed(aggregate(customer, OrderStatus::Failed, PaymentStatus::Failed, aged(1)));
    let gateway = Arc::new(MockGateway::succeeding());
    let service = cancellation_service(store.clone(), gateway.clone(), OrderPolicyConfig::default());

    let outcome = service.cancel(cancel_request(Principal::customer(customer))).await.unwrap();

    // FAILED has no edge to CANCELED; age is irrelevant.
    assert!(matches!(outcome, CancellationOutcome::WindowExpired));
    assert_eq!(gateway.cancel_calls.load(Ordering::SeqCst), 0);
    let stored = store.get(ORDER_ID).unwrap();
    assert_eq!(stored.order.status, OrderStatus::Failed);
    assert_eq!(stored.payment.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn already_canceled_is_an_idempotent_no_op() {
    let customer = Uuid::new_v4();
    let store = Arc::new(MemoryOrderStore::new());
    store.seed(aggregate(customer, OrderStatus::Canceled, PaymentStatus::Canceled, aged(1)));
    let gateway = Arc::new(MockGateway::succeeding());
    let service = cancellation_service(store, gateway.clone(), OrderPolicyConfig::default());

    let outcome = service.cancel(cancel_request(Principal::customer(customer))).await.unwrap();

    assert!(matches!(outcome, CancellationOutcome::AlreadyCanceled));
    assert_eq!(gateway.cancel_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn strangers_are_forbidden_admins_are_not() {
    let customer = Uuid::new_v4();
    let store = Arc::new(MemoryOrderStore::new());
    store.seed(pending_aggregate(customer));
    let gateway = Arc::new(MockGateway::succeeding());
    let service = cancellation_service(store.clone(), gateway, OrderPolicyConfig::default());

    let outcome =
        service.cancel(cancel_request(Principal::customer(Uuid::new_v4()))).await.unwrap();
    assert!(matches!(outcome, CancellationOutcome::Forbidden));
    assert_eq!(store.get(ORDER_ID).unwrap().order.status, OrderStatus::Pending);

    let outcome = service.cancel(cancel_request(Principal::admin(Uuid::new_v4()))).await.unwrap();
    assert!(matches!(outcome, CancellationOutcome::Canceled { .. }));
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let store = Arc::new(MemoryOrderStore::new());
    let gateway = Arc::new(MockGateway::succeeding());
    let service = cancellation_service(store, gateway, OrderPolicyConfig::default());

    let outcome =
        service.cancel(cancel_request(Principal::customer(Uuid::new_v4()))).await.unwrap();
    assert!(matches!(outcome, CancellationOutcome::NotFound));
}

#[tokio::test]
async fn rejected_reversal_keeps_local_state() {
    let customer = Uuid::new_v4();
    let store = Arc::new(MemoryOrderStore::new());
    store.seed(aggregate(customer, OrderStatus::Paid, PaymentStatus::Completed, aged(2)));
    let gateway =
        Arc::new(MockGateway::rejecting_cancel("ALREADY_CANCELED_PAYMENT", "already canceled"));
    let service = cancellation_service(store.clone(), gateway, OrderPolicyConfig::default());

    let outcome = service.cancel(cancel_request(Principal::customer(customer))).await.unwrap();

    let label = outcome.label();
    let CancellationOutcome::CancelRejected { reason } = outcome else {
        panic!("expected CancelRejected, got {label}");
    };
    assert_eq!(reason, CancelRejectReason::AlreadyCanceled);
    // The money was not returned; the order must keep its prior state.
    assert_eq!(store.get(ORDER_ID).unwrap().order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn gateway_network_failure_is_an_error_and_changes_nothing() {
    let customer = Uuid::new_v4();
    let store = Arc::new(MemoryOrderStore::new());
    store.seed(aggregate(customer, OrderStatus::Paid, PaymentStatus::Completed, aged(2)));
    let gateway = Arc::new(MockGateway::new(GatewayMode::Succeed, GatewayMode::Network));
    let service = cancellation_service(store.clone(), gateway, OrderPolicyConfig::default());

    let err = service.cancel(cancel_request(Principal::customer(customer))).await.unwrap_err();
    assert_eq!(err.status_code(), 502);
    assert_eq!(store.get(ORDER_ID).unwrap().order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn persist_failure_after_reversal_surfaces_as_error() {
    let customer = Uuid::new_v4();
    let store = Arc::new(MemoryOrderStore::new());
    store.seed(aggregate(customer, OrderStatus::Paid, PaymentStatus::Completed, aged(2)));
    store.fail_next_transitions();
    let gateway = Arc::new(MockGateway::succeeding());
    let service = cancellation_service(store.clone(), gateway.clone(), OrderPolicyConfig::default());

    let err = service.cancel(cancel_request(Principal::customer(customer))).await.unwrap_err();

    assert_eq!(err.status_code(), 500);
    // The reversal did happen; the caller sees a retryable server error.
    assert_eq!(gateway.cancel_calls.load(Ordering::SeqCst), 1);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn custom_reason_is_accepted() {
    let customer = Uuid::new_v4();
    let store = Arc::new(MemoryOrderStore::new());
    store.seed(aggregate(customer, OrderStatus::Paid, PaymentStatus::Completed, aged(2)));
    let gateway = Arc::new(MockGateway::succeeding());
    let service = cancellation_service(store, gateway, OrderPolicyConfig::default());

    let outcome = service
        .cancel(CancellationRequest {
            order_id: ORDER_ID.to_string(),
            principal: Principal::customer(customer),
            reason: Some("changed my mind".to_string()),
        })
        .await
        .unwrap();

    assert!(matches!(outcome, CancellationOutcome::Canceled { .. }));
}
