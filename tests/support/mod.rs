//! Shared fixtures: an in-memory order store honoring the conditional
//! transition contract, plus scripted gateway and fulfillment doubles.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use orderdesk::config::OrderPolicyConfig;
use orderdesk::database::{DatabaseError, DatabaseErrorKind, OrderStore, TransitionRequest};
use orderdesk::gateway::{
    GatewayCancellation, GatewayClient, GatewayConfirmRequest, GatewayConfirmation,
    GatewayEnvironment, GatewayError, GatewayResult,
};
use orderdesk::orders::{Order, OrderAggregate, OrderStatus, Payment, PaymentStatus};
use orderdesk::services::{
    CancellationService, ConfirmationService, FulfillmentClient, FulfillmentError,
    FulfillmentUpdate, NotificationService, SyncOutcome,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const ORDER_ID: &str = "ord_20260830_0001";
pub const PAYMENT_KEY: &str = "tpay_9f8a7b6c5d4e";
pub const AMOUNT: i64 = 50000;

pub fn aggregate(
    customer_id: Uuid,
    order_status: OrderStatus,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
) -> OrderAggregate {
    let payment_key = match payment_status {
        PaymentStatus::Pending => None,
        _ => Some(PAYMENT_KEY.to_string()),
    };
    OrderAggregate {
        order: Order {
            id: ORDER_ID.to_string(),
            customer_id,
            status: order_status,
            total_amount: AMOUNT,
            customer_name: Some("Kim".to_string()),
            customer_phone: Some("+821012345678".to_string()),
            items: json!([{"name": "widget", "qty": 2}]),
            created_at,
            updated_at: created_at,
        },
        payment: Payment {
            id: Uuid::new_v4(),
            order_id: ORDER_ID.to_string(),
            payment_key,
            status: payment_status,
            approved_at: None,
            created_at,
            updated_at: created_at,
        },
    }
}

pub fn pending_aggregate(customer_id: Uuid) -> OrderAggregate {
    aggregate(customer_id, OrderStatus::Pending, PaymentStatus::Pending, Utc::now())
}

pub fn aged(hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(hours)
}

/// In-memory store with the same conditional-write semantics as the Postgres
/// repository: the transition applies only when both rows match the guard.
pub struct MemoryOrderStore {
    rows: Mutex<HashMap<String, OrderAggregate>>,
    fail_transitions: AtomicBool,
    pub transition_calls: AtomicUsize,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            fail_transitions: AtomicBool::new(false),
            transition_calls: AtomicUsize::new(0),
        }
    }

    pub fn seed(&self, aggregate: OrderAggregate) {
        self.rows.lock().unwrap().insert(aggregate.order.id.clone(), aggregate);
    }

    pub fn fail_next_transitions(&self) {
        self.fail_transitions.store(true, Ordering::SeqCst);
    }

    pub fn get(&self, order_id: &str) -> Option<OrderAggregate> {
        self.rows.lock().unwrap().get(order_id).cloned()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderAggregate>, DatabaseError> {
        Ok(self.rows.lock().unwrap().get(order_id).cloned())
    }

    async fn conditional_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<bool, DatabaseError> {
        self.transition_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_transitions.load(Ordering::SeqCst) {
            return Err(DatabaseError::new(DatabaseErrorKind::Connection {
                message: "connection reset".to_string(),
            }));
        }

        let mut rows = self.rows.lock().unwrap();
        let Some(aggregate) = rows.get_mut(&request.order_id) else {
            return Ok(false);
        };
        if aggregate.order.status != request.expected_order_status {
            return Ok(false);
        }
        let payment_ok = match request.expected_payment_status {
            Some(expected) => aggregate.payment.status == expected,
            None => aggregate.payment.status != PaymentStatus::Canceled,
        };
        if !payment_ok {
            return Ok(false);
        }

        let now = Utc::now();
        aggregate.order.status = request.new_order_status;
        aggregate.order.updated_at = now;
        aggregate.payment.status = request.new_payment_status;
        aggregate.payment.updated_at = now;
        if let Some(key) = request.payment_key {
            aggregate.payment.payment_key = Some(key);
        }
        if let Some(approved_at) = request.approved_at {
            aggregate.payment.approved_at = Some(approved_at);
        }
        Ok(true)
    }
}

#[derive(Debug, Clone)]
pub enum GatewayMode {
    Succeed,
    Reject { code: String, message: String },
    Network,
}

pub struct MockGateway {
    confirm_mode: GatewayMode,
    cancel_mode: GatewayMode,
    pub confirm_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
}

impl MockGateway {
    pub fn succeeding() -> Self {
        Self::new(GatewayMode::Succeed, GatewayMode::Succeed)
    }

    pub fn new(confirm_mode: GatewayMode, cancel_mode: GatewayMode) -> Self {
        Self {
            confirm_mode,
            cancel_mode,
            confirm_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting_confirm(code: &str, message: &str) -> Self {
        Self::new(
            GatewayMode::Reject { code: code.to_string(), message: message.to_string() },
            GatewayMode::Succeed,
        )
    }

    pub fn rejecting_cancel(code: &str, message: &str) -> Self {
        Self::new(
            GatewayMode::Succeed,
            GatewayMode::Reject { code: code.to_string(), message: message.to_string() },
        )
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    async fn confirm(&self, request: &GatewayConfirmRequest) -> GatewayResult<GatewayConfirmation> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        match &self.confirm_mode {
            GatewayMode::Succeed => Ok(GatewayConfirmation {
                payment_key: request.payment_key.clone(),
                method: Some("card".to_string()),
                raw: json!({
                    "paymentKey": request.payment_key,
                    "orderId": request.order_id,
                    "totalAmount": request.amount,
                    "method": "card",
                }),
            }),
            GatewayMode::Reject { code, message } => {
                Err(GatewayError::Rejected { code: code.clone(), message: message.clone() })
            }
            GatewayMode::Network => {
                Err(GatewayError::Network { message: "connection refused".to_string() })
            }
        }
    }

    async fn cancel(
        &self,
        payment_key: &str,
        _amount: i64,
        _reason: &str,
    ) -> GatewayResult<GatewayCancellation> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        match &self.cancel_mode {
            GatewayMode::Succeed => Ok(GatewayCancellation {
                payment_key: payment_key.to_string(),
                raw: json!({"status": "CANCELED"}),
            }),
            GatewayMode::Reject { code, message } => {
                Err(GatewayError::Rejected { code: code.clone(), message: message.clone() })
            }
            GatewayMode::Network => {
                Err(GatewayError::Network { message: "connection refused".to_string() })
            }
        }
    }

    fn environment(&self) -> GatewayEnvironment {
        GatewayEnvironment::Test
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FulfillmentMode {
    Synced,
    NothingToSync,
    Fail,
}

pub struct MockFulfillment {
    mode: FulfillmentMode,
    pub calls: AtomicUsize,
}

impl MockFulfillment {
    pub fn new(mode: FulfillmentMode) -> Self {
        Self { mode, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl FulfillmentClient for MockFulfillment {
    async fn push_confirmation(
        &self,
        _update: &FulfillmentUpdate,
    ) -> Result<SyncOutcome, FulfillmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            FulfillmentMode::Synced => Ok(SyncOutcome::Synced),
            FulfillmentMode::NothingToSync => Ok(SyncOutcome::NothingToSync),
            FulfillmentMode::Fail => Err(FulfillmentError::Rejected {
                status: 503,
                message: "backend unavailable".to_string(),
            }),
        }
    }
}

pub fn confirmation_service(
    store: Arc<MemoryOrderStore>,
    gateway: Arc<MockGateway>,
    fulfillment: Arc<MockFulfillment>,
) -> ConfirmationService {
    ConfirmationService::new(store, gateway, fulfillment, Arc::new(NotificationService::new()))
}

pub fn cancellation_service(
    store: Arc<MemoryOrderStore>,
    gateway: Arc<MockGateway>,
    policy: OrderPolicyConfig,
) -> CancellationService {
    CancellationService::new(store, gateway, Arc::new(NotificationService::new()), policy)
}
