//! Postgres-backed order/payment store.

use crate::database::error::DatabaseError;
use crate::database::store::{OrderStore, TransitionRequest};
use crate::orders::{Order, OrderAggregate, OrderStatus, Payment, PaymentStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    id: String,
    customer_id: Uuid,
    status: String,
    total_amount: i64,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    items: JsonValue,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: String,
    payment_key: Option<String>,
    status: String,
    approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, DatabaseError> {
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(DatabaseError::corrupted)?;
        Ok(Order {
            id: self.id,
            customer_id: self.customer_id,
            status,
            total_amount: self.total_amount,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            items: self.items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, DatabaseError> {
        let status = self
            .status
            .parse::<PaymentStatus>()
            .map_err(DatabaseError::corrupted)?;
        Ok(Payment {
            id: self.id,
            order_id: self.order_id,
            payment_key: self.payment_key,
            status,
            approved_at: self.approved_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderAggregate>, DatabaseError> {
        let order_row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, customer_id, status, total_amount, customer_name, customer_phone, items, created_at, updated_at
             FROM orders WHERE id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let Some(order_row) = order_row else {
            return Ok(None);
        };

        // Payments are 1:1 with orders and created at checkout; a missing
        // row means the stored data is broken, not that the order is new.
        let payment_row = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, order_id, payment_key, status, approved_at, created_at, updated_at
             FROM payments WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .ok_or_else(|| {
            DatabaseError::corrupted(format!("order '{}' has no payment record", order_id))
        })?;

        Ok(Some(OrderAggregate {
            order: order_row.into_order()?,
            payment: payment_row.into_payment()?,
        }))
    }

    async fn conditional_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let order_result = sqlx::query(
            "UPDATE orders SET status = $1, updated_at = NOW()
             WHERE id = $2 AND status = $3",
        )
        .bind(request.new_order_status.as_str())
        .bind(&request.order_id)
        .bind(request.expected_order_status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if order_result.rows_affected() != 1 {
            tx.rollback().await.map_err(DatabaseError::from_sqlx)?;
            return Ok(false);
        }

        let payment_result = match request.expected_payment_status {
            Some(expected) => sqlx::query(
                "UPDATE payments
                 SET status = $1,
                     payment_key = COALESCE($2, payment_key),
                     approved_at = COALESCE($3, approved_at),
                     updated_at = NOW()
                 WHERE order_id = $4 AND status = $5",
            )
            .bind(request.new_payment_status.as_str())
            .bind(&request.payment_key)
            .bind(request.approved_at)
            .bind(&request.order_id)
            .bind(expected.as_str())
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_sqlx)?,
            None => sqlx::query(
                "UPDATE payments
                 SET status = $1, updated_at = NOW()
                 WHERE order_id = $2 AND status <> 'canceled'",
            )
            .bind(request.new_payment_status.as_str())
            .bind(&request.order_id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_sqlx)?,
        };

        if payment_result.rows_affected() != 1 {
            tx.rollback().await.map_err(DatabaseError::from_sqlx)?;
            return Ok(false);
        }

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;
        Ok(true)
    }
}
