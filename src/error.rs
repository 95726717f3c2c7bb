//! Unified error handling.
//!
//! Orchestrator *outcomes* (gateway rejections, expired windows, idempotent
//! replays) are not errors; they travel through the outcome enums in
//! `orders::types`. `AppError` covers the plumbing underneath: bad input
//! caught before any I/O, infrastructure failures, and external services
//! that could not be reached at all.

use crate::database::DatabaseError;
use crate::gateway::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes for programmatic client handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx)
    #[serde(rename = "ORDER_NOT_FOUND")]
    OrderNotFound,
    #[serde(rename = "CONFLICTING_UPDATE")]
    ConflictingUpdate,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors (502, 503, 504)
    #[serde(rename = "GATEWAY_ERROR")]
    GatewayError,
    #[serde(rename = "FULFILLMENT_ERROR")]
    FulfillmentError,
    #[serde(rename = "EXTERNAL_SERVICE_TIMEOUT")]
    ExternalServiceTimeout,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
}

/// Domain-level failures that are real errors rather than outcomes.
#[derive(Debug, Clone)]
pub enum DomainError {
    OrderNotFound { order_id: String },
    /// Both writers lost: the row left the expected state but did not reach
    /// a state the orchestrator can interpret as an idempotent replay.
    ConflictingUpdate { order_id: String },
}

#[derive(Debug, Clone)]
pub enum InfrastructureError {
    Database { message: String, is_retryable: bool },
    Configuration { message: String },
}

#[derive(Debug, Clone)]
pub enum ExternalError {
    /// The money-movement gateway could not be reached or answered with a
    /// non-business failure.
    Gateway { message: String, is_retryable: bool },
    /// The secondary order-management backend failed; never fatal to a
    /// confirmation, but surfaced by other callers.
    Fulfillment { message: String, is_retryable: bool },
}

#[derive(Debug, Clone)]
pub enum ValidationError {
    MissingField { field: String },
    InvalidAmount { amount: i64, reason: String },
    InvalidField { field: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self { kind, request_id: None, context: None }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::OrderNotFound { .. } => 404,
                DomainError::ConflictingUpdate { .. } => 409,
            },
            AppErrorKind::Infrastructure(_) => 500,
            AppErrorKind::External(err) => match err {
                ExternalError::Gateway { .. } => 502,
                ExternalError::Fulfillment { .. } => 502,
            },
            AppErrorKind::Validation(_) => 400,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::OrderNotFound { .. } => ErrorCode::OrderNotFound,
                DomainError::ConflictingUpdate { .. } => ErrorCode::ConflictingUpdate,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::Gateway { .. } => ErrorCode::GatewayError,
                ExternalError::Fulfillment { .. } => ErrorCode::FulfillmentError,
            },
            AppErrorKind::Validation(_) => ErrorCode::ValidationError,
        }
    }

    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::OrderNotFound { order_id } => {
                    format!("Order '{}' not found", order_id)
                }
                DomainError::ConflictingUpdate { order_id } => {
                    format!("Order '{}' was modified concurrently. Please retry", order_id)
                }
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(err) => match err {
                ExternalError::Gateway { is_retryable, .. } => {
                    if *is_retryable {
                        "Payment gateway is temporarily unavailable. Please try again".to_string()
                    } else {
                        "Payment processing failed. Please contact support".to_string()
                    }
                }
                ExternalError::Fulfillment { .. } => {
                    "Order management backend is temporarily unavailable".to_string()
                }
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::MissingField { field } => {
                    format!("Required field '{}' is missing", field)
                }
                ValidationError::InvalidAmount { amount, reason } => {
                    format!("Invalid amount '{}': {}", amount, reason)
                }
                ValidationError::InvalidField { field, reason } => {
                    format!("Invalid value for '{}': {}", field, reason)
                }
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(err) => {
                matches!(err, DomainError::ConflictingUpdate { .. })
            }
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::Gateway { is_retryable, .. } => *is_retryable,
                ExternalError::Fulfillment { is_retryable, .. } => *is_retryable,
            },
            AppErrorKind::Validation(_) => false,
        }
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::MissingField {
            field: field.to_string(),
        }))
    }

    pub fn conflicting_update(order_id: &str) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::ConflictingUpdate {
            order_id: order_id.to_string(),
        }))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        let is_retryable = err.is_retryable();
        AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
            message: err.to_string(),
            is_retryable,
        }))
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let is_retryable = err.is_retryable();
        AppError::new(AppErrorKind::External(ExternalError::Gateway {
            message: err.to_string(),
            is_retryable,
        }))
    }
}

pub type AppResult<T> = Result<T, AppError>;
