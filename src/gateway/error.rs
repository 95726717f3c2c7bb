use crate::orders::CancelRejectReason;
use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Gateway-reported business rejection (4xx-equivalent). Never retried:
    /// no charge occurred, nothing to reconcile.
    #[error("Gateway rejected the operation: code={code}, message={message}")]
    Rejected { code: String, message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Rate limit exceeded at gateway")]
    RateLimited { retry_after_seconds: Option<u64> },

    #[error("Gateway returned an unusable response: {message}")]
    InvalidResponse { message: String },

    #[error("Gateway client misconfigured: {message}")]
    Configuration { message: String },
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Rejected { .. } => false,
            GatewayError::Network { .. } => true,
            GatewayError::RateLimited { .. } => true,
            GatewayError::InvalidResponse { .. } => false,
            GatewayError::Configuration { .. } => false,
        }
    }

    /// Map a reversal rejection to a stable local reason. Unknown provider
    /// codes collapse to `ProviderError`.
    pub fn cancel_reject_reason(&self) -> CancelRejectReason {
        match self {
            GatewayError::Rejected { code, .. } => match code.as_str() {
                "UNAUTHORIZED_KEY" | "INVALID_AUTHORIZATION" => {
                    CancelRejectReason::AuthorizationMissing
                }
                "NOT_FOUND_PAYMENT" => CancelRejectReason::NotFound,
                "ALREADY_CANCELED_PAYMENT" => CancelRejectReason::AlreadyCanceled,
                _ => CancelRejectReason::ProviderError,
            },
            _ => CancelRejectReason::ProviderError,
        }
    }
}
