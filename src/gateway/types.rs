//! Gateway-facing request/response types and payment-key shape rules.
//!
//! The gateway issues two families of tokens: captured-payment keys
//! (`pay_…` live, `tpay_…` test) handed out once a charge is captured, and
//! checkout-session identifiers (`cs_…` / `tcs_…`) that exist while the
//! hosted payment form is still open. A session identifier must never be
//! accepted as proof of payment; the token's shape is the only signal
//! available at this layer to tell "user abandoned the widget" from
//! "user paid".

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GatewayEnvironment {
    Test,
    Live,
}

impl GatewayEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayEnvironment::Test => "test",
            GatewayEnvironment::Live => "live",
        }
    }
}

impl fmt::Display for GatewayEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GatewayEnvironment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "test" => Ok(GatewayEnvironment::Test),
            "live" | "production" => Ok(GatewayEnvironment::Live),
            other => Err(format!("unknown gateway environment: {}", other)),
        }
    }
}

fn captured_live_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^pay_[A-Za-z0-9]{8,64}$").expect("valid regex"))
}

fn captured_test_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^tpay_[A-Za-z0-9]{8,64}$").expect("valid regex"))
}

fn session_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^t?cs_[A-Za-z0-9]{8,64}$").expect("valid regex"))
}

/// Structural classification of a client-submitted payment key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentKeyKind {
    /// A captured-payment key valid for the active environment.
    CapturedPayment,
    /// An unfinished checkout-session identifier (either environment).
    CheckoutSession,
    /// Neither shape, or a captured key for the wrong environment.
    Unrecognized,
}

impl PaymentKeyKind {
    pub fn classify(key: &str, env: GatewayEnvironment) -> Self {
        if session_re().is_match(key) {
            return PaymentKeyKind::CheckoutSession;
        }
        let captured = match env {
            GatewayEnvironment::Live => captured_live_re(),
            GatewayEnvironment::Test => captured_test_re(),
        };
        if captured.is_match(key) {
            PaymentKeyKind::CapturedPayment
        } else {
            PaymentKeyKind::Unrecognized
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayConfirmRequest {
    pub payment_key: String,
    pub order_id: String,
    /// Minor currency units.
    pub amount: i64,
}

/// Successful capture as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfirmation {
    pub payment_key: String,
    /// Payment method label reported by the gateway, e.g. "card".
    pub method: Option<String>,
    /// The gateway's raw response body, passed through to the secondary
    /// backend untouched.
    pub raw: JsonValue,
}

/// Successful reversal as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCancellation {
    pub payment_key: String,
    pub raw: JsonValue,
}
