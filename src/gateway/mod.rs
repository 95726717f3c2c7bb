pub mod client;
pub mod error;
pub mod rest;
pub mod types;

pub use client::GatewayClient;
pub use error::{GatewayError, GatewayResult};
pub use rest::RestGatewayClient;
pub use types::{
    GatewayCancellation, GatewayConfirmRequest, GatewayConfirmation, GatewayEnvironment,
    PaymentKeyKind,
};
