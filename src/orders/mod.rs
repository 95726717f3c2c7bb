pub mod status;
pub mod types;

pub use status::{OrderStatus, PaymentStatus};
pub use types::{
    CancelRejectReason, CancellationOutcome, CancellationRequest, ConfirmationOutcome,
    ConfirmationRequest, Order, OrderAggregate, Payment, Principal, PrincipalRole,
};
