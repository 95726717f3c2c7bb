pub mod cancellation;
pub mod confirmation;
pub mod fulfillment;
pub mod notification;

pub use cancellation::CancellationService;
pub use confirmation::ConfirmationService;
pub use fulfillment::{
    FulfillmentClient, FulfillmentError, FulfillmentUpdate, RestFulfillmentClient, SyncOutcome,
};
pub use notification::NotificationService;
