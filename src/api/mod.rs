pub mod orders;

pub use orders::{router, ApiState};
