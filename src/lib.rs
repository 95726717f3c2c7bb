//! Order-payment confirmation and cancellation orchestrator.
//!
//! Coordinates a payment gateway, the authoritative Postgres order store and
//! a secondary fulfillment backend through two sagas: payment confirmation
//! and order cancellation. Handlers live in `api`, the saga logic in
//! `services`, and every local state change goes through the conditional
//! transitions in `database`.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod orders;
pub mod services;
