//! Domain types and the ports the application layer talks through.
//!
//! Nothing in here performs I/O except [`event::EventCatalog::load`]; stores
//! and the payment gateway are reached through the traits in [`ports`].

pub mod event;
pub mod payment;
pub mod ports;
pub mod registration;
pub mod signature;
