//! Registration and payment-verification backend for a college technical
//! festival.
//!
//! A registration passes through an ordered set of gates before it is
//! recorded: field and team-size validation against the event catalog, a
//! duplicate check, and verification of the payment gateway's signature.
//! Payment orders are created with the gateway ahead of time and priced with
//! the same fee function the registration gate uses.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
