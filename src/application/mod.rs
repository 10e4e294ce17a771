//! Application layer orchestrating the registration flow.
//!
//! [`pipeline::RegistrationPipeline`] runs the gated registration flow and
//! [`orders::OrderService`] wraps the payment gateway with a timeout.

pub mod orders;
pub mod pipeline;
