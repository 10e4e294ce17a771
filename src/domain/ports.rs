use super::payment::{NewOrder, PaymentOrder};
use super::registration::{Registration, RegistrationKey};
use crate::error::Result;
use async_trait::async_trait;

/// Backing store for recorded registrations; also answers the duplicate
/// checks for participants and payments.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Returns whether a registration already exists for this participant
    /// and event.
    ///
    /// # Arguments
    ///
    /// * `key` - The event id and normalized email of the participant.
    async fn exists(&self, key: &RegistrationKey) -> Result<bool>;

    /// Returns whether a payment has already been consumed by a recorded
    /// registration.
    ///
    /// # Arguments
    ///
    /// * `payment_id` - The gateway's payment id.
    async fn payment_used(&self, payment_id: &str) -> Result<bool>;

    /// Stores a registration if neither its key nor its payment is taken.
    ///
    /// Both checks and the write happen atomically. A taken key or a reused
    /// payment yields `ConflictError` and nothing is written.
    ///
    /// # Arguments
    ///
    /// * `registration` - The verified registration to persist.
    async fn record(&self, registration: Registration) -> Result<()>;

    /// All recorded registrations, oldest first.
    async fn all(&self) -> Result<Vec<Registration>>;
}

/// External payment gateway issuing order handles.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates an order the client can pay against.
    ///
    /// # Arguments
    ///
    /// * `order` - Amount in minor units, currency and receipt reference.
    async fn create_order(&self, order: NewOrder) -> Result<PaymentOrder>;
}

pub type RegistrationStoreBox = Box<dyn RegistrationStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
