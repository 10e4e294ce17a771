use crate::domain::payment::{NewOrder, OrderStatus, PaymentOrder};
use crate::domain::ports::{PaymentGateway, RegistrationStore};
use crate::domain::registration::{Registration, RegistrationKey};
use crate::error::{RegistrationError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Ledger {
    registrations: HashMap<RegistrationKey, Registration>,
    payments: HashSet<String>,
}

/// A thread-safe in-memory registration store.
///
/// Registrations and consumed payment ids live behind one `RwLock`, so the
/// two uniqueness checks in `record` see a consistent view. Clones share the
/// same state. Contents are lost when the process exits.
#[derive(Default, Clone)]
pub struct InMemoryRegistrationStore {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryRegistrationStore {
    /// Creates a new, empty in-memory registration store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn exists(&self, key: &RegistrationKey) -> Result<bool> {
        let ledger = self.ledger.read().await;
        Ok(ledger.registrations.contains_key(key))
    }

    async fn payment_used(&self, payment_id: &str) -> Result<bool> {
        let ledger = self.ledger.read().await;
        Ok(ledger.payments.contains(payment_id))
    }

    async fn record(&self, registration: Registration) -> Result<()> {
        let mut guard = self.ledger.write().await;
        let ledger = &mut *guard;
        if ledger.payments.contains(&registration.payment_id) {
            return Err(RegistrationError::ConflictError(format!(
                "Payment {} has already been used for a registration",
                registration.payment_id
            )));
        }
        match ledger.registrations.entry(registration.key()) {
            Entry::Occupied(entry) => Err(RegistrationError::ConflictError(format!(
                "{} is already registered",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                ledger.payments.insert(registration.payment_id.clone());
                entry.insert(registration);
                Ok(())
            }
        }
    }

    async fn all(&self) -> Result<Vec<Registration>> {
        let ledger = self.ledger.read().await;
        let mut all: Vec<Registration> = ledger.registrations.values().cloned().collect();
        all.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        Ok(all)
    }
}

/// Offline stand-in for the payment gateway. Issues sequential order ids.
#[derive(Default)]
pub struct InMemoryPaymentGateway {
    next_id: AtomicU64,
}

impl InMemoryPaymentGateway {
    /// Creates a gateway whose order ids start at `order_local0000000001`.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_order(&self, order: NewOrder) -> Result<PaymentOrder> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(PaymentOrder {
            order_id: format!("order_local{n:010}"),
            amount: order.amount,
            currency: order.currency,
            status: OrderStatus::Created,
            receipt: Some(order.receipt),
        })
    }
}
