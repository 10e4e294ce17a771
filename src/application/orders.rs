use crate::domain::event::{EventCatalog, compute_fee};
use crate::domain::payment::{Amount, Currency, NewOrder, PaymentOrder};
use crate::domain::ports::PaymentGatewayBox;
use crate::error::{RegistrationError, Result};
use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Creates payment orders with the gateway, bounded by a timeout.
///
/// There is no retry: a slow or failing gateway surfaces as `GatewayError`
/// and the client decides whether to try again.
pub struct OrderService {
    gateway: PaymentGatewayBox,
    timeout: Duration,
}

impl OrderService {
    pub fn new(gateway: PaymentGatewayBox, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    pub async fn create_order(&self, amount: Amount, currency: Currency) -> Result<PaymentOrder> {
        let order = NewOrder {
            amount,
            currency,
            receipt: format!("rcpt_{}", Utc::now().timestamp_millis()),
        };

        let created = tokio::time::timeout(self.timeout, self.gateway.create_order(order))
            .await
            .map_err(|_| {
                warn!(timeout = ?self.timeout, "payment gateway timed out");
                RegistrationError::GatewayError(format!(
                    "gateway did not respond within {}s",
                    self.timeout.as_secs_f32()
                ))
            })??;

        info!(
            order_id = %created.order_id,
            amount = created.amount.value(),
            major = %created.amount.major(),
            currency = %created.currency,
            "payment order created"
        );
        Ok(created)
    }

    /// Prices the order from the catalog instead of trusting a client amount.
    pub async fn create_order_for_event(
        &self,
        catalog: &EventCatalog,
        event_id: &str,
        team_size: u32,
        currency: Currency,
    ) -> Result<PaymentOrder> {
        let event = catalog.require(event_id)?;
        let fee = compute_fee(event, team_size)?;
        self.create_order(Amount::from_major(fee)?, currency).await
    }
}
