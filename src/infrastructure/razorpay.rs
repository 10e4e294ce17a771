use crate::domain::payment::{Amount, Currency, NewOrder, OrderStatus, PaymentOrder};
use crate::domain::ports::PaymentGateway;
use crate::error::{RegistrationError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.razorpay.com";

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: u64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    amount: u64,
    currency: String,
    status: OrderStatus,
    receipt: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Order creation against the Razorpay REST API (`POST /v1/orders`).
pub struct RazorpayGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl fmt::Debug for RazorpayGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RazorpayGateway")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl RazorpayGateway {
    /// Builds a gateway client whose every request is bounded by `timeout`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. `https://api.razorpay.com`. A trailing slash is ignored.
    /// * `key_id` - Key id used as the basic-auth user.
    /// * `key_secret` - Key secret used as the basic-auth password.
    /// * `timeout` - Upper bound for a whole request, connect included.
    pub fn new(
        base_url: &str,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistrationError::GatewayError(format!("client setup failed: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }

    fn orders_url(&self) -> String {
        format!("{}/v1/orders", self.base_url)
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(name = "razorpay_create_order", skip_all, fields(amount = order.amount.value()))]
    async fn create_order(&self, order: NewOrder) -> Result<PaymentOrder> {
        let body = CreateOrderBody {
            amount: order.amount.value(),
            currency: order.currency.as_str(),
            receipt: &order.receipt,
        };

        let response = self
            .client
            .post(self.orders_url())
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| RegistrationError::GatewayError(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .and_then(|envelope| {
                    envelope
                        .error
                        .description
                        .or(envelope.error.code)
                })
                .unwrap_or_else(|| status.to_string());
            debug!(%status, %reason, "gateway rejected order");
            return Err(RegistrationError::GatewayError(format!(
                "order rejected ({status}): {reason}"
            )));
        }

        let created: OrderResponse = response
            .json()
            .await
            .map_err(|e| RegistrationError::GatewayError(format!("unreadable response: {e}")))?;

        let amount = Amount::new(created.amount)
            .map_err(|_| RegistrationError::GatewayError("order has zero amount".to_string()))?;
        let currency: Currency = created.currency.parse().map_err(|_| {
            RegistrationError::GatewayError(format!("unknown currency {}", created.currency))
        })?;

        Ok(PaymentOrder {
            order_id: created.id,
            amount,
            currency,
            status: created.status,
            receipt: created.receipt,
        })
    }
}
