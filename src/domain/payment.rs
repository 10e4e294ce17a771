use crate::error::{RegistrationError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A positive monetary amount in the smallest currency unit (paise for INR).
///
/// The gateway only accepts integral minor units, so fees computed in major
/// units go through [`Amount::from_major`] before an order is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Amount(u64);

impl Amount {
    pub fn new(minor_units: u64) -> Result<Self> {
        if minor_units > 0 {
            Ok(Self(minor_units))
        } else {
            Err(RegistrationError::ValidationError(
                "Amount must be a positive integer".to_string(),
            ))
        }
    }

    /// Converts a major-unit fee (rupees) into minor units.
    pub fn from_major(major: Decimal) -> Result<Self> {
        let minor = major * Decimal::ONE_HUNDRED;
        if !minor.fract().is_zero() {
            return Err(RegistrationError::ValidationError(format!(
                "Amount {major} has fractional minor units"
            )));
        }
        let minor = minor.to_u64().ok_or_else(|| {
            RegistrationError::ValidationError(format!("Amount {major} is out of range"))
        })?;
        Self::new(minor)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn major(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::ONE_HUNDRED
    }
}

impl TryFrom<u64> for Amount {
    type Error = RegistrationError;

    fn try_from(value: u64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// ISO-4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn inr() -> Self {
        Self("INR".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::inr()
    }
}

impl FromStr for Currency {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_ascii_uppercase();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(RegistrationError::ValidationError(format!(
                "Invalid currency code: {s:?}"
            )))
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = RegistrationError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Attempted,
    Paid,
}

/// What the gateway is asked to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub amount: Amount,
    pub currency: Currency,
    pub receipt: String,
}

/// Gateway-issued order handle. Never persisted; it lives for one payment attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub order_id: String,
    pub amount: Amount,
    pub currency: Currency,
    pub status: OrderStatus,
    pub receipt: Option<String>,
}

/// Client-submitted confirmation that a payment went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}
