use super::payment::PaymentProof;
use crate::error::{RegistrationError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A registration as submitted by the web form, payment proof included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub selected_event: String,
    #[serde(deserialize_with = "deserialize_team_size")]
    pub team_size: u32,
    pub participant_names: String,
    pub email: String,
    pub mobile: String,
    pub college: String,
    pub department: String,
    pub year_of_study: String,
    pub city: String,
    pub payment: PaymentProof,
}

/// The form posts select values as strings, API clients post numbers.
pub(crate) fn deserialize_team_size<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid team size: {s:?}"))),
    }
}

impl RegistrationRequest {
    /// Server-side mirror of the registration form's field rules.
    pub fn validate_fields(&self) -> Result<()> {
        min_len("selectedEvent", &self.selected_event, 1)?;
        min_len("participantNames", &self.participant_names, 2)?;
        if !is_plausible_email(&self.email) {
            return Err(invalid("email", "Please enter a valid email address"));
        }
        let mobile = self.mobile.trim();
        if !(10..=15).contains(&mobile.len()) || !mobile.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("mobile", "Mobile number should contain 10 to 15 digits"));
        }
        min_len("college", &self.college, 2)?;
        min_len("department", &self.department, 1)?;
        min_len("yearOfStudy", &self.year_of_study, 1)?;
        min_len("city", &self.city, 2)?;
        Ok(())
    }

    pub fn key(&self) -> RegistrationKey {
        RegistrationKey::new(&self.selected_event, &self.email)
    }
}

fn invalid(field: &str, message: &str) -> RegistrationError {
    RegistrationError::ValidationError(format!("{field}: {message}"))
}

fn min_len(field: &str, value: &str, min: usize) -> Result<()> {
    if value.trim().chars().count() >= min {
        Ok(())
    } else if min == 1 {
        Err(invalid(field, "is required"))
    } else {
        Err(invalid(field, &format!("must be at least {min} characters")))
    }
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Identity used by the duplicate check: one registration per email per event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationKey {
    pub event_id: String,
    pub email: String,
}

impl RegistrationKey {
    pub fn new(event_id: &str, email: &str) -> Self {
        Self {
            event_id: event_id.trim().to_string(),
            email: email.trim().to_lowercase(),
        }
    }
}

impl fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.event_id, self.email)
    }
}

/// A verified, recorded registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub event_id: String,
    pub event_name: String,
    pub team_size: u32,
    pub participant_names: String,
    pub email: String,
    pub mobile: String,
    pub college: String,
    pub department: String,
    pub year_of_study: String,
    pub city: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_fee: Decimal,
    pub order_id: String,
    pub payment_id: String,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn key(&self) -> RegistrationKey {
        RegistrationKey::new(&self.event_id, &self.email)
    }
}
