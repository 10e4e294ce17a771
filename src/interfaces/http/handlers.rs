use super::AppState;
use super::response::ApiError;
use crate::domain::event::{Department, Event};
use crate::domain::payment::{Amount, Currency, PaymentOrder, PaymentProof};
use crate::domain::registration::{RegistrationRequest, deserialize_team_size};
use crate::error::{ErrorKind, RegistrationError};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const LIVENESS_MESSAGE: &str = "Festival registration server is running!";

/// Either a raw amount or an event/team pair priced from the catalog.
///
/// A body naming `eventId` is always read as an event order; it never falls
/// back to the raw amount when the event fields are malformed.
pub enum CreateOrderPayload {
    ForEvent {
        event_id: String,
        team_size: u32,
        currency: Option<String>,
    },
    Direct {
        amount: i64,
        currency: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventOrderBody {
    event_id: String,
    #[serde(deserialize_with = "deserialize_team_size")]
    team_size: u32,
    currency: Option<String>,
}

#[derive(Deserialize)]
struct DirectOrderBody {
    amount: i64,
    currency: Option<String>,
}

impl<'de> Deserialize<'de> for CreateOrderPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let body = Value::deserialize(deserializer)?;
        if body.get("eventId").is_some() {
            let order = EventOrderBody::deserialize(body).map_err(de::Error::custom)?;
            Ok(Self::ForEvent {
                event_id: order.event_id,
                team_size: order.team_size,
                currency: order.currency,
            })
        } else {
            let order = DirectOrderBody::deserialize(body).map_err(de::Error::custom)?;
            Ok(Self::Direct {
                amount: order.amount,
                currency: order.currency,
            })
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub success: bool,
    #[serde(flatten)]
    pub order: PaymentOrder,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registered {
    pub success: bool,
    pub registration_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_fee: Decimal,
}

#[derive(Serialize)]
pub struct VerificationOutcome {
    pub success: bool,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

fn parse_currency(currency: Option<String>) -> Result<Currency, RegistrationError> {
    currency.map_or_else(|| Ok(Currency::default()), |c| c.parse())
}

pub async fn health() -> &'static str {
    LIVENESS_MESSAGE
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateOrderPayload>, JsonRejection>,
) -> Result<Json<OrderCreated>, ApiError> {
    let Json(payload) = payload?;
    let order = match payload {
        CreateOrderPayload::ForEvent {
            event_id,
            team_size,
            currency,
        } => {
            let currency = parse_currency(currency)?;
            state
                .orders
                .create_order_for_event(&state.catalog, &event_id, team_size, currency)
                .await?
        }
        CreateOrderPayload::Direct { amount, currency } => {
            let amount = u64::try_from(amount)
                .map_err(|_| {
                    RegistrationError::ValidationError(
                        "Amount must be a positive integer".to_string(),
                    )
                })
                .and_then(Amount::new)?;
            let currency = parse_currency(currency)?;
            state.orders.create_order(amount, currency).await?
        }
    };
    Ok(Json(OrderCreated {
        success: true,
        order,
    }))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<Registered>, ApiError> {
    let Json(request) = payload?;
    let ack = state.pipeline.run(request).await?;
    Ok(Json(Registered {
        success: true,
        registration_id: ack.registration_id,
        total_fee: ack.total_fee,
    }))
}

pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PaymentProof>, JsonRejection>,
) -> Response {
    let proof = match payload {
        Ok(Json(proof)) => proof,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    match state.pipeline.verifier().verify(&proof) {
        Ok(_) => Json(VerificationOutcome {
            success: true,
            verified: true,
            error: None,
            kind: None,
        })
        .into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(VerificationOutcome {
                success: false,
                verified: false,
                kind: Some(e.kind()),
                error: Some(e.to_string()),
            }),
        )
            .into_response(),
    }
}

pub async fn list_events(State(state): State<Arc<AppState>>) -> Json<Vec<Event>> {
    Json(state.catalog.events().cloned().collect())
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    state
        .catalog
        .get(&event_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError(RegistrationError::NotFound(format!("Unknown event: {event_id}"))))
}

pub async fn list_departments(State(state): State<Arc<AppState>>) -> Json<Vec<Department>> {
    Json(state.catalog.departments().to_vec())
}

pub async fn department_events(
    State(state): State<Arc<AppState>>,
    Path(department_id): Path<String>,
) -> Json<Vec<Event>> {
    Json(state.catalog.department_events(&department_id).to_vec())
}
