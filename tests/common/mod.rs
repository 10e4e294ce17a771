#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use festreg::application::orders::{DEFAULT_GATEWAY_TIMEOUT, OrderService};
use festreg::application::pipeline::RegistrationPipeline;
use festreg::domain::event::EventCatalog;
use festreg::domain::ports::{PaymentGatewayBox, RegistrationStoreBox};
use festreg::domain::signature::PaymentVerifier;
use festreg::infrastructure::in_memory::{InMemoryPaymentGateway, InMemoryRegistrationStore};
use festreg::interfaces::http::{AppState, router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

pub const SECRET: &str = "integration_test_secret";

pub fn app_with(store: RegistrationStoreBox, gateway: PaymentGatewayBox) -> Router {
    let catalog = Arc::new(EventCatalog::bundled().unwrap());
    let state = Arc::new(AppState {
        catalog: Arc::clone(&catalog),
        pipeline: RegistrationPipeline::new(catalog, store, PaymentVerifier::new(SECRET)),
        orders: OrderService::new(gateway, DEFAULT_GATEWAY_TIMEOUT),
    });
    router(state)
}

/// Router over an in-memory store; the returned store shares its contents.
pub fn app() -> (Router, InMemoryRegistrationStore) {
    let store = InMemoryRegistrationStore::new();
    let app = app_with(
        Box::new(store.clone()),
        Box::new(InMemoryPaymentGateway::new()),
    );
    (app, store)
}

pub fn sign(order_id: &str, payment_id: &str) -> String {
    PaymentVerifier::new(SECRET).sign(order_id, payment_id).unwrap()
}

pub fn registration_body(event: &str, team_size: u32, email: &str, payment_id: &str) -> Value {
    let order_id = format!("order_{payment_id}");
    json!({
        "selectedEvent": event,
        "teamSize": team_size.to_string(),
        "participantNames": "Asha Patil, Ravi Kumar",
        "email": email,
        "mobile": "9876543210",
        "college": "Annasaheb Dange College of Engineering",
        "department": "Civil Engineering",
        "yearOfStudy": "3rd Year",
        "city": "Ashta",
        "payment": {
            "orderId": order_id,
            "paymentId": payment_id,
            "signature": sign(&order_id, payment_id),
        }
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

pub async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    post_raw(app, uri, &body.to_string()).await
}

pub async fn post_raw(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = get(app, uri).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}
