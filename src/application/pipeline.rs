use crate::domain::event::{Event, EventCatalog, compute_fee};
use crate::domain::payment::Amount;
use crate::domain::ports::RegistrationStoreBox;
use crate::domain::registration::{Registration, RegistrationRequest};
use crate::domain::signature::{PaymentVerifier, VerifiedPayment};
use crate::error::{RegistrationError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A request that has just arrived.
pub struct Received(RegistrationRequest);

/// Fields are well-formed, the event exists and the team fits it.
pub struct Validated {
    request: RegistrationRequest,
    event: Event,
    total_fee: Decimal,
    expected_amount: Amount,
}

/// No earlier registration exists for this participant and event, and the
/// payment has not funded another registration.
pub struct DuplicateChecked(Validated);

/// The payment signature matched.
pub struct PaymentVerified {
    validated: Validated,
    payment: VerifiedPayment,
}

/// Written to the store.
pub struct Recorded {
    registration: Registration,
    expected_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgment {
    pub registration_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_fee: Decimal,
}

impl Received {
    pub fn new(request: RegistrationRequest) -> Self {
        Self(request)
    }
}

impl Recorded {
    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// The fee in minor units, i.e. what the order should have charged.
    pub fn expected_amount(&self) -> Amount {
        self.expected_amount
    }

    pub fn acknowledge(self) -> Acknowledgment {
        Acknowledgment {
            registration_id: self.registration.id,
            total_fee: self.registration.total_fee,
        }
    }
}

/// Registration flow as an ordered series of gates.
///
/// `received -> validated -> duplicate-checked -> payment-verified -> recorded`.
/// Each stage consumes the previous one, so a later gate cannot run unless
/// every earlier gate passed. Any rejection ends the flow.
pub struct RegistrationPipeline {
    catalog: Arc<EventCatalog>,
    store: RegistrationStoreBox,
    verifier: PaymentVerifier,
}

impl RegistrationPipeline {
    /// # Arguments
    ///
    /// * `catalog` - Events the registrations are priced and checked against.
    /// * `store` - Where registrations are checked for duplicates and recorded.
    /// * `verifier` - Holds the gateway secret used to check payment signatures.
    pub fn new(
        catalog: Arc<EventCatalog>,
        store: RegistrationStoreBox,
        verifier: PaymentVerifier,
    ) -> Self {
        Self {
            catalog,
            store,
            verifier,
        }
    }

    pub fn verifier(&self) -> &PaymentVerifier {
        &self.verifier
    }

    pub async fn run(&self, request: RegistrationRequest) -> Result<Acknowledgment> {
        let validated = self.validate(Received::new(request))?;
        let checked = self.check_duplicate(validated).await?;
        let verified = self.verify_payment(checked)?;
        let recorded = self.record(verified).await?;

        // order amounts are not cross-checked; this line is the reconciliation trail
        let registration = recorded.registration();
        info!(
            registration_id = %registration.id,
            event_id = %registration.event_id,
            order_id = %registration.order_id,
            payment_id = %registration.payment_id,
            total_fee = %registration.total_fee,
            expected_amount = recorded.expected_amount().value(),
            "registration recorded"
        );
        Ok(recorded.acknowledge())
    }

    pub fn validate(&self, received: Received) -> Result<Validated> {
        let request = received.0;
        request.validate_fields()?;
        let event = self.catalog.require(request.selected_event.trim())?;
        let total_fee = compute_fee(event, request.team_size)?;
        let expected_amount = Amount::from_major(total_fee)?;
        debug!(event_id = %event.id, team_size = request.team_size, %total_fee, "registration validated");
        Ok(Validated {
            event: event.clone(),
            request,
            total_fee,
            expected_amount,
        })
    }

    /// Rejects a participant already registered for the event and a payment
    /// that already funded a registration.
    ///
    /// Fails closed: if the store cannot answer, the registration is refused.
    pub async fn check_duplicate(&self, validated: Validated) -> Result<DuplicateChecked> {
        let key = validated.request.key();
        let exists = self.store.exists(&key).await.map_err(|e| {
            error!(%key, error = %e, "duplicate check failed");
            unavailable()
        })?;
        if exists {
            warn!(%key, "duplicate registration rejected");
            return Err(RegistrationError::ConflictError(format!(
                "{} is already registered for {}",
                key.email, validated.event.name
            )));
        }

        let payment_id = validated.request.payment.payment_id.as_str();
        let used = self.store.payment_used(payment_id).await.map_err(|e| {
            error!(payment_id, error = %e, "payment reuse check failed");
            unavailable()
        })?;
        if used {
            warn!(payment_id, %key, "reused payment rejected");
            return Err(RegistrationError::ConflictError(format!(
                "Payment {payment_id} has already been used for a registration"
            )));
        }
        Ok(DuplicateChecked(validated))
    }

    pub fn verify_payment(&self, checked: DuplicateChecked) -> Result<PaymentVerified> {
        let validated = checked.0;
        let payment = self.verifier.verify(&validated.request.payment).inspect_err(|e| {
            warn!(
                order_id = %validated.request.payment.order_id,
                error = %e,
                "payment verification rejected"
            );
        })?;
        Ok(PaymentVerified { validated, payment })
    }

    /// No compensation exists for a failed write after a verified payment, so
    /// the failure is logged with the payment ids for manual reconciliation.
    pub async fn record(&self, verified: PaymentVerified) -> Result<Recorded> {
        let PaymentVerified { validated, payment } = verified;
        let Validated {
            request,
            event,
            total_fee,
            expected_amount,
        } = validated;

        let registration = Registration {
            id: format!("reg_{}", payment.payment_id()),
            event_id: event.id,
            event_name: event.name,
            team_size: request.team_size,
            participant_names: request.participant_names.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            mobile: request.mobile.trim().to_string(),
            college: request.college.trim().to_string(),
            department: request.department.trim().to_string(),
            year_of_study: request.year_of_study.trim().to_string(),
            city: request.city.trim().to_string(),
            total_fee,
            order_id: payment.order_id().to_string(),
            payment_id: payment.payment_id().to_string(),
            registered_at: Utc::now(),
        };

        match self.store.record(registration.clone()).await {
            Ok(()) => Ok(Recorded {
                registration,
                expected_amount,
            }),
            Err(RegistrationError::ConflictError(msg)) => {
                warn!(
                    order_id = %registration.order_id,
                    payment_id = %registration.payment_id,
                    "verified payment lost a duplicate race"
                );
                Err(RegistrationError::ConflictError(msg))
            }
            Err(e) => {
                error!(
                    order_id = %registration.order_id,
                    payment_id = %registration.payment_id,
                    error = %e,
                    "verified payment could not be recorded"
                );
                Err(RegistrationError::PersistenceError(format!(
                    "Payment {} was verified but the registration could not be saved",
                    registration.payment_id
                )))
            }
        }
    }
}

fn unavailable() -> RegistrationError {
    RegistrationError::Unavailable(
        "Could not check for an existing registration, please try again later".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::PaymentProof;
    use crate::domain::ports::RegistrationStore;
    use crate::domain::registration::RegistrationKey;
    use crate::infrastructure::in_memory::InMemoryRegistrationStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SECRET: &str = "pipeline_secret";

    /// Wraps the in-memory store and counts calls per operation.
    #[derive(Clone, Default)]
    struct CountingStore {
        inner: InMemoryRegistrationStore,
        exists_calls: Arc<AtomicUsize>,
        record_calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RegistrationStore for CountingStore {
        async fn exists(&self, key: &RegistrationKey) -> Result<bool> {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.exists(key).await
        }

        async fn payment_used(&self, payment_id: &str) -> Result<bool> {
            self.inner.payment_used(payment_id).await
        }

        async fn record(&self, registration: Registration) -> Result<()> {
            self.record_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.record(registration).await
        }

        async fn all(&self) -> Result<Vec<Registration>> {
            self.inner.all().await
        }
    }

    struct BrokenStore {
        fail_exists: bool,
        fail_payment_lookup: bool,
    }

    #[async_trait]
    impl RegistrationStore for BrokenStore {
        async fn exists(&self, _key: &RegistrationKey) -> Result<bool> {
            if self.fail_exists {
                Err(RegistrationError::PersistenceError("connection refused".to_string()))
            } else {
                Ok(false)
            }
        }

        async fn payment_used(&self, _payment_id: &str) -> Result<bool> {
            if self.fail_payment_lookup {
                Err(RegistrationError::PersistenceError("connection reset".to_string()))
            } else {
                Ok(false)
            }
        }

        async fn record(&self, _registration: Registration) -> Result<()> {
            Err(RegistrationError::PersistenceError("disk full".to_string()))
        }

        async fn all(&self) -> Result<Vec<Registration>> {
            Ok(Vec::new())
        }
    }

    fn pipeline(store: RegistrationStoreBox) -> RegistrationPipeline {
        RegistrationPipeline::new(
            Arc::new(EventCatalog::bundled().unwrap()),
            store,
            PaymentVerifier::new(SECRET),
        )
    }

    fn request(event: &str, team_size: u32, email: &str, payment_id: &str) -> RegistrationRequest {
        let order_id = format!("order_for_{payment_id}");
        let signature = PaymentVerifier::new(SECRET)
            .sign(&order_id, payment_id)
            .unwrap();
        RegistrationRequest {
            selected_event: event.to_string(),
            team_size,
            participant_names: "Asha Patil".to_string(),
            email: email.to_string(),
            mobile: "9876543210".to_string(),
            college: "ADCET".to_string(),
            department: "Civil Engineering".to_string(),
            year_of_study: "2nd Year".to_string(),
            city: "Ashta".to_string(),
            payment: PaymentProof {
                order_id,
                payment_id: payment_id.to_string(),
                signature,
            },
        }
    }

    #[tokio::test]
    async fn test_happy_path_records_fee() {
        let store = CountingStore::default();
        let pipeline = pipeline(Box::new(store.clone()));

        let ack = pipeline
            .run(request("setu", 2, "asha@example.com", "pay_1"))
            .await
            .unwrap();
        assert_eq!(ack.registration_id, "reg_pay_1");
        assert_eq!(ack.total_fee, dec!(200));

        let recorded = store.all().await.unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].event_name, "SETU");
        assert_eq!(recorded[0].total_fee, dec!(200));
        assert_eq!(recorded[0].payment_id, "pay_1");
    }

    #[tokio::test]
    async fn test_duplicate_never_reaches_recorder() {
        let store = CountingStore::default();
        let pipeline = pipeline(Box::new(store.clone()));

        pipeline
            .run(request("akruti", 1, "asha@example.com", "pay_1"))
            .await
            .unwrap();
        let second = pipeline
            .run(request("akruti", 1, "ASHA@example.com ", "pay_2"))
            .await;

        assert!(matches!(second, Err(RegistrationError::ConflictError(_))));
        assert_eq!(store.record_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_participant_other_event_allowed() {
        let store = CountingStore::default();
        let pipeline = pipeline(Box::new(store.clone()));

        pipeline
            .run(request("akruti", 1, "asha@example.com", "pay_1"))
            .await
            .unwrap();
        pipeline
            .run(request("setu", 1, "asha@example.com", "pay_2"))
            .await
            .unwrap();
        assert_eq!(store.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_verification_not_recorded() {
        let store = CountingStore::default();
        let pipeline = pipeline(Box::new(store.clone()));

        let mut tampered = request("setu", 2, "asha@example.com", "pay_1");
        tampered.payment.payment_id = "pay_other".to_string();

        let result = pipeline.run(tampered).await;
        assert!(matches!(
            result,
            Err(RegistrationError::VerificationError(_))
        ));
        assert_eq!(store.record_calls.load(Ordering::SeqCst), 0);
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_team_size_out_of_range_stops_before_store() {
        let store = CountingStore::default();
        let pipeline = pipeline(Box::new(store.clone()));

        for size in [0, 2] {
            let result = pipeline
                .run(request("cad-conqueror", size, "asha@example.com", "pay_1"))
                .await;
            assert!(matches!(result, Err(RegistrationError::ValidationError(_))));
        }
        assert_eq!(store.exists_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.record_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_event_rejected() {
        let pipeline = pipeline(Box::new(CountingStore::default()));
        let result = pipeline
            .run(request("time-travel", 1, "asha@example.com", "pay_1"))
            .await;
        assert!(matches!(result, Err(RegistrationError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_duplicate_check_fails_closed() {
        let pipeline = pipeline(Box::new(BrokenStore {
            fail_exists: true,
            fail_payment_lookup: false,
        }));
        let result = pipeline
            .run(request("setu", 1, "asha@example.com", "pay_1"))
            .await;
        assert!(matches!(result, Err(RegistrationError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_payment_lookup_failure_fails_closed() {
        let pipeline = pipeline(Box::new(BrokenStore {
            fail_exists: false,
            fail_payment_lookup: true,
        }));
        let result = pipeline
            .run(request("setu", 1, "asha@example.com", "pay_1"))
            .await;
        assert!(matches!(result, Err(RegistrationError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_payment_funds_one_registration() {
        let store = CountingStore::default();
        let pipeline = pipeline(Box::new(store.clone()));

        let first = request("setu", 2, "asha@example.com", "pay_once");
        let proof = first.payment.clone();
        pipeline.run(first).await.unwrap();

        for (event, email) in [("setu", "ravi@example.com"), ("b-plan", "asha@example.com")] {
            let mut reuse = request(event, 2, email, "pay_unused");
            reuse.payment = proof.clone();
            let result = pipeline.run(reuse).await;
            assert!(
                matches!(result, Err(RegistrationError::ConflictError(ref msg)) if msg.contains("pay_once")),
                "{event}/{email}: {result:?}"
            );
        }

        assert_eq!(store.record_calls.load(Ordering::SeqCst), 1);
        let recorded = store.all().await.unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].id, "reg_pay_once");
    }

    #[tokio::test]
    async fn test_record_failure_reports_payment_id() {
        let pipeline = pipeline(Box::new(BrokenStore {
            fail_exists: false,
            fail_payment_lookup: false,
        }));
        let result = pipeline
            .run(request("setu", 1, "asha@example.com", "pay_lost"))
            .await;
        match result {
            Err(RegistrationError::PersistenceError(msg)) => assert!(msg.contains("pay_lost")),
            other => panic!("expected persistence error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stages_can_be_driven_one_by_one() {
        let store = CountingStore::default();
        let pipeline = pipeline(Box::new(store.clone()));

        let validated = pipeline
            .validate(Received::new(request("b-plan", 2, "team@example.com", "pay_9")))
            .unwrap();
        let checked = pipeline.check_duplicate(validated).await.unwrap();
        let verified = pipeline.verify_payment(checked).unwrap();
        let recorded = pipeline.record(verified).await.unwrap();

        assert_eq!(recorded.registration().total_fee, dec!(400));
        assert_eq!(recorded.registration().order_id, "order_for_pay_9");
        assert_eq!(recorded.expected_amount().value(), 40_000);
        assert_eq!(recorded.acknowledge().registration_id, "reg_pay_9");
    }
}
