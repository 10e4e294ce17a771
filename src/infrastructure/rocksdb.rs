use crate::domain::ports::RegistrationStore;
use crate::domain::registration::{Registration, RegistrationKey};
use crate::error::{RegistrationError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family holding one JSON document per registration.
pub const CF_REGISTRATIONS: &str = "registrations";
/// Column Family mapping each consumed payment id to its registration key.
pub const CF_PAYMENTS: &str = "payments";

/// A persistent registration store backed by RocksDB.
///
/// Registration keys are `event_id/email`; payment keys are the gateway's
/// payment id. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    // serializes the exists-then-put in `record`
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "registrations" and "payments" column families exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_REGISTRATIONS, Options::default()),
            ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default()),
        ];
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            RegistrationError::PersistenceError(format!("Column family {name} not found"))
        })
    }
}

#[async_trait]
impl RegistrationStore for RocksDBStore {
    async fn exists(&self, key: &RegistrationKey) -> Result<bool> {
        let cf = self.cf(CF_REGISTRATIONS)?;
        Ok(self.db.get_pinned_cf(cf, key.to_string())?.is_some())
    }

    async fn payment_used(&self, payment_id: &str) -> Result<bool> {
        let cf = self.cf(CF_PAYMENTS)?;
        Ok(self.db.get_pinned_cf(cf, payment_id)?.is_some())
    }

    async fn record(&self, registration: Registration) -> Result<()> {
        let key = registration.key().to_string();
        let value = serde_json::to_vec(&registration).map_err(|e| {
            RegistrationError::PersistenceError(format!("Serialization error: {e}"))
        })?;

        let _guard = self.write_lock.lock().await;
        let registrations = self.cf(CF_REGISTRATIONS)?;
        let payments = self.cf(CF_PAYMENTS)?;
        if self
            .db
            .get_pinned_cf(payments, &registration.payment_id)?
            .is_some()
        {
            return Err(RegistrationError::ConflictError(format!(
                "Payment {} has already been used for a registration",
                registration.payment_id
            )));
        }
        if self.db.get_pinned_cf(registrations, &key)?.is_some() {
            return Err(RegistrationError::ConflictError(format!(
                "{key} is already registered"
            )));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(registrations, &key, value);
        batch.put_cf(payments, &registration.payment_id, &key);
        self.db.write(batch)?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Registration>> {
        let cf = self.cf(CF_REGISTRATIONS)?;
        let mut registrations = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let registration: Registration = serde_json::from_slice(&value).map_err(|e| {
                RegistrationError::PersistenceError(format!(
                    "Failed to deserialize registration: {e}"
                ))
            })?;
            registrations.push(registration);
        }
        registrations.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        Ok(registrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn registration(email: &str, payment_id: &str) -> Registration {
        Registration {
            id: format!("reg_{payment_id}"),
            event_id: "setu".to_string(),
            event_name: "SETU".to_string(),
            team_size: 2,
            participant_names: "Asha, Ravi".to_string(),
            email: email.to_string(),
            mobile: "9876543210".to_string(),
            college: "ADCET".to_string(),
            department: "Civil Engineering".to_string(),
            year_of_study: "3rd Year".to_string(),
            city: "Ashta".to_string(),
            total_fee: dec!(200),
            order_id: "order_1".to_string(),
            payment_id: payment_id.to_string(),
            registered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_registrations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registration("asha@example.com", "pay_1");

        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            store.record(reg.clone()).await.unwrap();
        }

        let store = RocksDBStore::open(dir.path()).unwrap();
        assert!(store.exists(&reg.key()).await.unwrap());
        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].total_fee, dec!(200));
        assert_eq!(all[0].payment_id, "pay_1");
    }

    #[tokio::test]
    async fn test_record_rejects_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        store.record(registration("asha@example.com", "pay_1")).await.unwrap();
        let again = store.record(registration("asha@example.com", "pay_2")).await;
        assert!(matches!(again, Err(RegistrationError::ConflictError(_))));
        // the losing payment stays unused
        assert!(!store.payment_used("pay_2").await.unwrap());
        let again = store.record(registration("asha@example.com", "pay_1")).await;
        assert!(matches!(again, Err(RegistrationError::ConflictError(_))));
    }

    #[tokio::test]
    async fn test_record_rejects_reused_payment() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            store.record(registration("asha@example.com", "pay_1")).await.unwrap();
        }

        let store = RocksDBStore::open(dir.path()).unwrap();
        assert!(store.payment_used("pay_1").await.unwrap());
        assert!(!store.payment_used("pay_2").await.unwrap());

        let reuse = registration("ravi@example.com", "pay_1");
        let key = reuse.key();
        let result = store.record(reuse).await;
        assert!(matches!(result, Err(RegistrationError::ConflictError(_))));
        assert!(!store.exists(&key).await.unwrap());

        store.record(registration("ravi@example.com", "pay_2")).await.unwrap();
        assert_eq!(store.all().await.unwrap().len(), 2);
    }
}
