use async_trait::async_trait;
use axum::{Extension, Router};
use fake::uuid::UUIDv4;
use fake::Fake;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::features::auth::model::AuthenticatedUser;
use crate::features::invoices::models::{Invoice, InvoiceType};
use crate::features::invoices::repository::{InvoiceRepository, RepositoryError};
use crate::modules::storage::{ObjectStore, StorageError, StorageResult};
use crate::shared::constants::INVOICE_STATUS_CLASSIFIED;

pub fn test_user(groups: &[&str]) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: UUIDv4.fake(),
        username: Some("test-user".to_string()),
        groups: groups.iter().map(|g| g.to_string()).collect(),
    }
}

/// Inject `user` as the authenticated caller of every request
pub fn with_user(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(Extension(user))
}

/// Object store backed by a map; `failing()` rejects every write
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    fail_writes: bool,
}

impl InMemoryObjectStore {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(data, _)| data.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, content_type)| content_type.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        if self.fail_writes {
            return Err(StorageError::UploadFailed {
                key: key.to_string(),
                reason: "object store unavailable".to_string(),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }
}

#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    records: Mutex<HashMap<(String, Uuid), Invoice>>,
}

impl InMemoryInvoiceRepository {
    pub fn records(&self) -> Vec<Invoice> {
        self.records.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn insert(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().unwrap();
        let key = (invoice.user_id.clone(), invoice.invoice_id);
        if records.contains_key(&key) {
            return Err(RepositoryError::Conflict {
                user_id: invoice.user_id.clone(),
                invoice_id: invoice.invoice_id,
            });
        }
        records.insert(key, invoice.clone());
        Ok(())
    }

    async fn find(
        &self,
        user_id: &str,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), invoice_id))
            .cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Invoice>, RepositoryError> {
        let mut invoices: Vec<Invoice> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|invoice| invoice.user_id == user_id)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.upload_time.cmp(&a.upload_time));
        Ok(invoices)
    }

    async fn classify(
        &self,
        user_id: &str,
        invoice_id: Uuid,
        amount: Decimal,
        invoice_type: InvoiceType,
    ) -> Result<Option<Invoice>, RepositoryError> {
        let mut records = self.records.lock().unwrap();
        Ok(records
            .get_mut(&(user_id.to_string(), invoice_id))
            .map(|invoice| {
                invoice.amount = Some(amount);
                invoice.invoice_type = Some(invoice_type.as_str().to_string());
                invoice.status = INVOICE_STATUS_CLASSIFIED.to_string();
                invoice.clone()
            }))
    }
}

/// Metadata table that is always down
pub struct FailingInvoiceRepository;

#[async_trait]
impl InvoiceRepository for FailingInvoiceRepository {
    async fn insert(&self, _invoice: &Invoice) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("table unavailable".to_string()))
    }

    async fn find(
        &self,
        _user_id: &str,
        _invoice_id: Uuid,
    ) -> Result<Option<Invoice>, RepositoryError> {
        Err(RepositoryError::Unavailable("table unavailable".to_string()))
    }

    async fn list_by_user(&self, _user_id: &str) -> Result<Vec<Invoice>, RepositoryError> {
        Err(RepositoryError::Unavailable("table unavailable".to_string()))
    }

    async fn classify(
        &self,
        _user_id: &str,
        _invoice_id: Uuid,
        _amount: Decimal,
        _invoice_type: InvoiceType,
    ) -> Result<Option<Invoice>, RepositoryError> {
        Err(RepositoryError::Unavailable("table unavailable".to_string()))
    }
}

/// Metadata table whose inserts take `delay` before landing in memory
pub struct SlowInvoiceRepository {
    pub inner: InMemoryInvoiceRepository,
    delay: Duration,
}

impl SlowInvoiceRepository {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryInvoiceRepository::default(),
            delay,
        }
    }
}

#[async_trait]
impl InvoiceRepository for SlowInvoiceRepository {
    async fn insert(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert(invoice).await
    }

    async fn find(
        &self,
        user_id: &str,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, RepositoryError> {
        self.inner.find(user_id, invoice_id).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Invoice>, RepositoryError> {
        self.inner.list_by_user(user_id).await
    }

    async fn classify(
        &self,
        user_id: &str,
        invoice_id: Uuid,
        amount: Decimal,
        invoice_type: InvoiceType,
    ) -> Result<Option<Invoice>, RepositoryError> {
        self.inner
            .classify(user_id, invoice_id, amount, invoice_type)
            .await
    }
}

/// Object store whose writes take `delay` before landing in memory
pub struct SlowObjectStore {
    pub inner: InMemoryObjectStore,
    delay: Duration,
}

impl SlowObjectStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryObjectStore::default(),
            delay,
        }
    }
}

#[async_trait]
impl ObjectStore for SlowObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(key, data, content_type).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }
}
