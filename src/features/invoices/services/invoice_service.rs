use chrono::Utc;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result, UploadError};
use crate::features::invoices::dtos::{content_type_for, ClassifyInvoiceDto, ValidatedUpload};
use crate::features::invoices::models::Invoice;
use crate::features::invoices::repository::InvoiceRepository;
use crate::modules::storage::ObjectStore;
use crate::shared::constants::INVOICE_STATUS_UPLOADED;

/// What happens to a stored file when its metadata write fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompensationPolicy {
    /// Delete the file again so no unreferenced object remains
    #[default]
    Delete,
    /// Keep the file and log its key
    Retain,
}

impl FromStr for CompensationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(CompensationPolicy::Delete),
            "retain" => Ok(CompensationPolicy::Retain),
            other => Err(format!(
                "UPLOAD_COMPENSATION must be 'delete' or 'retain', got '{}'",
                other
            )),
        }
    }
}

impl fmt::Display for CompensationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompensationPolicy::Delete => f.write_str("delete"),
            CompensationPolicy::Retain => f.write_str("retain"),
        }
    }
}

const DEFAULT_UPLOAD_DEADLINE: Duration = Duration::from_secs(30);

/// Object store key of an uploaded invoice: `{user_id}/{invoice_id}_{file_name}`
pub fn storage_key(user_id: &str, invoice_id: Uuid, file_name: &str) -> String {
    format!("{}/{}_{}", user_id, invoice_id, file_name)
}

/// Service for invoice uploads and metadata
pub struct InvoiceService {
    store: Arc<dyn ObjectStore>,
    repository: Arc<dyn InvoiceRepository>,
    compensation: CompensationPolicy,
    deadline: Duration,
}

impl InvoiceService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        repository: Arc<dyn InvoiceRepository>,
        compensation: CompensationPolicy,
    ) -> Self {
        Self {
            store,
            repository,
            compensation,
            deadline: DEFAULT_UPLOAD_DEADLINE,
        }
    }

    /// Time budget shared by the object write and the metadata write
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Store the file, then record its metadata.
    ///
    /// A failed object write leaves nothing behind. A failed or late metadata
    /// write runs the configured compensation before the error is returned.
    /// Both writes share one deadline; running out of it is an error, never a
    /// silent drop of the remaining steps.
    pub async fn upload(&self, upload: ValidatedUpload) -> std::result::Result<Invoice, UploadError> {
        let started = Instant::now();
        let invoice_id = Uuid::new_v4();
        let s3_key = storage_key(&upload.user_id, invoice_id, &upload.file_name);
        let content_type = content_type_for(&upload.file_name);
        let size = upload.content.len();

        match timeout(
            self.deadline,
            self.store.put(&s3_key, upload.content, content_type),
        )
        .await
        {
            Ok(stored) => stored?,
            Err(_) => {
                error!("Object write for {} exceeded {:?}", s3_key, self.deadline);
                // The write may have landed before it was abandoned
                if self.store.exists(&s3_key).await.unwrap_or(true) {
                    self.compensate(&s3_key).await;
                }
                return Err(UploadError::Timeout(self.deadline));
            }
        }
        debug!("Stored invoice object: key={}, size={}", s3_key, size);

        let invoice = Invoice {
            user_id: upload.user_id,
            invoice_id,
            upload_time: Utc::now(),
            original_name: upload.file_name,
            s3_key,
            status: INVOICE_STATUS_UPLOADED.to_string(),
            amount: None,
            invoice_type: None,
        };

        let remaining = self.deadline.saturating_sub(started.elapsed());
        let failure = match timeout(remaining, self.repository.insert(&invoice)).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                error!(
                    "Metadata write failed for invoice {}: {}",
                    invoice.invoice_id, e
                );
                Some(UploadError::from(e))
            }
            Err(_) => {
                error!(
                    "Metadata write for invoice {} exceeded {:?}",
                    invoice.invoice_id, self.deadline
                );
                Some(UploadError::Timeout(self.deadline))
            }
        };

        if let Some(e) = failure {
            self.compensate(&invoice.s3_key).await;
            return Err(e);
        }

        info!(
            "Invoice {} saved for user {} (key={})",
            invoice.invoice_id, invoice.user_id, invoice.s3_key
        );

        Ok(invoice)
    }

    async fn compensate(&self, s3_key: &str) {
        match self.compensation {
            CompensationPolicy::Delete => match self.store.delete(s3_key).await {
                Ok(()) => info!("Removed unreferenced object {}", s3_key),
                Err(e) => error!("Failed to remove unreferenced object {}: {}", s3_key, e),
            },
            CompensationPolicy::Retain => {
                warn!("Object {} is stored without a metadata record", s3_key)
            }
        }
    }

    /// Invoices of one user, newest first
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Invoice>> {
        Ok(self.repository.list_by_user(user_id).await?)
    }

    pub async fn get(&self, user_id: &str, invoice_id: Uuid) -> Result<Invoice> {
        self.repository
            .find(user_id, invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", invoice_id)))
    }

    pub async fn classify(
        &self,
        user_id: &str,
        invoice_id: Uuid,
        dto: ClassifyInvoiceDto,
    ) -> Result<Invoice> {
        let invoice = self
            .repository
            .classify(user_id, invoice_id, dto.amount, dto.invoice_type)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        info!(
            "Invoice {} of user {} classified as {}",
            invoice_id, user_id, dto.invoice_type
        );

        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{
        FailingInvoiceRepository, InMemoryInvoiceRepository, InMemoryObjectStore,
        SlowInvoiceRepository, SlowObjectStore,
    };

    fn upload(user_id: &str, file_name: &str, content: &[u8]) -> ValidatedUpload {
        ValidatedUpload {
            user_id: user_id.to_string(),
            file_name: file_name.to_string(),
            content: content.to_vec(),
        }
    }

    #[test]
    fn test_storage_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            storage_key("user-1", id, "bill.pdf"),
            "user-1/00000000-0000-0000-0000-000000000000_bill.pdf"
        );
    }

    #[test]
    fn test_compensation_policy_parsing() {
        assert_eq!("delete".parse::<CompensationPolicy>(), Ok(CompensationPolicy::Delete));
        assert_eq!(" Retain ".parse::<CompensationPolicy>(), Ok(CompensationPolicy::Retain));
        assert!("keep".parse::<CompensationPolicy>().is_err());
        assert_eq!(CompensationPolicy::default(), CompensationPolicy::Delete);
    }

    #[tokio::test]
    async fn test_upload_stores_object_and_record() {
        let store = Arc::new(InMemoryObjectStore::default());
        let repository = Arc::new(InMemoryInvoiceRepository::default());
        let service = InvoiceService::new(store.clone(), repository.clone(), CompensationPolicy::Delete);

        let invoice = service.upload(upload("u1", "scan.png", b"\x89PNG")).await.unwrap();

        assert_eq!(invoice.status, INVOICE_STATUS_UPLOADED);
        assert_eq!(store.object(&invoice.s3_key), Some(b"\x89PNG".to_vec()));
        assert_eq!(store.content_type(&invoice.s3_key).as_deref(), Some("image/png"));
        assert_eq!(repository.records(), vec![invoice]);
    }

    #[tokio::test]
    async fn test_object_failure_writes_no_record() {
        let store = Arc::new(InMemoryObjectStore::failing());
        let repository = Arc::new(InMemoryInvoiceRepository::default());
        let service = InvoiceService::new(store.clone(), repository.clone(), CompensationPolicy::Delete);

        let result = service.upload(upload("u1", "a.pdf", b"x")).await;

        assert!(matches!(result, Err(UploadError::Storage(_))));
        assert!(repository.records().is_empty());
    }

    #[tokio::test]
    async fn test_retain_policy_leaves_unreferenced_object() {
        let store = Arc::new(InMemoryObjectStore::default());
        let service = InvoiceService::new(
            store.clone(),
            Arc::new(FailingInvoiceRepository),
            CompensationPolicy::Retain,
        );

        let result = service.upload(upload("u1", "a.pdf", b"bytes")).await;

        assert!(matches!(result, Err(UploadError::Metadata(_))));
        let keys = store.keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("u1/"));
        // Still readable through the store by its derived key
        assert!(store.exists(&keys[0]).await.unwrap());
        assert_eq!(store.object(&keys[0]), Some(b"bytes".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_policy_removes_object() {
        let store = Arc::new(InMemoryObjectStore::default());
        let service = InvoiceService::new(
            store.clone(),
            Arc::new(FailingInvoiceRepository),
            CompensationPolicy::Delete,
        );

        let result = service.upload(upload("u1", "a.pdf", b"bytes")).await;

        assert!(matches!(result, Err(UploadError::Metadata(_))));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_delete_policy_keeps_other_objects() {
        let store = Arc::new(InMemoryObjectStore::default());
        let repository = Arc::new(InMemoryInvoiceRepository::default());
        let ok = InvoiceService::new(store.clone(), repository, CompensationPolicy::Delete);
        let stored = ok.upload(upload("u1", "kept.pdf", b"kept")).await.unwrap();

        let failing = InvoiceService::new(
            store.clone(),
            Arc::new(FailingInvoiceRepository),
            CompensationPolicy::Delete,
        );
        assert!(failing.upload(upload("u1", "lost.pdf", b"lost")).await.is_err());

        assert!(store.exists(&stored.s3_key).await.unwrap());
        assert_eq!(store.keys(), vec![stored.s3_key]);
    }

    #[tokio::test]
    async fn test_late_metadata_write_is_compensated() {
        let store = Arc::new(InMemoryObjectStore::default());
        let service = InvoiceService::new(
            store.clone(),
            Arc::new(SlowInvoiceRepository::new(Duration::from_secs(5))),
            CompensationPolicy::Delete,
        )
        .with_deadline(Duration::from_millis(100));

        let result = service.upload(upload("u1", "a.pdf", b"bytes")).await;

        assert!(matches!(result, Err(UploadError::Timeout(_))));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_late_metadata_write_with_retain_keeps_object() {
        let store = Arc::new(InMemoryObjectStore::default());
        let service = InvoiceService::new(
            store.clone(),
            Arc::new(SlowInvoiceRepository::new(Duration::from_secs(5))),
            CompensationPolicy::Retain,
        )
        .with_deadline(Duration::from_millis(100));

        assert!(service.upload(upload("u1", "a.pdf", b"bytes")).await.is_err());
        assert_eq!(store.keys().len(), 1);
    }

    #[tokio::test]
    async fn test_late_object_write_writes_no_record() {
        let store = Arc::new(SlowObjectStore::new(Duration::from_secs(5)));
        let repository = Arc::new(InMemoryInvoiceRepository::default());
        let service = InvoiceService::new(store.clone(), repository.clone(), CompensationPolicy::Delete)
            .with_deadline(Duration::from_millis(100));

        let result = service.upload(upload("u1", "a.pdf", b"bytes")).await;

        assert!(matches!(result, Err(UploadError::Timeout(_))));
        assert!(repository.records().is_empty());
        assert!(store.inner.keys().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_invoice_is_not_found() {
        let service = InvoiceService::new(
            Arc::new(InMemoryObjectStore::default()),
            Arc::new(InMemoryInvoiceRepository::default()),
            CompensationPolicy::Delete,
        );

        let result = service.get("u1", Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
