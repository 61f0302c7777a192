use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::features::invoices::models::{Invoice, InvoiceType};
use crate::shared::constants::INVOICE_STATUS_CLASSIFIED;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Invoice {invoice_id} already exists for user {user_id}")]
    Conflict { user_id: String, invoice_id: Uuid },

    #[error("Metadata table unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                RepositoryError::Unavailable(e.to_string())
            }
            other => RepositoryError::Database(other),
        }
    }
}

/// Metadata table keyed by `(user_id, invoice_id)`
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Insert a new record; an existing key is a conflict, never an overwrite
    async fn insert(&self, invoice: &Invoice) -> Result<(), RepositoryError>;

    async fn find(&self, user_id: &str, invoice_id: Uuid)
        -> Result<Option<Invoice>, RepositoryError>;

    /// All records of one user, newest upload first
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Invoice>, RepositoryError>;

    /// Set amount and type; returns `None` when the record does not exist
    async fn classify(
        &self,
        user_id: &str,
        invoice_id: Uuid,
        amount: Decimal,
        invoice_type: InvoiceType,
    ) -> Result<Option<Invoice>, RepositoryError>;
}

pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn insert(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO invoices (user_id, invoice_id, upload_time, original_name, s3_key, status, amount, invoice_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&invoice.user_id)
        .bind(invoice.invoice_id)
        .bind(invoice.upload_time)
        .bind(&invoice.original_name)
        .bind(&invoice.s3_key)
        .bind(&invoice.status)
        .bind(invoice.amount)
        .bind(&invoice.invoice_type)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(RepositoryError::Conflict {
                    user_id: invoice.user_id.clone(),
                    invoice_id: invoice.invoice_id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find(
        &self,
        user_id: &str,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, RepositoryError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT user_id, invoice_id, upload_time, original_name, s3_key, status, amount, invoice_type
            FROM invoices
            WHERE user_id = $1 AND invoice_id = $2
            "#,
        )
        .bind(user_id)
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Invoice>, RepositoryError> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT user_id, invoice_id, upload_time, original_name, s3_key, status, amount, invoice_type
            FROM invoices
            WHERE user_id = $1
            ORDER BY upload_time DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    async fn classify(
        &self,
        user_id: &str,
        invoice_id: Uuid,
        amount: Decimal,
        invoice_type: InvoiceType,
    ) -> Result<Option<Invoice>, RepositoryError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET amount = $3, invoice_type = $4, status = $5
            WHERE user_id = $1 AND invoice_id = $2
            RETURNING user_id, invoice_id, upload_time, original_name, s3_key, status, amount, invoice_type
            "#,
        )
        .bind(user_id)
        .bind(invoice_id)
        .bind(amount)
        .bind(invoice_type.as_str())
        .bind(INVOICE_STATUS_CLASSIFIED)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            RepositoryError::from(sqlx::Error::PoolTimedOut),
            RepositoryError::Unavailable(_)
        ));
        assert!(matches!(
            RepositoryError::from(sqlx::Error::RowNotFound),
            RepositoryError::Database(_)
        ));
    }
}
