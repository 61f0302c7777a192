use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Database model for invoice metadata.
///
/// `(user_id, invoice_id)` is the primary key; `s3_key` references the stored blob.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Invoice {
    pub user_id: String,
    pub invoice_id: Uuid,
    pub upload_time: DateTime<Utc>,
    pub original_name: String,
    pub s3_key: String,
    pub status: String,
    pub amount: Option<Decimal>,
    pub invoice_type: Option<String>,
}

/// Classification assigned by an accountant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceType {
    Income,
    Expense,
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Income => "INCOME",
            InvoiceType::Expense => "EXPENSE",
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
