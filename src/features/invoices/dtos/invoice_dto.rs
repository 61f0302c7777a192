use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::features::invoices::models::{Invoice, InvoiceType};

/// Invoice metadata record as exposed over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDto {
    pub user_id: String,
    pub invoice_id: Uuid,
    pub upload_time: DateTime<Utc>,
    pub original_name: String,
    /// Object store key of the uploaded file
    pub s3_key: String,
    /// `UPLOADED` or `CLASSIFIED`
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub invoice_type: Option<String>,
}

impl From<Invoice> for InvoiceDto {
    fn from(invoice: Invoice) -> Self {
        Self {
            user_id: invoice.user_id,
            invoice_id: invoice.invoice_id,
            upload_time: invoice.upload_time,
            original_name: invoice.original_name,
            s3_key: invoice.s3_key,
            status: invoice.status,
            amount: invoice.amount,
            invoice_type: invoice.invoice_type,
        }
    }
}

/// Digits after the decimal point kept by the `amount` column (`NUMERIC(14,2)`)
const AMOUNT_SCALE: u32 = 2;
/// Amounts must stay below 10^12 to fit the column
const AMOUNT_LIMIT: i64 = 1_000_000_000_000;

/// Accountant classification of an invoice
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct ClassifyInvoiceDto {
    #[validate(custom(function = "validate_amount"))]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
}

fn amount_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(amount_error("non_negative", "Amount must not be negative"));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(amount_error("scale", "Amount allows at most 2 decimal places"));
    }
    if *amount >= Decimal::from(AMOUNT_LIMIT) {
        return Err(amount_error("range", "Amount must be below 1000000000000"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_negative_amount_rejected() {
        let dto: ClassifyInvoiceDto =
            serde_json::from_value(json!({ "amount": -1.5, "type": "EXPENSE" })).unwrap();
        assert!(dto.validate().is_err());

        let dto: ClassifyInvoiceDto =
            serde_json::from_value(json!({ "amount": 0, "type": "INCOME" })).unwrap();
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_amount_must_fit_the_column() {
        let amount = |value: &str| value.parse::<Decimal>().unwrap();

        assert!(validate_amount(&amount("999999999999.99")).is_ok());
        assert!(validate_amount(&amount("12.50")).is_ok());
        assert!(validate_amount(&amount("12.500")).is_ok());

        let err = validate_amount(&amount("12.345")).unwrap_err();
        assert_eq!(err.code, "scale");
        let err = validate_amount(&amount("1000000000000")).unwrap_err();
        assert_eq!(err.code, "range");
    }

    #[test]
    fn test_unclassified_fields_are_omitted() {
        let dto = InvoiceDto {
            user_id: "u1".to_string(),
            invoice_id: Uuid::new_v4(),
            upload_time: Utc::now(),
            original_name: "a.pdf".to_string(),
            s3_key: "u1/x_a.pdf".to_string(),
            status: "UPLOADED".to_string(),
            amount: None,
            invoice_type: None,
        };
        let value = serde_json::to_value(&dto).unwrap();
        assert!(value.get("amount").is_none());
        assert!(value.get("type").is_none());
        assert!(value.get("s3Key").is_some());
    }
}
