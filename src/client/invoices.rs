use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::client::session::SessionContext;
use crate::client::ClientError;
use crate::features::invoices::dtos::InvoiceDto;
use crate::features::invoices::models::InvoiceType;
use crate::shared::types::ApiResponse;

/// Totals shown on the client dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceSummary {
    pub count: usize,
    pub total_expenses: Decimal,
    pub total_income: Decimal,
    pub net_profit: Decimal,
    pub last_upload: Option<DateTime<Utc>>,
}

impl InvoiceSummary {
    /// Anything not typed INCOME counts as an expense; unclassified amounts are zero
    pub fn from_invoices(invoices: &[InvoiceDto]) -> Self {
        let income = InvoiceType::Income.as_str();
        let (total_income, total_expenses) =
            invoices
                .iter()
                .fold((Decimal::ZERO, Decimal::ZERO), |(income_sum, expense_sum), invoice| {
                    let amount = invoice.amount.unwrap_or(Decimal::ZERO);
                    if invoice.invoice_type.as_deref() == Some(income) {
                        (income_sum + amount, expense_sum)
                    } else {
                        (income_sum, expense_sum + amount)
                    }
                });

        Self {
            count: invoices.len(),
            total_expenses,
            total_income,
            net_profit: total_income - total_expenses,
            last_upload: invoices.iter().map(|invoice| invoice.upload_time).max(),
        }
    }
}

/// Newest upload first
pub fn sort_newest_first(invoices: &mut [InvoiceDto]) {
    invoices.sort_by(|a, b| b.upload_time.cmp(&a.upload_time));
}

/// Reads the signed-in user's invoices
pub struct InvoiceClient {
    http: reqwest::Client,
    api_url: String,
}

impl InvoiceClient {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn list(&self, session: &SessionContext) -> Result<Vec<InvoiceDto>, ClientError> {
        let token = session.access_token().await?;

        let response = self
            .http
            .get(format!("{}/api/invoices", self.api_url))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        let body: ApiResponse<Vec<InvoiceDto>> = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        if !status.is_success() || !body.success {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: body.message.unwrap_or_else(|| "Request failed".to_string()),
            });
        }

        let mut invoices = body.data.unwrap_or_default();
        sort_newest_first(&mut invoices);
        debug!("Fetched {} invoices", invoices.len());
        Ok(invoices)
    }
}
