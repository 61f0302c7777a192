use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::ValidatedJson;
use crate::features::auth::guards::RequireAccountant;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::invoices::dtos::{ClassifyInvoiceDto, InvoiceDto};
use crate::features::invoices::models::Invoice;
use crate::features::invoices::services::InvoiceService;
use crate::shared::types::{ApiResponse, Meta};

fn list_response(invoices: Vec<Invoice>) -> ApiResponse<Vec<InvoiceDto>> {
    let total = invoices.len() as i64;
    let data = invoices.into_iter().map(InvoiceDto::from).collect();
    ApiResponse::success(Some(data), None, Some(Meta { total }))
}

/// List the caller's invoices, newest first
#[utoipa::path(
    get,
    path = "/api/invoices",
    tag = "invoices",
    responses(
        (status = 200, description = "Invoices of the authenticated user", body = ApiResponse<Vec<InvoiceDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_my_invoices(
    user: AuthenticatedUser,
    State(service): State<Arc<InvoiceService>>,
) -> Result<Json<ApiResponse<Vec<InvoiceDto>>>> {
    let invoices = service.list_for_user(&user.user_id).await?;
    Ok(Json(list_response(invoices)))
}

/// Get one of the caller's invoices
#[utoipa::path(
    get,
    path = "/api/invoices/{invoice_id}",
    tag = "invoices",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice found", body = ApiResponse<InvoiceDto>),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Invoice not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_my_invoice(
    user: AuthenticatedUser,
    State(service): State<Arc<InvoiceService>>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<InvoiceDto>>> {
    let invoice = service.get(&user.user_id, invoice_id).await?;
    Ok(Json(ApiResponse::success(Some(invoice.into()), None, None)))
}

/// List another user's invoices (CPA or ADMIN)
#[utoipa::path(
    get,
    path = "/api/users/{user_id}/invoices",
    tag = "invoices",
    params(("user_id" = String, Path, description = "Owner of the invoices")),
    responses(
        (status = 200, description = "Invoices of the user", body = ApiResponse<Vec<InvoiceDto>>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Accountant access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_user_invoices(
    RequireAccountant(_accountant): RequireAccountant,
    State(service): State<Arc<InvoiceService>>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<InvoiceDto>>>> {
    let invoices = service.list_for_user(&user_id).await?;
    Ok(Json(list_response(invoices)))
}

/// Classify an invoice with amount and type (CPA or ADMIN)
#[utoipa::path(
    patch,
    path = "/api/users/{user_id}/invoices/{invoice_id}/classification",
    tag = "invoices",
    params(
        ("user_id" = String, Path, description = "Owner of the invoice"),
        ("invoice_id" = Uuid, Path, description = "Invoice ID")
    ),
    request_body = ClassifyInvoiceDto,
    responses(
        (status = 200, description = "Invoice classified", body = ApiResponse<InvoiceDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Accountant access required"),
        (status = 404, description = "Invoice not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn classify_invoice(
    RequireAccountant(accountant): RequireAccountant,
    State(service): State<Arc<InvoiceService>>,
    Path((user_id, invoice_id)): Path<(String, Uuid)>,
    ValidatedJson(dto): ValidatedJson<ClassifyInvoiceDto>,
) -> Result<Json<ApiResponse<InvoiceDto>>> {
    tracing::debug!(
        "Accountant {} classifying invoice {} of {}",
        accountant.user_id,
        invoice_id,
        user_id
    );

    let invoice = service.classify(&user_id, invoice_id, dto).await?;

    Ok(Json(ApiResponse::success(
        Some(invoice.into()),
        Some("Invoice classified".to_string()),
        None,
    )))
}
