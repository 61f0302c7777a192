use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;
use tracing::debug;

use crate::core::error::{UploadError, UploadErrorBody};
use crate::features::invoices::dtos::{UploadRequestDto, UploadResponseDto};
use crate::features::invoices::services::InvoiceService;

/// Upload an invoice file
///
/// Accepts the JSON object, a JSON string holding it, or a gateway envelope
/// with the object in `body`. The file is stored first, then its metadata.
/// The saga runs in its own task, so a dropped connection cannot stop it
/// between the two writes.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "invoices",
    request_body = UploadRequestDto,
    responses(
        (status = 200, description = "Invoice uploaded", body = UploadResponseDto),
        (status = 400, description = "Missing field or malformed body", body = UploadErrorBody),
        (status = 413, description = "Body too large"),
        (status = 500, description = "Storage or metadata failure, or deadline exceeded", body = UploadErrorBody)
    )
)]
pub async fn upload_invoice(
    State(service): State<Arc<InvoiceService>>,
    body: Bytes,
) -> Result<Json<UploadResponseDto>, UploadError> {
    debug!("Upload request received: {} bytes", body.len());

    let upload = UploadRequestDto::from_body(&body)?.into_upload()?;
    let invoice = tokio::spawn(async move { service.upload(upload).await })
        .await
        .map_err(|e| UploadError::Interrupted(e.to_string()))??;

    Ok(Json(UploadResponseDto::uploaded(invoice.invoice_id)))
}
