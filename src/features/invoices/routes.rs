use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::features::invoices::handlers::{
    classify_invoice, get_my_invoice, list_my_invoices, list_user_invoices, upload_invoice,
};
use crate::features::invoices::services::InvoiceService;

/// Public upload endpoint, served at `/upload` and `/api/invoices/upload`.
///
/// The upload deadline is enforced by [`InvoiceService`] so that a late
/// write still runs compensation.
pub fn upload_routes(service: Arc<InvoiceService>, max_body_size: usize) -> Router {
    Router::new()
        .route("/upload", post(upload_invoice))
        .route("/api/invoices/upload", post(upload_invoice))
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(service)
}

/// Invoice reads and classification (require JWT authentication)
pub fn routes(service: Arc<InvoiceService>) -> Router {
    Router::new()
        .route("/api/invoices", get(list_my_invoices))
        .route("/api/invoices/{invoice_id}", get(get_my_invoice))
        .route("/api/users/{user_id}/invoices", get(list_user_invoices))
        .route(
            "/api/users/{user_id}/invoices/{invoice_id}/classification",
            patch(classify_invoice),
        )
        .with_state(service)
}
