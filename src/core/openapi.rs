use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::core::error::UploadErrorBody;
use crate::features::auth;
use crate::features::invoices::{dtos as invoices_dtos, handlers as invoices_handlers, models as invoices_models};
use crate::shared::dashboard::DashboardView;
use crate::shared::role::Role;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handlers::get_me,
        // Upload (public)
        invoices_handlers::upload_invoice,
        // Invoices
        invoices_handlers::list_my_invoices,
        invoices_handlers::get_my_invoice,
        invoices_handlers::list_user_invoices,
        invoices_handlers::classify_invoice,
    ),
    components(
        schemas(
            // Shared
            Meta,
            Role,
            DashboardView,
            // Auth
            auth::dtos::MeResponseDto,
            auth::model::AuthenticatedUser,
            ApiResponse<auth::dtos::MeResponseDto>,
            // Upload
            invoices_dtos::UploadRequestDto,
            invoices_dtos::UploadResponseDto,
            UploadErrorBody,
            // Invoices
            invoices_dtos::InvoiceDto,
            invoices_dtos::ClassifyInvoiceDto,
            invoices_models::InvoiceType,
            ApiResponse<invoices_dtos::InvoiceDto>,
            ApiResponse<Vec<invoices_dtos::InvoiceDto>>,
        )
    ),
    tags(
        (name = "auth", description = "Current user, role and dashboard"),
        (name = "invoices", description = "Invoice upload, listing and classification"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "ScanBook API",
        version = "0.1.0",
        description = "API documentation for ScanBook",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_upload_and_invoice_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/upload",
            "/api/auth/me",
            "/api/invoices",
            "/api/invoices/{invoice_id}",
            "/api/users/{user_id}/invoices",
            "/api/users/{user_id}/invoices/{invoice_id}/classification",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing path {}",
                expected
            );
        }
    }
}
