//! Role-based authorization guards.
//!
//! Role hierarchy (from highest to lowest):
//! - ADMIN: manages users, sees every dashboard
//! - CPA: accountant, reads and classifies clients' invoices
//! - CLIENT: uploads and reads their own invoices
//!
//! Each higher role includes all permissions of lower roles.

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use axum::{extract::FromRequestParts, http::request::Parts};

fn authenticated(parts: &Parts) -> Result<&AuthenticatedUser, AppError> {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))
}

/// Guard for accountant-level access (CPA or ADMIN).
///
/// Use this for reading and classifying other users' invoices.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireAccountant(user): RequireAccountant) { ... }
/// ```
pub struct RequireAccountant(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAccountant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;

        if !user.has_accountant_access() {
            return Err(AppError::Forbidden("Accountant access required".to_string()));
        }

        Ok(RequireAccountant(user.clone()))
    }
}
