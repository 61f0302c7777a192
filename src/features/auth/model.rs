use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::role::Role;

/// Caller identity extracted from a validated access token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Stable user id (`sub`); partition key of the caller's invoices
    pub user_id: String,
    pub username: Option<String>,
    /// Group memberships (`cognito:groups`)
    pub groups: Vec<String>,
}

impl AuthenticatedUser {
    pub fn role(&self) -> Role {
        Role::from_groups(&self.groups)
    }

    /// CPA or ADMIN
    pub fn has_accountant_access(&self) -> bool {
        self.role().has_accountant_access()
    }
}
