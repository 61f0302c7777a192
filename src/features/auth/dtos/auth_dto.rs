use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::auth::model::AuthenticatedUser;
use crate::shared::dashboard::DashboardView;
use crate::shared::role::Role;

/// DTO for /api/auth/me response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponseDto {
    pub user_id: String,
    pub username: Option<String>,
    pub groups: Vec<String>,
    pub role: Role,
    /// Dashboard the caller is routed to
    pub dashboard: DashboardView,
}

impl From<AuthenticatedUser> for MeResponseDto {
    fn from(user: AuthenticatedUser) -> Self {
        let role = user.role();
        Self {
            user_id: user.user_id,
            username: user.username,
            groups: user.groups,
            role,
            dashboard: DashboardView::route(false, Some(role)),
        }
    }
}
