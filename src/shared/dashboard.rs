//! Dashboard routing: which view a session is entitled to.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::role::Role;

/// View selected for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardView {
    /// Session resolution still in flight
    Waiting,
    Admin,
    Accountant,
    Client,
    /// No role, or a role this build does not know; echoes the raw value
    AccessDenied { role: Option<String> },
}

impl DashboardView {
    /// Route a resolved role.
    pub fn route(loading: bool, role: Option<Role>) -> Self {
        if loading {
            return DashboardView::Waiting;
        }
        match role {
            Some(Role::Admin) => DashboardView::Admin,
            Some(Role::Cpa) => DashboardView::Accountant,
            Some(Role::Client) => DashboardView::Client,
            None => DashboardView::AccessDenied { role: None },
        }
    }

    /// Route a raw role name, e.g. one reported by a newer server.
    pub fn route_name(loading: bool, role: Option<&str>) -> Self {
        if loading {
            return DashboardView::Waiting;
        }
        match role.map(|name| (name, name.parse::<Role>())) {
            Some((_, Ok(role))) => Self::route(false, Some(role)),
            Some((name, Err(_))) => DashboardView::AccessDenied {
                role: Some(name.to_string()),
            },
            None => DashboardView::AccessDenied { role: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_always_waits() {
        assert_eq!(DashboardView::route(true, None), DashboardView::Waiting);
        for role in [Role::Admin, Role::Cpa, Role::Client] {
            assert_eq!(DashboardView::route(true, Some(role)), DashboardView::Waiting);
        }
        assert_eq!(
            DashboardView::route_name(true, Some("AUDITOR")),
            DashboardView::Waiting
        );
    }

    #[test]
    fn test_roles_map_to_views() {
        assert_eq!(DashboardView::route(false, Some(Role::Admin)), DashboardView::Admin);
        assert_eq!(
            DashboardView::route(false, Some(Role::Cpa)),
            DashboardView::Accountant
        );
        assert_eq!(
            DashboardView::route(false, Some(Role::Client)),
            DashboardView::Client
        );
    }

    #[test]
    fn test_access_denied_only_when_settled_without_role() {
        assert_eq!(
            DashboardView::route(false, None),
            DashboardView::AccessDenied { role: None }
        );
        assert_eq!(
            DashboardView::route_name(false, Some("AUDITOR")),
            DashboardView::AccessDenied {
                role: Some("AUDITOR".to_string())
            }
        );
        assert_eq!(
            DashboardView::route_name(false, Some("CPA")),
            DashboardView::Accountant
        );
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(DashboardView::AccessDenied { role: None }).unwrap();
        assert_eq!(json, serde_json::json!({ "view": "access_denied", "role": null }));
        let json = serde_json::to_value(DashboardView::Accountant).unwrap();
        assert_eq!(json, serde_json::json!({ "view": "accountant" }));
    }
}
