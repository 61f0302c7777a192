use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::shared::constants::{GROUP_ADMIN, GROUP_CLIENT, GROUP_CPA};

/// Coarse access level derived from identity-provider group claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Cpa,
    Client,
}

impl Role {
    /// Resolve a role from group memberships.
    ///
    /// Priority is ADMIN > CPA > CLIENT; no recognized group means CLIENT.
    pub fn from_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut role = Role::Client;
        for group in groups {
            match group.as_ref() {
                GROUP_ADMIN => return Role::Admin,
                GROUP_CPA => role = Role::Cpa,
                _ => {}
            }
        }
        role
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => GROUP_ADMIN,
            Role::Cpa => GROUP_CPA,
            Role::Client => GROUP_CLIENT,
        }
    }

    /// ADMIN and CPA may read and classify other users' invoices.
    pub fn has_accountant_access(&self) -> bool {
        matches!(self, Role::Admin | Role::Cpa)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unrecognized role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            GROUP_ADMIN => Ok(Role::Admin),
            GROUP_CPA => Ok(Role::Cpa),
            GROUP_CLIENT => Ok(Role::Client),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_wins_over_cpa() {
        assert_eq!(Role::from_groups(["ADMIN", "CPA"]), Role::Admin);
        assert_eq!(Role::from_groups(["CPA", "ADMIN"]), Role::Admin);
    }

    #[test]
    fn test_cpa_group() {
        assert_eq!(Role::from_groups(["CPA"]), Role::Cpa);
        assert_eq!(Role::from_groups(["CLIENT", "CPA"]), Role::Cpa);
    }

    #[test]
    fn test_defaults_to_client() {
        assert_eq!(Role::from_groups(Vec::<String>::new()), Role::Client);
        assert_eq!(Role::from_groups(["beta-testers"]), Role::Client);
    }

    #[test]
    fn test_group_names_are_case_sensitive() {
        assert_eq!(Role::from_groups(["admin"]), Role::Client);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("CPA".parse::<Role>().unwrap(), Role::Cpa);
        assert_eq!(Role::Admin.to_string(), "ADMIN");
        assert!("AUDITOR".parse::<Role>().is_err());
    }

    #[test]
    fn test_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Cpa).unwrap(), "\"CPA\"");
    }
}
