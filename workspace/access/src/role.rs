use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Effective role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Analyst,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Analyst => "ANALYST",
            Role::Admin => "ADMIN",
        }
    }

    /// Parses the wire representation, case-insensitively.
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_uppercase().as_str() {
            "USER" => Some(Role::User),
            "ANALYST" => Some(Role::Analyst),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Roles above USER are only reachable through the elevation workflow.
    pub fn is_elevated(&self) -> bool {
        !matches!(self, Role::User)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated actor for the duration of one visit.
///
/// The role is a snapshot taken at login time. Approving an elevation
/// request does not rewrite live sessions; the elevated role appears at the
/// next login.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Session {
    /// Opaque bearer token.
    pub token: String,
    pub username: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Role gate used by dashboards and detail views to decide whether to
/// render or redirect.
///
/// `required = Some(role)` demands an exact role match; `required = None`
/// admits any authenticated session. No session always denies.
pub fn can_access(session: Option<&Session>, required: Option<Role>) -> bool {
    match (session, required) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(session), Some(role)) => session.role == role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> Session {
        Session {
            token: "tok".to_string(),
            username: "alice".to_string(),
            role,
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("analyst"), Some(Role::Analyst));
        assert_eq!(Role::parse(" ADMIN "), Some(Role::Admin));
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn no_session_always_denies() {
        assert!(!can_access(None, None));
        assert!(!can_access(None, Some(Role::User)));
    }

    #[test]
    fn dashboards_require_exact_role() {
        let user = session(Role::User);
        assert!(can_access(Some(&user), Some(Role::User)));
        assert!(!can_access(Some(&user), Some(Role::Analyst)));
        assert!(!can_access(Some(&user), Some(Role::Admin)));

        let admin = session(Role::Admin);
        assert!(can_access(Some(&admin), Some(Role::Admin)));
        assert!(!can_access(Some(&admin), Some(Role::User)));
    }

    #[test]
    fn detail_views_admit_any_authenticated_session() {
        for role in [Role::User, Role::Analyst, Role::Admin] {
            assert!(can_access(Some(&session(role)), None));
        }
    }
}
