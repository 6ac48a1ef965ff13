//! Well-known role and participant names.
//!
//! These must match the bootstrap data in `usermgr_db::seed` and the role
//! lines of `casbin/policy.csv`.

use std::collections::BTreeSet;

/// Participant name of the built-in system account (audit user for sync writes).
pub const SYSTEM_PARTICIPANT: &str = "SYSTEM";

/// Role every user holds. Never shown in role editors and never toggled.
pub const ROLE_PUBLIC: &str = "PUBLIC";

pub const ROLE_ADMINISTRATOR: &str = "ADMINISTRATOR";
pub const ROLE_USER_ADMINISTRATOR: &str = "USER_ADMINISTRATOR";
pub const ROLE_USER_READ: &str = "USER_READ";
pub const ROLE_USER_WRITE: &str = "USER_WRITE";
pub const ROLE_ROLE_READ: &str = "ROLE_READ";
pub const ROLE_ROLE_WRITE: &str = "ROLE_WRITE";
pub const ROLE_ORG_UNIT_READ: &str = "ORG_UNIT_READ";
pub const ROLE_ORG_UNIT_WRITE: &str = "ORG_UNIT_WRITE";

/// Roles this application understands.
pub const APP_ROLES: &[&str] = &[
    ROLE_ADMINISTRATOR,
    ROLE_USER_ADMINISTRATOR,
    ROLE_USER_READ,
    ROLE_USER_WRITE,
    ROLE_ROLE_READ,
    ROLE_ROLE_WRITE,
    ROLE_ORG_UNIT_READ,
    ROLE_ORG_UNIT_WRITE,
];

/// Keywords in an LDAP `title` that identify a manager (matched case-insensitively).
const MANAGEMENT_KEYWORDS: &[&str] = &[
    "manager",
    "director",
    "vp",
    "svp",
    "chief",
    "senior product owner",
];

/// Expand a role set with the application roles implied by `ADMINISTRATOR`.
pub fn compute_effective_app_roles<'a, I>(roles: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut effective: BTreeSet<String> = roles.into_iter().map(str::to_string).collect();
    if effective.contains(ROLE_ADMINISTRATOR) {
        effective.extend(APP_ROLES.iter().map(|r| r.to_string()));
    }
    effective
}

pub fn is_administrator<'a, I>(roles: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    roles.into_iter().any(|r| r == ROLE_ADMINISTRATOR)
}

/// Whether a job title marks its holder as a manager.
///
/// Managers unknown to the database may log in to register themselves.
pub fn user_is_manager(title: Option<&str>) -> bool {
    let Some(title) = title.filter(|t| !t.trim().is_empty()) else {
        return false;
    };
    let lower = title.to_lowercase();
    MANAGEMENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrator_implies_all_app_roles() {
        let effective = compute_effective_app_roles([ROLE_ADMINISTRATOR, ROLE_PUBLIC]);
        for role in APP_ROLES {
            assert!(effective.contains(*role), "missing {role}");
        }
        assert!(effective.contains(ROLE_PUBLIC));
    }

    #[test]
    fn non_admin_roles_are_unchanged() {
        let effective = compute_effective_app_roles([ROLE_USER_READ, ROLE_PUBLIC]);
        assert_eq!(effective.len(), 2);
        assert!(!effective.contains(ROLE_USER_WRITE));
    }

    #[test]
    fn manager_titles() {
        assert!(user_is_manager(Some("Engineering Manager")));
        assert!(user_is_manager(Some("SVP Sales")));
        assert!(user_is_manager(Some("Chief of Staff")));
        assert!(user_is_manager(Some("Senior Product Owner")));
        assert!(!user_is_manager(Some("Product Owner")));
        assert!(!user_is_manager(Some("Software Engineer")));
        assert!(!user_is_manager(Some("  ")));
        assert!(!user_is_manager(None));
    }

    #[test]
    fn administrator_detection() {
        assert!(is_administrator(["PUBLIC", "ADMINISTRATOR"]));
        assert!(!is_administrator(["PUBLIC", "USER_ADMINISTRATOR"]));
    }
}
