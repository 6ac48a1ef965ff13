//! Named permissions derived from policy checks.
//!
//! Each permission is a `(object, action)` pair evaluated by the policy
//! engine. The resulting [`Permissions`] set drives menu visibility and the
//! write/create affordances of the participant editors.

use serde::Serialize;

use crate::participant::ParticipantType;

pub const ACTION_READ: &str = "read";
pub const ACTION_WRITE: &str = "write";
pub const ACTION_CREATE: &str = "create";

pub const OBJECT_USERS: &str = "users";
pub const OBJECT_ROLES: &str = "roles";
pub const OBJECT_ORG_UNITS: &str = "org_units";
/// Application settings shown on the debug page.
pub const OBJECT_SETTINGS: &str = "settings";

/// Permission name and the `(object, action)` it is checked against.
pub const PERMISSION_CHECKS: &[(&str, &str, &str)] = &[
    ("read_users", OBJECT_USERS, ACTION_READ),
    ("write_users", OBJECT_USERS, ACTION_WRITE),
    ("create_users", OBJECT_USERS, ACTION_CREATE),
    ("read_roles", OBJECT_ROLES, ACTION_READ),
    ("write_roles", OBJECT_ROLES, ACTION_WRITE),
    ("create_roles", OBJECT_ROLES, ACTION_CREATE),
    ("read_orgs", OBJECT_ORG_UNITS, ACTION_READ),
    ("write_orgs", OBJECT_ORG_UNITS, ACTION_WRITE),
    ("create_orgs", OBJECT_ORG_UNITS, ACTION_CREATE),
];

/// Resolved permission flags for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub read_users: bool,
    pub write_users: bool,
    pub create_users: bool,
    pub read_roles: bool,
    pub write_roles: bool,
    pub create_roles: bool,
    pub read_orgs: bool,
    pub write_orgs: bool,
    pub create_orgs: bool,
}

impl Permissions {
    /// Set a flag by its permission name. Unknown names are ignored.
    pub fn set(&mut self, name: &str, granted: bool) {
        let slot = match name {
            "read_users" => &mut self.read_users,
            "write_users" => &mut self.write_users,
            "create_users" => &mut self.create_users,
            "read_roles" => &mut self.read_roles,
            "write_roles" => &mut self.write_roles,
            "create_roles" => &mut self.create_roles,
            "read_orgs" => &mut self.read_orgs,
            "write_orgs" => &mut self.write_orgs,
            "create_orgs" => &mut self.create_orgs,
            _ => return,
        };
        *slot = granted;
    }

    pub fn can_read(&self, participant_type: ParticipantType) -> bool {
        match participant_type {
            ParticipantType::Human => self.read_users,
            ParticipantType::Role => self.read_roles,
            ParticipantType::OrgUnit => self.read_orgs,
            ParticipantType::System => false,
        }
    }

    pub fn can_write(&self, participant_type: ParticipantType) -> bool {
        match participant_type {
            ParticipantType::Human => self.write_users,
            ParticipantType::Role => self.write_roles,
            ParticipantType::OrgUnit => self.write_orgs,
            ParticipantType::System => false,
        }
    }

    pub fn can_create(&self, participant_type: ParticipantType) -> bool {
        match participant_type {
            ParticipantType::Human => self.create_users,
            ParticipantType::Role => self.create_roles,
            ParticipantType::OrgUnit => self.create_orgs,
            ParticipantType::System => false,
        }
    }
}
