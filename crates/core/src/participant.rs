//! Participant and relation enumerations plus field-level validation.
//!
//! The string spellings here are the persisted contract: they must match the
//! check constraints `participants_chk1`, `participants_chk2` and
//! `participant_relations_chk1` in every dialect's DDL.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::error::CoreError;

/* --------------------------------------------------------------------------
Column limits
-------------------------------------------------------------------------- */

pub const MAX_NAME_LEN: usize = 30;
pub const MAX_DISPLAY_NAME_LEN: usize = 60;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_EMAIL_LEN: usize = 200;
pub const MAX_EXTERNAL_REFERENCE_LEN: usize = 500;
pub const MAX_HASHED_PASSWORD_LEN: usize = 100;

/// Participant names start with a letter, then 1..=29 letters, digits, `_` or `-`.
pub const VALID_NAME_PATTERN: &str = r"^[a-zA-Z][a-zA-Z0-9_-]{1,29}$";

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(VALID_NAME_PATTERN).expect("valid regex"));

/* --------------------------------------------------------------------------
ParticipantType
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantType {
    System,
    Human,
    Role,
    OrgUnit,
}

impl ParticipantType {
    pub const ALL: [ParticipantType; 4] = [Self::System, Self::Human, Self::Role, Self::OrgUnit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::Human => "HUMAN",
            Self::Role => "ROLE",
            Self::OrgUnit => "ORG_UNIT",
        }
    }

    /// Policy object guarding this participant type, if any.
    ///
    /// `SYSTEM` participants are not managed through the policy layer.
    pub fn resource(&self) -> Option<&'static str> {
        match self {
            Self::Human => Some("users"),
            Self::Role => Some("roles"),
            Self::OrgUnit => Some("org_units"),
            Self::System => None,
        }
    }

    /// Singular label used in messages ("User ALICE already exists").
    pub fn label(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::Human => "User",
            Self::Role => "Role",
            Self::OrgUnit => "Org unit",
        }
    }
}

impl FromStr for ParticipantType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SYSTEM" => Ok(Self::System),
            "HUMAN" => Ok(Self::Human),
            "ROLE" => Ok(Self::Role),
            "ORG_UNIT" => Ok(Self::OrgUnit),
            other => Err(CoreError::Validation(format!(
                "Unknown participant type: '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for ParticipantType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for ParticipantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------------------------------------------------
ParticipantState
-------------------------------------------------------------------------- */

/// Lifecycle state. A `NULL` column is read as [`ParticipantState::Active`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantState {
    #[default]
    Active,
    Terminated,
}

impl ParticipantState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Terminated => "TERMINATED",
        }
    }

    /// Interpret a raw, possibly null, state column.
    pub fn from_column(value: Option<&str>) -> Result<Self, CoreError> {
        match value {
            None => Ok(Self::Active),
            Some(s) => s.parse(),
        }
    }
}

impl FromStr for ParticipantState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "TERMINATED" => Ok(Self::Terminated),
            other => Err(CoreError::Validation(format!(
                "Unknown participant state: '{other}'"
            ))),
        }
    }
}

impl TryFrom<Option<String>> for ParticipantState {
    type Error = CoreError;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        Self::from_column(value.as_deref())
    }
}

impl std::fmt::Display for ParticipantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------------------------------------------------
RelationType
-------------------------------------------------------------------------- */

/// Type of the edge `pati1 --type--> pati2`.
///
/// - `Grant`: a role is granted to a user or org unit.
/// - `MemberOf`: a user (or org unit) belongs to an org unit.
/// - `ProxyOf`: `pati1` may act on behalf of `pati2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    #[serde(rename = "GRANT")]
    Grant,
    #[serde(rename = "MEMBER OF")]
    MemberOf,
    #[serde(rename = "PROXY OF")]
    ProxyOf,
}

impl RelationType {
    pub const ALL: [RelationType; 3] = [Self::Grant, Self::MemberOf, Self::ProxyOf];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grant => "GRANT",
            Self::MemberOf => "MEMBER OF",
            Self::ProxyOf => "PROXY OF",
        }
    }
}

impl FromStr for RelationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GRANT" => Ok(Self::Grant),
            "MEMBER OF" => Ok(Self::MemberOf),
            "PROXY OF" => Ok(Self::ProxyOf),
            other => Err(CoreError::Validation(format!(
                "Unknown relation type: '{other}'. Valid types: GRANT, MEMBER OF, PROXY OF"
            ))),
        }
    }
}

impl TryFrom<String> for RelationType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that a relation type fits the participant types on both ends.
pub fn validate_relation(
    pati1: ParticipantType,
    relation: RelationType,
    pati2: ParticipantType,
) -> Result<(), CoreError> {
    use ParticipantType::{Human, OrgUnit, Role};

    let ok = match relation {
        RelationType::Grant => matches!(pati1, Human | OrgUnit) && pati2 == Role,
        RelationType::MemberOf => matches!(pati1, Human | OrgUnit) && pati2 == OrgUnit,
        RelationType::ProxyOf => pati1 == Human && pati2 == Human,
    };
    if ok {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "A {pati1} cannot be in a '{relation}' relation with a {pati2}"
        )))
    }
}

/* --------------------------------------------------------------------------
Field validation
-------------------------------------------------------------------------- */

/// The built-in `SYSTEM` participant keeps its state forever.
pub fn validate_state_change(name: &str) -> Result<(), CoreError> {
    if name == crate::roles::SYSTEM_PARTICIPANT {
        return Err(CoreError::Forbidden(
            "The state of the SYSTEM participant cannot be changed".to_string(),
        ));
    }
    Ok(())
}

pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Validate a participant name and return it upper-cased.
pub fn validate_name(name: &str) -> Result<String, CoreError> {
    let name = name.trim();
    if !is_valid_name(name) {
        return Err(CoreError::Validation(format!("Invalid name: {name}")));
    }
    Ok(normalize_name(name))
}

/// Names and audit user names are stored upper-cased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

pub fn validate_email(email: &str) -> Result<(), CoreError> {
    validate_max_len("email", email, MAX_EMAIL_LEN)?;
    if !email.validate_email() {
        return Err(CoreError::Validation(format!(
            "Invalid email address: {email:?}"
        )));
    }
    Ok(())
}

pub fn validate_max_len(field: &str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.chars().count() > max {
        return Err(CoreError::Validation(format!(
            "{field} must not exceed {max} characters"
        )));
    }
    Ok(())
}

pub fn validate_display_name(display_name: &str) -> Result<(), CoreError> {
    if display_name.trim().is_empty() {
        return Err(CoreError::Validation(
            "display_name must not be empty".to_string(),
        ));
    }
    validate_max_len("display_name", display_name, MAX_DISPLAY_NAME_LEN)
}
