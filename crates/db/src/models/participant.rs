//! Participant entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use usermgr_core::error::CoreError;
use usermgr_core::participant::{
    normalize_name, validate_display_name, validate_email, validate_max_len, validate_name,
    ParticipantState, ParticipantType, RelationType, MAX_DESCRIPTION_LEN,
    MAX_EXTERNAL_REFERENCE_LEN, MAX_HASHED_PASSWORD_LEN, MAX_NAME_LEN,
};
use usermgr_core::types::{DbId, Timestamp};

/// Full row from the `participants` table.
///
/// A `NULL` state column is read as [`ParticipantState::Active`]. The password
/// hash is never serialized.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Participant {
    pub id: DbId,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    #[sqlx(try_from = "String")]
    pub participant_type: ParticipantType,
    #[sqlx(try_from = "Option<String>")]
    pub state: ParticipantState,
    pub external_reference: Option<String>,
    #[serde(skip_serializing)]
    pub hashed_password: Option<String>,
    pub update_count: i32,
    pub created_by: String,
    pub created_datetime: Timestamp,
    pub updated_by: Option<String>,
    pub updated_datetime: Option<Timestamp>,
}

impl Participant {
    pub fn is_active(&self) -> bool {
        self.state == ParticipantState::Active
    }
}

/// A participant reached through a relation, with the relation's type.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RelatedParticipant {
    #[sqlx(try_from = "String")]
    pub relation_type: RelationType,
    #[sqlx(flatten)]
    pub participant: Participant,
}

/// A participant together with its active relations.
///
/// - `roles`: targets of outgoing `GRANT` edges
/// - `org_units`: targets of outgoing `MEMBER OF` edges
/// - `proxy_of`: targets of outgoing `PROXY OF` edges
/// - `proxies`: sources of incoming `PROXY OF` edges
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantWithRelations {
    #[serde(flatten)]
    pub participant: Participant,
    pub roles: Vec<Participant>,
    pub org_units: Vec<Participant>,
    pub proxy_of: Vec<Participant>,
    pub proxies: Vec<Participant>,
}

impl ParticipantWithRelations {
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|p| p.name.clone()).collect()
    }

    pub fn org_unit_names(&self) -> Vec<String> {
        self.org_units.iter().map(|p| p.name.clone()).collect()
    }

    pub fn proxy_of_names(&self) -> Vec<String> {
        self.proxy_of.iter().map(|p| p.name.clone()).collect()
    }

    pub fn proxy_names(&self) -> Vec<String> {
        self.proxies.iter().map(|p| p.name.clone()).collect()
    }
}

/// DTO for creating a new participant.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateParticipant {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub participant_type: ParticipantType,
    pub state: Option<ParticipantState>,
    pub external_reference: Option<String>,
    #[serde(default)]
    pub hashed_password: Option<String>,
    pub created_by: String,
}

impl CreateParticipant {
    /// Validate field formats and lengths, upper-casing `name` and `created_by`.
    pub fn validated(mut self) -> Result<Self, CoreError> {
        self.name = validate_name(&self.name)?;
        self.display_name = self.display_name.trim().to_string();
        validate_display_name(&self.display_name)?;
        self.description = non_empty(self.description);
        if let Some(description) = &self.description {
            validate_max_len("description", description, MAX_DESCRIPTION_LEN)?;
        }
        self.email = non_empty(self.email);
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        self.external_reference = non_empty(self.external_reference);
        if let Some(reference) = &self.external_reference {
            validate_max_len("external_reference", reference, MAX_EXTERNAL_REFERENCE_LEN)?;
        }
        if let Some(hash) = &self.hashed_password {
            validate_max_len("hashed_password", hash, MAX_HASHED_PASSWORD_LEN)?;
        }
        self.created_by = normalize_name(&self.created_by);
        validate_max_len("created_by", &self.created_by, MAX_NAME_LEN)?;
        Ok(self)
    }
}

/// DTO for updating an existing participant. `None` fields are left unchanged;
/// an empty `description`, `email` or `external_reference` clears the column.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateParticipant {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub external_reference: Option<String>,
    #[serde(default)]
    pub hashed_password: Option<String>,
    /// New state, applied in the same statement as the field changes.
    #[serde(default)]
    pub state: Option<ParticipantState>,
    /// Reject the update unless the row still has this `update_count`.
    pub expected_update_count: Option<i32>,
    #[serde(default)]
    pub updated_by: String,
}

impl UpdateParticipant {
    pub fn validated(mut self) -> Result<Self, CoreError> {
        if let Some(name) = &self.name {
            self.name = Some(validate_name(name)?);
        }
        if let Some(display_name) = &self.display_name {
            let trimmed = display_name.trim().to_string();
            validate_display_name(&trimmed)?;
            self.display_name = Some(trimmed);
        }
        if let Some(description) = &self.description {
            validate_max_len("description", description, MAX_DESCRIPTION_LEN)?;
        }
        if let Some(email) = self.email.as_deref().map(str::trim) {
            if !email.is_empty() {
                validate_email(email)?;
            }
            self.email = Some(email.to_string());
        }
        if let Some(reference) = &self.external_reference {
            validate_max_len("external_reference", reference, MAX_EXTERNAL_REFERENCE_LEN)?;
        }
        if let Some(hash) = &self.hashed_password {
            validate_max_len("hashed_password", hash, MAX_HASHED_PASSWORD_LEN)?;
        }
        self.updated_by = normalize_name(&self.updated_by);
        validate_max_len("updated_by", &self.updated_by, MAX_NAME_LEN)?;
        Ok(self)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
