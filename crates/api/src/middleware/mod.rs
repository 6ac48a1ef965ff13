//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Resolves the session behind a JWT Bearer token.
//! - [`rbac::RequireAuth`] -- Requires any live session.
//! - [`rbac::RequireRegistered`] -- Requires a session backed by a participant record.
//! - [`rbac::RequireAdmin`] -- Requires the `ADMINISTRATOR` role.
//! - [`rbac::require_access`] -- Policy check for an object and action.

pub mod auth;
pub mod rbac;
