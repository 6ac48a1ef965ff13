//! Domain types and rules for the participant manager.
//!
//! Everything in this crate is storage- and transport-agnostic: participant
//! and relation enumerations, field validation, application roles, the menu
//! model, and list diffing used to turn form submissions into relation edits.

pub mod diff;
pub mod error;
pub mod menu;
pub mod participant;
pub mod permissions;
pub mod roles;
pub mod types;
