//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&mut DbTransaction` as the first argument. Callers own the transaction and
//! decide when to commit.

pub mod participant_relation_repo;
pub mod participant_repo;
pub mod relation_view_repo;

pub use participant_relation_repo::ParticipantRelationRepo;
pub use participant_repo::{ParticipantKey, ParticipantRepo};
pub use relation_view_repo::RelationViewRepo;
