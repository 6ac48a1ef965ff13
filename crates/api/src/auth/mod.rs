//! Authentication primitives.
//!
//! - [`directory`] -- LDAP and local password directories.
//! - [`jwt`] -- JWT access-token generation and validation.
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`session`] -- Server-side session store.

pub mod directory;
pub mod jwt;
pub mod password;
pub mod session;
