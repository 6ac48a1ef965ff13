//! Participant manager API server library.
//!
//! Exposes the building blocks (config, logging, state, error handling,
//! authentication, policy, routes) so integration tests and the binary
//! entrypoint can both access them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod policy;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
