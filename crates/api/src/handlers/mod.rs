pub mod about;
pub mod admin;
pub mod auth;
pub mod debug;
pub mod menu;
pub mod org_units;
pub mod participants;
pub mod registration;
pub mod relations;
pub mod roles;
pub mod session;
pub mod users;
