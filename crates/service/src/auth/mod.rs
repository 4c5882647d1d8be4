//! Auth module: three-layer architecture (domain, repository, service).
//!
//! This module centralizes registration, login and session lookup under the
//! service crate, together with the password hashing and token primitives
//! they rely on.

pub mod domain;
pub mod errors;
pub mod password;
pub mod repository;
pub mod repo;
pub mod service;
pub mod token;

pub use errors::AuthError;
pub use service::{AuthConfig, AuthService};
