//! Service layer for the auth gateway.
//! - Keeps registration, login and session lookup independent of the web framework.
//! - Talks to persistence only through the [`auth::repository::UserRepository`] trait.
//! - Provides clear error types and documented interfaces.

pub mod auth;
