use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::password::PasswordAlgorithm;

/// `null` reads as an empty string.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Registration input. Absent and `null` fields deserialize as empty strings
/// so that presence is checked by the service, not by the JSON layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterInput {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub password: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fullname: String,
}

/// Login input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginInput {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub password: String,
}

/// Domain user (business view). Carries no credential material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub fullname: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored password hash and the scheme that produced it.
#[derive(Debug, Clone)]
pub struct Credential {
    pub password_hash: String,
    pub algorithm: PasswordAlgorithm,
}

/// Which columns a user lookup reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// Public fields only.
    #[default]
    Default,
    /// Public fields plus the stored credential, for password verification.
    WithCredential,
}

/// Result of a user lookup. `credential` is `Some` only for
/// [`Projection::WithCredential`].
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: AuthUser,
    pub credential: Option<Credential>,
}

/// Everything the store needs to persist a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub fullname: String,
    pub credential: Credential,
}

/// Identity claims embedded in a session token and echoed back on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub id: Uuid,
    pub email: String,
    pub fullname: String,
}

impl From<&AuthUser> for TokenPayload {
    fn from(u: &AuthUser) -> Self {
        Self { id: u.id, email: u.email.clone(), fullname: u.fullname.clone() }
    }
}

/// Full signed claim set: identity plus issue and expiry timestamps (unix seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(flatten)]
    pub payload: TokenPayload,
    pub iat: i64,
    pub exp: i64,
}

/// Verified identity handed to session lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
}

impl From<&SessionClaims> for Identity {
    fn from(c: &SessionClaims) -> Self {
        Self { id: c.payload.id }
    }
}

/// Login result (session)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub payload: TokenPayload,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_absent_fields_read_as_empty() {
        let input: RegisterInput = serde_json::from_str(r#"{"email":null,"password":"secret1"}"#).unwrap();
        assert_eq!(input.email, "");
        assert_eq!(input.password, "secret1");
        assert_eq!(input.fullname, "");

        let login: LoginInput = serde_json::from_str(r#"{"email":"a@x.com","password":null}"#).unwrap();
        assert_eq!(login.password, "");
    }

    #[test]
    fn non_string_fields_are_still_rejected() {
        assert!(serde_json::from_str::<RegisterInput>(r#"{"email":42}"#).is_err());
    }
}
