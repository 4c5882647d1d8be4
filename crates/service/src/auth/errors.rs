use thiserror::Error;

/// Business errors for auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("user already exists")]
    Conflict,
    #[error("user not found")]
    NotFound,
    #[error("invalid credentials")]
    InvalidCredential,
    #[error("invalid token")]
    InvalidToken,
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::Conflict => 1002,
            AuthError::NotFound => 1003,
            AuthError::InvalidCredential => 1004,
            AuthError::InvalidToken => 1005,
            AuthError::Hash(_) => 1101,
            AuthError::Token(_) => 1102,
            AuthError::Repository(_) => 1200,
        }
    }

    /// Errors that are not the caller's fault and must not leak details.
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthError::Hash(_) | AuthError::Token(_) | AuthError::Repository(_))
    }

    /// Short label used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation",
            AuthError::Conflict => "conflict",
            AuthError::NotFound => "not_found",
            AuthError::InvalidCredential => "invalid_credential",
            AuthError::InvalidToken => "invalid_token",
            AuthError::Hash(_) | AuthError::Token(_) | AuthError::Repository(_) => "internal",
        }
    }
}

impl From<models::errors::ModelError> for AuthError {
    fn from(e: models::errors::ModelError) -> Self {
        use models::errors::ModelError;
        match e {
            ModelError::Conflict(_) => AuthError::Conflict,
            ModelError::Validation(msg) => AuthError::Validation(msg),
            ModelError::Db(msg) => AuthError::Repository(msg),
        }
    }
}
