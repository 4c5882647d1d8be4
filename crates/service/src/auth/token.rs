//! Session token issuing and verification (HS256 JWT).

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use super::domain::{SessionClaims, TokenPayload};
use super::errors::AuthError;

/// Signs and verifies session tokens with a single process-wide secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, AuthError> {
        if secret.trim().is_empty() {
            return Err(AuthError::Token("signing secret is empty".into()));
        }
        if ttl.is_zero() {
            return Err(AuthError::Token("token ttl must be positive".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `payload`, valid from now for the configured ttl.
    pub fn issue(&self, payload: &TokenPayload) -> Result<String, AuthError> {
        self.issue_at(payload, chrono::Utc::now().timestamp())
    }

    fn issue_at(&self, payload: &TokenPayload, issued_at: i64) -> Result<String, AuthError> {
        let ttl = i64::try_from(self.ttl.as_secs()).map_err(|e| AuthError::Token(e.to_string()))?;
        let claims = SessionClaims { payload: payload.clone(), iat: issued_at, exp: issued_at.saturating_add(ttl) };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| AuthError::Token(e.to_string()))
    }

    /// Check signature and expiry. Every failure is [`AuthError::InvalidToken`].
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(err = %e, "token rejected");
                AuthError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn payload() -> TokenPayload {
        TokenPayload { id: Uuid::new_v4(), email: "a@x.com".into(), fullname: "A".into() }
    }

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(secret, Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn issued_token_round_trips_claims() {
        let issuer = issuer("secret");
        let p = payload();
        let token = issuer.issue(&p).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.payload, p);
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = issuer("secret");
        let long_ago = chrono::Utc::now().timestamp() - 3600;
        let token = issuer.issue_at(&payload(), long_ago).unwrap();
        assert!(matches!(issuer.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = issuer("secret-a").issue(&payload()).unwrap();
        assert!(matches!(issuer("secret-b").verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(issuer("secret").verify("not.a.jwt"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn empty_secret_or_zero_ttl_refused() {
        assert!(TokenIssuer::new("  ", Duration::from_secs(60)).is_err());
        assert!(TokenIssuer::new("secret", Duration::ZERO).is_err());
    }

    #[test]
    fn claims_are_flat_json() {
        let issuer = issuer("secret");
        let p = payload();
        let token = issuer.issue(&p).unwrap();
        let claims = issuer.verify(&token).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["id"], p.id.to_string());
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["fullname"], "A");
        assert!(json["exp"].is_i64());
    }
}
