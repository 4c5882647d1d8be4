use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::domain::{AuthSession, AuthUser, Identity, LoginInput, NewUser, Projection, RegisterInput, SessionClaims, TokenPayload};
use super::errors::AuthError;
use super::password::{self, PasswordPolicy};
use super::repository::UserRepository;
use super::token::TokenIssuer;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub password: PasswordPolicy,
}

/// Auth business service independent of web framework
pub struct AuthService<R: UserRepository + ?Sized> {
    repo: Arc<R>,
    tokens: TokenIssuer,
    password: PasswordPolicy,
}

impl<R: UserRepository + ?Sized> AuthService<R> {
    /// Build the service; fails when the signing secret is empty or the ttl is zero.
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Result<Self, AuthError> {
        let tokens = TokenIssuer::new(&cfg.jwt_secret, cfg.token_ttl)?;
        Ok(Self { repo, tokens, password: cfg.password })
    }

    /// Register a new user with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockUserRepository};
    /// use service::auth::{domain::RegisterInput, password::{PasswordAlgorithm, PasswordPolicy}};
    /// use std::{sync::Arc, time::Duration};
    /// let repo = Arc::new(MockUserRepository::default());
    /// let cfg = AuthConfig {
    ///     jwt_secret: "secret".into(),
    ///     token_ttl: Duration::from_secs(60),
    ///     password: PasswordPolicy { algorithm: PasswordAlgorithm::Bcrypt, bcrypt_cost: 4 },
    /// };
    /// let svc = AuthService::new(repo, cfg).unwrap();
    /// let input = RegisterInput { email: "a@x.com".into(), password: "secret1".into(), fullname: "A".into() };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.email, "a@x.com");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        let email = input.email.trim();
        let fullname = input.fullname.trim();
        if email.is_empty() || fullname.is_empty() || input.password.is_empty() {
            return Err(AuthError::Validation("fields required".into()));
        }
        if let Some(existing) = self.repo.find_user_by_email(email, Projection::Default).await? {
            debug!(user_id = %existing.user.id, "user exists");
            return Err(AuthError::Conflict);
        }

        let credential = self.password.hash(&input.password).await?;
        let user = self
            .repo
            .create_user(NewUser { email: email.to_owned(), fullname: fullname.to_owned(), credential })
            .await?;
        info!(user_id = %user.id, algorithm = %self.password.algorithm, "user_registered");
        Ok(user)
    }

    /// Authenticate a user and issue a session token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockUserRepository};
    /// use service::auth::{domain::{RegisterInput, LoginInput}, password::{PasswordAlgorithm, PasswordPolicy}};
    /// use std::{sync::Arc, time::Duration};
    /// let repo = Arc::new(MockUserRepository::default());
    /// let cfg = AuthConfig {
    ///     jwt_secret: "secret".into(),
    ///     token_ttl: Duration::from_secs(60),
    ///     password: PasswordPolicy { algorithm: PasswordAlgorithm::Bcrypt, bcrypt_cost: 4 },
    /// };
    /// let svc = AuthService::new(repo, cfg).unwrap();
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { email: "u@e.com".into(), password: "Passw0rd".into(), fullname: "N".into() }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.payload.email, "u@e.com");
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let record = self
            .repo
            .find_user_by_email(input.email.trim(), Projection::WithCredential)
            .await?
            .ok_or(AuthError::NotFound)?;

        let credential = record
            .credential
            .as_ref()
            .ok_or_else(|| AuthError::Repository("credential not loaded".into()))?;
        if !password::verify(&input.password, credential).await? {
            warn!(user_id = %record.user.id, "password mismatch");
            return Err(AuthError::InvalidCredential);
        }

        let payload = TokenPayload::from(&record.user);
        let token = self.tokens.issue(&payload)?;
        info!(user_id = %payload.id, ttl_secs = self.tokens.ttl().as_secs(), "user_logged_in");
        Ok(AuthSession { payload, token })
    }

    /// Validate a bearer token and extract the identity it carries.
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.tokens.verify(token)
    }

    /// Re-read the canonical user record for an already verified identity.
    #[instrument(skip(self), fields(user_id = %identity.id))]
    pub async fn current_user(&self, identity: Identity) -> Result<AuthUser, AuthError> {
        let record = self
            .repo
            .find_user_by_id(identity.id, Projection::Default)
            .await?
            .ok_or(AuthError::NotFound)?;
        Ok(record.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::domain::Credential;
    use crate::auth::password::PasswordAlgorithm;
    use crate::auth::repository::mock::MockUserRepository;

    fn config(algorithm: PasswordAlgorithm) -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            token_ttl: Duration::from_secs(60),
            password: PasswordPolicy { algorithm, bcrypt_cost: 4 },
        }
    }

    fn service(repo: Arc<MockUserRepository>) -> AuthService<MockUserRepository> {
        AuthService::new(repo, config(PasswordAlgorithm::Bcrypt)).unwrap()
    }

    fn register_input(email: &str, password: &str, fullname: &str) -> RegisterInput {
        RegisterInput { email: email.into(), password: password.into(), fullname: fullname.into() }
    }

    fn login_input(email: &str, password: &str) -> LoginInput {
        LoginInput { email: email.into(), password: password.into() }
    }

    #[tokio::test]
    async fn register_login_and_lookup() {
        let repo = Arc::new(MockUserRepository::default());
        let svc = service(repo.clone());

        let user = svc.register(register_input("a@x.com", "secret1", "A")).await.unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.fullname, "A");

        let session = svc.login(login_input("a@x.com", "secret1")).await.unwrap();
        assert_eq!(session.payload, TokenPayload { id: user.id, email: "a@x.com".into(), fullname: "A".into() });

        let claims = svc.verify_token(&session.token).unwrap();
        assert_eq!(claims.payload, session.payload);

        let me = svc.current_user(Identity::from(&claims)).await.unwrap();
        assert_eq!(me, user);
    }

    #[tokio::test]
    async fn long_fields_register_and_log_in() {
        let repo = Arc::new(MockUserRepository::default());
        let svc = service(repo);
        let email = format!("{}@x.com", "a".repeat(300));
        let fullname = "F".repeat(400);

        let user = svc.register(register_input(&email, "secret1", &fullname)).await.unwrap();
        assert_eq!(user.email, email);
        let session = svc.login(login_input(&email, "secret1")).await.unwrap();
        assert_eq!(session.payload.fullname, fullname);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_and_keeps_one_user() {
        let repo = Arc::new(MockUserRepository::default());
        let svc = service(repo.clone());

        svc.register(register_input("a@x.com", "secret1", "A")).await.unwrap();
        let second = svc.register(register_input("a@x.com", "other", "B")).await;
        assert!(matches!(second, Err(AuthError::Conflict)));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicate_registrations_yield_one_user() {
        let repo = Arc::new(MockUserRepository::default());
        let svc = Arc::new(service(repo.clone()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.register(register_input("race@x.com", "secret1", &format!("R{i}"))).await })
            })
            .collect();

        let mut ok = 0;
        let mut conflicts = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AuthError::Conflict) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 3);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn missing_fields_fail_validation_and_persist_nothing() {
        let repo = Arc::new(MockUserRepository::default());
        let svc = service(repo.clone());

        for input in [
            register_input("", "secret1", "A"),
            register_input("a@x.com", "", "A"),
            register_input("a@x.com", "secret1", ""),
            register_input("   ", "secret1", "A"),
            RegisterInput::default(),
        ] {
            let res = svc.register(input).await;
            assert!(matches!(res, Err(AuthError::Validation(_))), "got {res:?}");
        }
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn stored_credential_is_a_hash() {
        let repo = Arc::new(MockUserRepository::default());
        let svc = service(repo.clone());
        svc.register(register_input("a@x.com", "secret1", "A")).await.unwrap();

        let cred = repo.stored_credential("a@x.com").unwrap();
        assert_ne!(cred.password_hash, "secret1");
        assert!(!cred.password_hash.contains("secret1"));
        assert_eq!(cred.algorithm, PasswordAlgorithm::Bcrypt);
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credential() {
        let svc = service(Arc::new(MockUserRepository::default()));
        svc.register(register_input("a@x.com", "secret1", "A")).await.unwrap();

        let res = svc.login(login_input("a@x.com", "secret2")).await;
        assert!(matches!(res, Err(AuthError::InvalidCredential)));
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let svc = service(Arc::new(MockUserRepository::default()));
        let res = svc.login(login_input("nobody@x.com", "secret1")).await;
        assert!(matches!(res, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn lookup_after_deletion_is_not_found() {
        let repo = Arc::new(MockUserRepository::default());
        let svc = service(repo.clone());
        let user = svc.register(register_input("a@x.com", "secret1", "A")).await.unwrap();
        assert!(repo.remove(user.id));

        let res = svc.current_user(Identity { id: user.id }).await;
        assert!(matches!(res, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn hashes_survive_algorithm_switch() {
        let repo = Arc::new(MockUserRepository::default());
        let argon = AuthService::new(repo.clone(), config(PasswordAlgorithm::Argon2)).unwrap();
        argon.register(register_input("old@x.com", "secret1", "Old")).await.unwrap();

        let bcrypt = service(repo.clone());
        bcrypt.register(register_input("new@x.com", "secret2", "New")).await.unwrap();

        assert!(bcrypt.login(login_input("old@x.com", "secret1")).await.is_ok());
        assert!(argon.login(login_input("new@x.com", "secret2")).await.is_ok());
        let old: Credential = repo.stored_credential("old@x.com").unwrap();
        assert_eq!(old.algorithm, PasswordAlgorithm::Argon2);
    }

    #[tokio::test]
    async fn inputs_are_trimmed() {
        let svc = service(Arc::new(MockUserRepository::default()));
        let user = svc.register(register_input(" a@x.com ", "secret1", " A ")).await.unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.fullname, "A");
        assert!(svc.login(login_input("a@x.com ", "secret1")).await.is_ok());
    }

    #[test]
    fn empty_secret_is_refused() {
        let cfg = AuthConfig { jwt_secret: String::new(), ..config(PasswordAlgorithm::Bcrypt) };
        assert!(AuthService::new(Arc::new(MockUserRepository::default()), cfg).is_err());
    }

    #[test]
    fn user_json_has_no_credential_fields() {
        let now = chrono::Utc::now();
        let user = AuthUser { id: uuid::Uuid::new_v4(), email: "a@x.com".into(), fullname: "A".into(), created_at: now, updated_at: now };
        let json = serde_json::to_value(&user).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 5);
        assert!(!keys.iter().any(|k| k.contains("password") || k.contains("hash")));
    }
}
