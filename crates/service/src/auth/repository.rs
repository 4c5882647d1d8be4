use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{AuthUser, NewUser, Projection, UserRecord};
use super::errors::AuthError;

/// Persistence collaborator for the auth workflows.
///
/// Implementations own email uniqueness: `create_user` must fail with
/// [`AuthError::Conflict`] when the email is taken, including when a
/// concurrent insert wins the race after the service's own lookup.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> Result<AuthUser, AuthError>;
    async fn find_user_by_email(&self, email: &str, projection: Projection) -> Result<Option<UserRecord>, AuthError>;
    async fn find_user_by_id(&self, id: Uuid, projection: Projection) -> Result<Option<UserRecord>, AuthError>;
}

/// Simple in-memory repository for tests, doc examples and benches
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    use chrono::Utc;

    use crate::auth::domain::Credential;

    #[derive(Default)]
    struct Tables {
        users: HashMap<Uuid, (AuthUser, Credential)>,
        by_email: HashMap<String, Uuid>,
    }

    #[derive(Default)]
    pub struct MockUserRepository {
        tables: Mutex<Tables>,
    }

    impl MockUserRepository {
        fn lock(&self) -> Result<MutexGuard<'_, Tables>, AuthError> {
            self.tables.lock().map_err(|_| AuthError::Repository("user table lock poisoned".into()))
        }

        /// Number of stored users.
        pub fn len(&self) -> usize {
            self.lock().map(|t| t.users.len()).unwrap_or_default()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Raw stored credential, for asserting what was persisted.
        pub fn stored_credential(&self, email: &str) -> Option<Credential> {
            let tables = self.lock().ok()?;
            let id = tables.by_email.get(email)?;
            tables.users.get(id).map(|(_, c)| c.clone())
        }

        /// Drop a user, e.g. to simulate deletion after token issuance.
        pub fn remove(&self, id: Uuid) -> bool {
            let Ok(mut tables) = self.lock() else { return false };
            match tables.users.remove(&id) {
                Some((user, _)) => {
                    tables.by_email.remove(&user.email);
                    true
                }
                None => false,
            }
        }
    }

    fn project(user: &AuthUser, credential: &Credential, projection: Projection) -> UserRecord {
        let credential = match projection {
            Projection::Default => None,
            Projection::WithCredential => Some(credential.clone()),
        };
        UserRecord { user: user.clone(), credential }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn create_user(&self, new_user: NewUser) -> Result<AuthUser, AuthError> {
            let mut tables = self.lock()?;
            if tables.by_email.contains_key(&new_user.email) {
                return Err(AuthError::Conflict);
            }
            let now = Utc::now();
            let user = AuthUser {
                id: Uuid::new_v4(),
                email: new_user.email,
                fullname: new_user.fullname,
                created_at: now,
                updated_at: now,
            };
            tables.by_email.insert(user.email.clone(), user.id);
            tables.users.insert(user.id, (user.clone(), new_user.credential));
            Ok(user)
        }

        async fn find_user_by_email(&self, email: &str, projection: Projection) -> Result<Option<UserRecord>, AuthError> {
            let tables = self.lock()?;
            Ok(tables
                .by_email
                .get(email)
                .and_then(|id| tables.users.get(id))
                .map(|(u, c)| project(u, c, projection)))
        }

        async fn find_user_by_id(&self, id: Uuid, projection: Projection) -> Result<Option<UserRecord>, AuthError> {
            let tables = self.lock()?;
            Ok(tables.users.get(&id).map(|(u, c)| project(u, c, projection)))
        }
    }
}
