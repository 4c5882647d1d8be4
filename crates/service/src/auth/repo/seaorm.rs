use chrono::Utc;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use models::user;

use crate::auth::domain::{AuthUser, Credential, NewUser, Projection, UserRecord};
use crate::auth::errors::AuthError;
use crate::auth::password::PasswordAlgorithm;
use crate::auth::repository::UserRepository;

pub struct SeaOrmUserRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn to_auth_user(v: user::UserView) -> AuthUser {
    AuthUser {
        id: v.id,
        email: v.email,
        fullname: v.fullname,
        created_at: v.created_at.with_timezone(&Utc),
        updated_at: v.updated_at.with_timezone(&Utc),
    }
}

fn to_record(m: user::Model) -> Result<UserRecord, AuthError> {
    let credential = Credential {
        algorithm: m.password_algorithm.parse::<PasswordAlgorithm>()?,
        password_hash: m.password_hash.clone(),
    };
    Ok(UserRecord { user: to_auth_user(m.into()), credential: Some(credential) })
}

fn view_record(v: user::UserView) -> UserRecord {
    UserRecord { user: to_auth_user(v), credential: None }
}

#[async_trait::async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create_user(&self, new_user: NewUser) -> Result<AuthUser, AuthError> {
        let created = user::create(
            &self.db,
            &new_user.email,
            &new_user.fullname,
            new_user.credential.password_hash,
            new_user.credential.algorithm.as_str(),
        )
        .await?;
        Ok(to_auth_user(created))
    }

    async fn find_user_by_email(&self, email: &str, projection: Projection) -> Result<Option<UserRecord>, AuthError> {
        match projection {
            Projection::Default => Ok(user::find_view_by_email(&self.db, email).await?.map(view_record)),
            Projection::WithCredential => user::find_with_credential_by_email(&self.db, email).await?.map(to_record).transpose(),
        }
    }

    async fn find_user_by_id(&self, id: Uuid, projection: Projection) -> Result<Option<UserRecord>, AuthError> {
        match projection {
            Projection::Default => Ok(user::find_view_by_id(&self.db, id).await?.map(view_record)),
            Projection::WithCredential => user::find_with_credential_by_id(&self.db, id).await?.map(to_record).transpose(),
        }
    }
}
