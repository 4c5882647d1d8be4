//! `user` entity.
//!
//! The password hash lives on the row but is only selected by the
//! `*_with_credential` lookups; [`find_view_by_email`] and [`find_view_by_id`]
//! select the [`UserView`] columns and nothing else.

use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, FromQueryResult, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub fullname: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub password_algorithm: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Default read projection: every column except the credential.
#[derive(Clone, Debug, PartialEq, FromQueryResult, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub fullname: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<Model> for UserView {
    fn from(m: Model) -> Self {
        Self { id: m.id, email: m.email, fullname: m.fullname, created_at: m.created_at, updated_at: m.updated_at }
    }
}

fn view_columns() -> [Column; 5] {
    [Column::Id, Column::Email, Column::Fullname, Column::CreatedAt, Column::UpdatedAt]
}

/// Insert a user row. A duplicate email surfaces as [`ModelError::Conflict`].
pub async fn create(
    db: &DatabaseConnection,
    email: &str,
    fullname: &str,
    password_hash: String,
    password_algorithm: &str,
) -> Result<UserView, ModelError> {
    if email.trim().is_empty() { return Err(ModelError::Validation("email required".into())); }
    if fullname.trim().is_empty() { return Err(ModelError::Validation("fullname required".into())); }
    if password_hash.trim().is_empty() { return Err(ModelError::Validation("password hash required".into())); }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        fullname: Set(fullname.to_string()),
        password_hash: Set(password_hash),
        password_algorithm: Set(password_algorithm.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let created = am.insert(db).await?;
    Ok(created.into())
}

pub async fn find_view_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<UserView>, ModelError> {
    let found = Entity::find()
        .select_only()
        .columns(view_columns())
        .filter(Column::Email.eq(email))
        .into_model::<UserView>()
        .one(db)
        .await?;
    Ok(found)
}

pub async fn find_view_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<UserView>, ModelError> {
    let found = Entity::find_by_id(id)
        .select_only()
        .columns(view_columns())
        .into_model::<UserView>()
        .one(db)
        .await?;
    Ok(found)
}

pub async fn find_with_credential_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, ModelError> {
    let found = Entity::find().filter(Column::Email.eq(email)).one(db).await?;
    Ok(found)
}

pub async fn find_with_credential_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    let found = Entity::find_by_id(id).one(db).await?;
    Ok(found)
}
