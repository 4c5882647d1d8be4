//! Database-backed tests. They need a reachable PostgreSQL at `DATABASE_URL`
//! and are skipped when `SKIP_DB_TESTS` is set or the connection fails.

use anyhow::Result;
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::{db, user};

async fn setup_test_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let db = match db::connect().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("skip: cannot connect to db: {}", e);
            return None;
        }
    };
    if let Err(e) = db::migrate(&db).await {
        eprintln!("skip: migrate up failed: {}", e);
        return None;
    }
    Some(db)
}

fn unique_email() -> String {
    format!("user_{}@example.com", Uuid::new_v4())
}

#[tokio::test]
async fn create_and_read_projections() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };
    let email = unique_email();

    let created = user::create(&db, &email, "Ada", "$2b$10$fakehashfakehashfakehash".into(), "bcrypt").await?;
    assert_eq!(created.email, email);

    let view = user::find_view_by_email(&db, &email).await?.expect("view by email");
    assert_eq!(view.id, created.id);
    let json = serde_json::to_value(&view)?;
    assert!(json.get("password_hash").is_none());

    let by_id = user::find_view_by_id(&db, created.id).await?.expect("view by id");
    assert_eq!(by_id.fullname, "Ada");

    let full = user::find_with_credential_by_email(&db, &email).await?.expect("row with credential");
    assert_eq!(full.password_algorithm, "bcrypt");
    assert!(full.password_hash.starts_with("$2b$"));

    user::Entity::delete_by_id(created.id).exec(&db).await?;
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_conflict() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };
    let email = unique_email();

    let first = user::create(&db, &email, "One", "hash-one".into(), "bcrypt").await?;
    let second = user::create(&db, &email, "Two", "hash-two".into(), "bcrypt").await;
    assert!(matches!(second, Err(ModelError::Conflict(_))), "got {:?}", second);

    user::Entity::delete_by_id(first.id).exec(&db).await?;
    Ok(())
}

#[tokio::test]
async fn long_email_and_fullname_are_stored() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };
    let email = format!("{}_{}", "a".repeat(300), unique_email());
    let fullname = "F".repeat(400);

    let created = user::create(&db, &email, &fullname, "hash".into(), "bcrypt").await?;
    let view = user::find_view_by_id(&db, created.id).await?.expect("view by id");
    assert_eq!(view.email, email);
    assert_eq!(view.fullname.len(), 400);

    user::Entity::delete_by_id(created.id).exec(&db).await?;
    Ok(())
}

#[tokio::test]
async fn missing_user_reads_none() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };
    assert!(user::find_view_by_id(&db, Uuid::new_v4()).await?.is_none());
    assert!(user::find_with_credential_by_email(&db, &unique_email()).await?.is_none());
    Ok(())
}

#[test]
fn model_serialization_skips_hash() {
    let now = chrono::Utc::now().into();
    let model = user::Model {
        id: Uuid::new_v4(),
        email: "a@x.com".into(),
        fullname: "A".into(),
        password_hash: "secret-hash".into(),
        password_algorithm: "bcrypt".into(),
        created_at: now,
        updated_at: now,
    };
    let json = serde_json::to_value(&model).unwrap();
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["email"], "a@x.com");
}
