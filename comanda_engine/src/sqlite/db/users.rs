use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewUser, User, UserId},
    traits::StorageError,
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, StorageError> {
    let user: User = sqlx::query_as(
        r#"
            INSERT INTO users (id, tenant_id, username, password_hash, display_name, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(UserId::random())
    .bind(user.tenant_id)
    .bind(user.username)
    .bind(user.password_hash)
    .bind(user.display_name)
    .bind(user.role)
    .bind(Utc::now())
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or_else(|| StorageError::InsertError("The user insert returned no row".to_string()))?;
    debug!("🗃️ User [{}] created with id {}", user.username, user.id);
    Ok(user)
}

pub async fn fetch_user(id: &UserId, conn: &mut SqliteConnection) -> Result<Option<User>, StorageError> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn fetch_users_by_username(username: &str, conn: &mut SqliteConnection) -> Result<Vec<User>, StorageError> {
    let users = sqlx::query_as("SELECT * FROM users WHERE username = $1 ORDER BY created_at ASC")
        .bind(username)
        .fetch_all(conn)
        .await?;
    Ok(users)
}
