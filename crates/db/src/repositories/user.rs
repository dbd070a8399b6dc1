use crate::models::{DbAuthToken, DbUser};
use crate::repositories::{db_error, is_unique_violation};
use argon2::{Argon2, PasswordVerifier};
use calbook_core::errors::{CalendarError, CalendarResult};
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn create_user(
    pool: &Pool<Postgres>,
    username: &str,
    email: &str,
    password_hash: &str,
    is_staff: bool,
) -> CalendarResult<DbUser> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        INSERT INTO users (username, email, password_hash, is_staff)
        VALUES ($1, $2, $3, $4)
        RETURNING id, username, email, password_hash, is_staff, created_at
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(is_staff)
    .fetch_one(pool)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            CalendarError::Validation("Username already exists".to_string())
        } else {
            db_error(err)
        }
    })?;

    Ok(user)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, username, email, password_hash, is_staff, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn get_user_by_username(
    pool: &Pool<Postgres>,
    username: &str,
) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, username, email, password_hash, is_staff, created_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Verify credentials against the stored Argon2 hash. Returns the user on a
/// match, `None` for an unknown username or a wrong password.
pub async fn verify_credentials(
    pool: &Pool<Postgres>,
    username: &str,
    password: &str,
) -> Result<Option<DbUser>> {
    let Some(user) = get_user_by_username(pool, username).await? else {
        return Ok(None);
    };

    let parsed_hash = argon2::PasswordHash::new(&user.password_hash)
        .map_err(|e| eyre::eyre!("Invalid password hash: {}", e))?;
    let is_valid = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();

    Ok(is_valid.then_some(user))
}

/// Store an opaque session token for the user. The token value is generated
/// by the caller.
pub async fn create_token(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    token: &str,
) -> Result<DbAuthToken> {
    let auth_token = sqlx::query_as::<_, DbAuthToken>(
        r#"
        INSERT INTO auth_tokens (token, user_id)
        VALUES ($1, $2)
        RETURNING token, user_id, created_at
        "#,
    )
    .bind(token)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(auth_token)
}

pub async fn get_user_by_token(pool: &Pool<Postgres>, token: &str) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT u.id, u.username, u.email, u.password_hash, u.is_staff, u.created_at
        FROM auth_tokens t
        JOIN users u ON u.id = t.user_id
        WHERE t.token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn delete_token(pool: &Pool<Postgres>, token: &str) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM auth_tokens
        WHERE token = $1
        "#,
    )
    .bind(token)
    .execute(pool)
    .await?;

    Ok(())
}
