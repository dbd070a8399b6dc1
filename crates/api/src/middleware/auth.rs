//! # Authentication Module
//!
//! This module provides authentication utilities for the Calbook API:
//! Argon2 password hashing, opaque session token generation, and the
//! extractors that resolve the authenticated principal for each request.
//!
//! The implementation uses Argon2, a secure password hashing algorithm,
//! to protect user passwords from common attacks like rainbow tables
//! and brute force attempts. Session tokens are random opaque strings
//! stored server-side; the core trusts the principal they resolve to and
//! performs no further credential validation per request.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use eyre::Result;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;

use calbook_core::conflict::Actor;
use calbook_core::errors::CalendarError;
use calbook_db::models::DbUser;
use calbook_db::repositories;

use crate::middleware::error_handling::AppError;
use crate::ApiState;

const TOKEN_LENGTH: usize = 48;

/// Hashes a password using the Argon2 algorithm
///
/// This function securely hashes passwords before storage in the database,
/// automatically generating a random salt and using industry-standard
/// parameters for Argon2.
///
/// # Security Notes
///
/// - Uses a random salt for each password
/// - Uses default Argon2 parameters (memory: 19MiB, iterations: 3, parallelism: 4)
/// - Returns password in PHC string format (includes algorithm, version, parameters, salt, and hash)
pub fn hash_password(password: &str) -> Result<String> {
    // Generate a fresh, random salt
    let salt = SaltString::generate(&mut OsRng);

    // Create default Argon2 instance
    let argon2 = Argon2::default();

    // Hash the password with salt
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| eyre::eyre!("Error hashing password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Generates a random opaque session token.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Extracts the bearer token from request headers.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// Token from the `token` query parameter. Browser WebSocket clients cannot
/// set request headers, so the calendar socket accepts this form too.
fn token_from_query(parts: &Parts) -> Option<String> {
    parts
        .uri
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .map(|token| token.to_string())
}

/// The authenticated principal for a request.
///
/// Resolves the presented token to a user row; requests without a valid
/// token are rejected with 401 before the handler runs.
pub struct AuthUser(pub DbUser);

/// The authenticated principal, additionally required to be staff.
/// Non-staff principals are rejected with 403.
pub struct AdminUser(pub DbUser);

/// Conflict-engine view of a principal.
pub fn actor_of(user: &DbUser) -> Actor {
    Actor {
        id: user.id,
        is_staff: user.is_staff,
    }
}

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .or_else(|| token_from_query(parts))
            .ok_or_else(|| {
                AppError(CalendarError::Authentication(
                    "Authentication required".to_string(),
                ))
            })?;

        let user = repositories::user::get_user_by_token(&state.db_pool, &token)
            .await
            .map_err(CalendarError::Database)?
            .ok_or_else(|| {
                AppError(CalendarError::Authentication(
                    "Invalid or expired token".to_string(),
                ))
            })?;

        Ok(AuthUser(user))
    }
}

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_staff {
            return Err(AppError(CalendarError::Authorization(
                "Admin access required".to_string(),
            )));
        }

        Ok(AdminUser(user))
    }
}
