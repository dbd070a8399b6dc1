use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use calbook_core::{
    errors::CalendarError,
    models::user::{AuthResponse, CurrentUserResponse, LoginRequest, RegisterRequest},
};
use calbook_db::models::DbUser;
use calbook_db::repositories;

use crate::{
    middleware::{
        auth::{self, AuthUser},
        error_handling::AppError,
    },
    ApiState,
};

fn current_user(user: DbUser) -> CurrentUserResponse {
    CurrentUserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        is_staff: user.is_staff,
    }
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(AppError(CalendarError::Validation(
            "Username and password are required".to_string(),
        )));
    }

    let password_hash = auth::hash_password(&payload.password).map_err(CalendarError::Database)?;

    // Self-service registration never grants staff privileges
    let user = repositories::user::create_user(
        &state.db_pool,
        username,
        &payload.email,
        &password_hash,
        false,
    )
    .await?;

    let token = auth::generate_token();
    repositories::user::create_token(&state.db_pool, user.id, &token)
        .await
        .map_err(CalendarError::Database)?;

    tracing::info!("Registered user {}", user.username);
    Ok(Json(AuthResponse {
        token,
        user: current_user(user),
    }))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user =
        repositories::user::verify_credentials(&state.db_pool, &payload.username, &payload.password)
            .await
            .map_err(CalendarError::Database)?
            .ok_or_else(|| {
                AppError(CalendarError::Authentication(
                    "Invalid credentials".to_string(),
                ))
            })?;

    let token = auth::generate_token();
    repositories::user::create_token(&state.db_pool, user.id, &token)
        .await
        .map_err(CalendarError::Database)?;

    Ok(Json(AuthResponse {
        token,
        user: current_user(user),
    }))
}

#[axum::debug_handler]
pub async fn logout(
    State(state): State<Arc<ApiState>>,
    _user: AuthUser,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(token) = auth::token_from_headers(&headers) {
        repositories::user::delete_token(&state.db_pool, &token)
            .await
            .map_err(CalendarError::Database)?;
    }

    Ok(Json(
        serde_json::json!({ "message": "Logged out successfully" }),
    ))
}

#[axum::debug_handler]
pub async fn me(
    State(_state): State<Arc<ApiState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<CurrentUserResponse>, AppError> {
    Ok(Json(current_user(user)))
}
