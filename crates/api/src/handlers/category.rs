use axum::{extract::State, Json};
use std::sync::Arc;

use calbook_core::{errors::CalendarError, models::category::CategoryResponse};
use calbook_db::repositories;

use crate::{middleware::error_handling::AppError, ApiState};

/// Public listing of the fixed category registry.
#[axum::debug_handler]
pub async fn list_categories(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories = repositories::category::list_categories(&state.db_pool)
        .await
        .map_err(CalendarError::Database)?;

    let response = categories
        .into_iter()
        .map(|category| CategoryResponse {
            id: category.id,
            name: category.name,
        })
        .collect();

    Ok(Json(response))
}
