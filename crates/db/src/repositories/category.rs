use crate::models::DbCategory;
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn list_categories(pool: &Pool<Postgres>) -> Result<Vec<DbCategory>> {
    let categories = sqlx::query_as::<_, DbCategory>(
        r#"
        SELECT id, name, created_at
        FROM categories
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

pub async fn get_category_by_id(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<DbCategory>> {
    let category = sqlx::query_as::<_, DbCategory>(
        r#"
        SELECT id, name, created_at
        FROM categories
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(category)
}
