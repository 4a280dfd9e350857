use crate::{
    error::{ApiError, Error, QueryError},
    schema::Uuid,
};

use sqlx::{Pool, Postgres};

use super::get_recipe;

/*
Favorite and cart membership are two parallel user-recipe relations with
identical shape and fully independent state. Both rely on the unique
(user_id, recipe_id) constraint to resolve concurrent duplicate inserts.
*/

pub async fn is_favorite(id: Uuid, user_id: Uuid, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "SELECT recipe_id FROM favorites WHERE recipe_id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(result.is_some())
}

pub async fn add_to_favorites(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if get_recipe(id, pool).await?.is_none() {
        return Err(ApiError::NotFound.new("No recipe exists with specified id"));
    }

    let result = sqlx::query(
        "INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::Conflict.new("Recipe is already in favorites"));
    }

    Ok(())
}

pub async fn remove_from_favorites(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotFound.new("Recipe is not in favorites"));
    }

    Ok(())
}

pub async fn is_in_cart(id: Uuid, user_id: Uuid, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "SELECT recipe_id FROM cart_items WHERE recipe_id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(result.is_some())
}

pub async fn add_to_cart(id: Uuid, user_id: Uuid, pool: &Pool<Postgres>) -> Result<(), Error> {
    if get_recipe(id, pool).await?.is_none() {
        return Err(ApiError::NotFound.new("No recipe exists with specified id"));
    }

    let result = sqlx::query(
        "INSERT INTO cart_items (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::Conflict.new("Recipe is already in shopping cart"));
    }

    Ok(())
}

pub async fn remove_from_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotFound.new("Recipe is not in shopping cart"));
    }

    Ok(())
}
