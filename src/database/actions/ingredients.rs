use crate::{
    error::{ApiError, Error, QueryError},
    schema::{Ingredient, IngredientDraft, Uuid},
    translit::normalize_search_term,
};

use sqlx::{Pool, Postgres};

pub async fn list_ingredients(pool: &Pool<Postgres>) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY id DESC")
        .fetch_all(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

/// Case-insensitive containment search on the normalized term, see
/// [`normalize_search_term`] for the keyboard-layout handling.
pub async fn search_ingredients(
    query: &str,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let term = normalize_search_term(query);

    let rows: Vec<Ingredient> = sqlx::query_as(
        "SELECT * FROM ingredients WHERE name ILIKE '%' || $1 || '%' ORDER BY name",
    )
    .bind(term)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

pub async fn get_ingredient(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

/// Names are not unique, the same name may exist with another unit.
pub async fn create_ingredient(
    draft: &IngredientDraft,
    pool: &Pool<Postgres>,
) -> Result<Uuid, Error> {
    if draft.name.is_empty() {
        return Err(ApiError::InvalidRequest.new("Ingredient name can not be empty"));
    }
    if draft.measurement_unit.is_empty() {
        return Err(ApiError::InvalidRequest.new("Measurement unit can not be empty"));
    }

    let row: (Uuid,) = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
    )
    .bind(&draft.name)
    .bind(&draft.measurement_unit)
    .fetch_one(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(row.0)
}

pub async fn delete_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()).into())?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE ingredient_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotFound.new("No ingredient exists with specified id"));
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()).into())?;
    Ok(())
}
