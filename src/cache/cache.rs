use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};

use crate::actions::{list_ingredients, list_tags};
use crate::error::{CacheError, Error};
use crate::schema::{Ingredient, Tag};

/*
Only the static reference catalogs are cached. Viewer-relative flags and
the shopping list are always computed against the store, a cached copy
would go stale the moment another request toggles a relation.
*/

const TAG_CATALOG_KEY: &str = "catalog:tags";
const INGREDIENT_CATALOG_KEY: &str = "catalog:ingredients";

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
pub struct TagCatalog {
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
pub struct IngredientCatalog {
    pub ingredients: Vec<Ingredient>,
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache
        .set(key, value)
        .await
        .map_err(|e| CacheError::from(e).into())?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache
        .del(key)
        .await
        .map_err(|e| CacheError::from(e).into())?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, Error> {
    let value: Option<V> = cache
        .get(key)
        .await
        .map_err(|e| CacheError::from(e).into())?;

    Ok(value)
}

// Cache - catalog wrappers

/// Tag catalog with read-through caching. Cache faults degrade to a
/// plain store read.
pub async fn cached_tag_catalog(
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Tag>, Error> {
    match get_cache_value::<&str, TagCatalog>(TAG_CATALOG_KEY, cache).await {
        Ok(Some(catalog)) => return Ok(catalog.tags),
        Ok(None) => {}
        Err(e) => log::error!("> Failed to read tag catalog from cache: {e}"),
    }

    let tags = list_tags(pool).await?;

    if let Err(e) = set_cache_value(TAG_CATALOG_KEY, TagCatalog { tags: tags.clone() }, cache).await
    {
        log::error!("> Failed to store tag catalog: {e}");
    }

    Ok(tags)
}

pub async fn cached_ingredient_catalog(
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Ingredient>, Error> {
    match get_cache_value::<&str, IngredientCatalog>(INGREDIENT_CATALOG_KEY, cache).await {
        Ok(Some(catalog)) => return Ok(catalog.ingredients),
        Ok(None) => {}
        Err(e) => log::error!("> Failed to read ingredient catalog from cache: {e}"),
    }

    let ingredients = list_ingredients(pool).await?;

    if let Err(e) = set_cache_value(
        INGREDIENT_CATALOG_KEY,
        IngredientCatalog {
            ingredients: ingredients.clone(),
        },
        cache,
    )
    .await
    {
        log::error!("> Failed to store ingredient catalog: {e}");
    }

    Ok(ingredients)
}

/// Called after any tag catalog write.
pub async fn invalidate_tag_catalog(cache: &mut MultiplexedConnection) -> Result<(), Error> {
    delete_cache_value(TAG_CATALOG_KEY, cache).await
}

/// Called after any ingredient catalog write.
pub async fn invalidate_ingredient_catalog(
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    delete_cache_value(INGREDIENT_CATALOG_KEY, cache).await
}
