use crate::{
    error::{ApiError, Error, QueryError},
    schema::{FollowedAuthor, RecipePreview, User, UserProfile, Uuid},
};

use sqlx::{Pool, Postgres};

use super::get_user_by_id;

/// Self-follow is rejected as a standing invariant, before any query.
pub fn validate_follow(user_id: Uuid, author_id: Uuid) -> Result<(), Error> {
    if user_id == author_id {
        return Err(ApiError::InvalidRequest.new("You can not follow yourself"));
    }

    Ok(())
}

pub async fn follow_author(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    validate_follow(user_id, author_id)?;

    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(ApiError::NotFound.new("No user exists with specified id"));
    }

    let result = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::Conflict.new("Already following this author"));
    }

    Ok(())
}

pub async fn unfollow_author(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotFound.new("Not following this author"));
    }

    Ok(())
}

pub async fn is_following(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "SELECT author_id FROM follows WHERE user_id = $1 AND author_id = $2",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(result.is_some())
}

/// Lists the authors followed by a user, each with their full recipe
/// count and a preview of at most `recipe_limit` recipes.
pub async fn list_followed_authors(
    user_id: Uuid,
    recipe_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<FollowedAuthor>, Error> {
    let authors: Vec<User> = sqlx::query_as(
        "
        SELECT u.*
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY f.id DESC
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let mut list: Vec<FollowedAuthor> = Vec::with_capacity(authors.len());

    for author in authors {
        let recipes_count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
                .bind(author.id)
                .fetch_one(pool)
                .await
                .map_err(|e| QueryError::from(e).into())?;

        let recipes: Vec<RecipePreview> = match recipe_limit {
            Some(limit) => sqlx::query_as(
                "SELECT id, name, image, cooking_time FROM recipes WHERE author_id = $1 LIMIT $2",
            )
            .bind(author.id)
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(|e| QueryError::from(e).into())?,
            None => sqlx::query_as(
                "SELECT id, name, image, cooking_time FROM recipes WHERE author_id = $1",
            )
            .bind(author.id)
            .fetch_all(pool)
            .await
            .map_err(|e| QueryError::from(e).into())?,
        };

        list.push(FollowedAuthor {
            author: UserProfile::from_user(author, true),
            recipes_count: recipes_count.0,
            recipes,
        });
    }

    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_follow_is_always_rejected() {
        let error = validate_follow(7, 7).unwrap_err();
        assert_eq!(error.code, 400);
        assert_eq!(error.info.as_deref(), Some("You can not follow yourself"));
    }

    #[test]
    fn distinct_users_pass_validation() {
        assert!(validate_follow(7, 8).is_ok());
    }
}
