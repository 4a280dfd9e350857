use crate::{
    error::{ApiError, Error, QueryError},
    schema::{Tag, TagDraft, Uuid},
};

use sqlx::{Pool, Postgres};

/// Color must be `#` followed by exactly six hex digits.
pub fn validate_tag_color(color: &str) -> bool {
    let mut chars = color.chars();

    chars.next() == Some('#')
        && color.len() == 7
        && chars.all(|c| c.is_ascii_hexdigit())
}

pub fn validate_tag_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn validate_tag_draft(draft: &TagDraft) -> Result<(), Error> {
    if draft.name.is_empty() {
        return Err(ApiError::InvalidRequest.new("Tag name can not be empty"));
    }
    if !validate_tag_color(&draft.color) {
        return Err(ApiError::InvalidRequest.new("Tag color must use the #rrggbb format"));
    }
    if !validate_tag_slug(&draft.slug) {
        return Err(ApiError::InvalidRequest.new("Invalid tag slug"));
    }

    Ok(())
}

pub async fn create_tag(draft: &TagDraft, pool: &Pool<Postgres>) -> Result<Uuid, Error> {
    validate_tag_draft(draft)?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING id",
    )
    .bind(&draft.name)
    .bind(&draft.color)
    .bind(&draft.slug)
    .fetch_optional(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    match row {
        Some(row) => Ok(row.0),
        None => Err(ApiError::Conflict.new("A tag with this color or slug already exists")),
    }
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn find_tag(slug: &str, pool: &Pool<Postgres>) -> Result<Option<Uuid>, Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row.map(|tag| tag.0))
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(list)
}

pub async fn delete_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()).into())?;

    sqlx::query("DELETE FROM recipe_tags WHERE tag_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotFound.new("No tag exists with specified id"));
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()).into())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TagDraft {
        TagDraft {
            name: String::from("Завтрак"),
            color: String::from("#E26C2D"),
            slug: String::from("breakfast"),
        }
    }

    #[test]
    fn accepts_well_formed_tag() {
        assert!(validate_tag_draft(&draft()).is_ok());
    }

    #[test]
    fn color_requires_six_hex_digits() {
        assert!(validate_tag_color("#aabbcc"));
        assert!(validate_tag_color("#AABB00"));
        assert!(!validate_tag_color("aabbcc"));
        assert!(!validate_tag_color("#aabbc"));
        assert!(!validate_tag_color("#aabbcc0"));
        assert!(!validate_tag_color("#aabbcg"));
    }

    #[test]
    fn slug_rejects_spaces_and_unicode() {
        assert!(validate_tag_slug("breakfast-2"));
        assert!(!validate_tag_slug(""));
        assert!(!validate_tag_slug("завтрак"));
        assert!(!validate_tag_slug("break fast"));
    }

    #[test]
    fn invalid_color_fails_validation() {
        let mut data = draft();
        data.color = String::from("orange");
        assert_eq!(validate_tag_draft(&data).unwrap_err().code, 400);
    }
}
