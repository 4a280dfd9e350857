use std::collections::HashSet;

use crate::{
    authentication::permissions::ActionType,
    error::{ApiError, Error, QueryError},
    jwt::SessionData,
    pagination::PageContext,
    schema::{
        IngredientEntry, Recipe, RecipeDraft, RecipePart, RecipeRead, RecipeRow, Tag, Uuid,
    },
    RECIPE_COUNT_PER_PAGE,
};

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use super::{get_profile, is_in_cart, is_favorite};

pub fn validate_recipe_draft(draft: &RecipeDraft) -> Result<(), Error> {
    if draft.tags.is_empty() {
        return Err(ApiError::InvalidRequest.new("A recipe requires at least one tag"));
    }

    let mut seen: HashSet<Uuid> = HashSet::new();
    for tag_id in &draft.tags {
        if !seen.insert(*tag_id) {
            return Err(ApiError::InvalidRequest.new("Tags can not repeat"));
        }
    }

    if draft.ingredients.is_empty() {
        return Err(ApiError::InvalidRequest.new("A recipe requires at least one ingredient"));
    }

    let mut seen: HashSet<Uuid> = HashSet::new();
    for entry in &draft.ingredients {
        if !seen.insert(entry.id) {
            return Err(ApiError::InvalidRequest.new("Ingredients can not repeat"));
        }
        if entry.amount < 1 {
            return Err(ApiError::InvalidRequest.new("Ingredient amount must be at least 1"));
        }
    }

    if draft.cooking_time < 1 {
        return Err(ApiError::InvalidRequest.new("Cooking time must be at least 1 minute"));
    }

    Ok(())
}

/// Every referenced tag and ingredient id must exist in the catalogs.
async fn ensure_catalog_refs(
    draft: &RecipeDraft,
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let tag_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
        .bind(&draft.tags)
        .fetch_one(&mut **tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if tag_count.0 as usize != draft.tags.len() {
        return Err(ApiError::InvalidRequest.new("Unknown tag id"));
    }

    let ingredient_ids: Vec<Uuid> = draft.ingredients.iter().map(|entry| entry.id).collect();
    let ingredient_count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM ingredients WHERE id = ANY($1)")
            .bind(&ingredient_ids)
            .fetch_one(&mut **tr)
            .await
            .map_err(|e| QueryError::from(e).into())?;

    if ingredient_count.0 as usize != draft.ingredients.len() {
        return Err(ApiError::InvalidRequest.new("Unknown ingredient id"));
    }

    Ok(())
}

async fn insert_tag_links(
    recipe_id: Uuid,
    tag_ids: &[Uuid],
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

    query_builder.push_values(tag_ids.iter().take(65535 / 2), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });

    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

async fn insert_ingredient_links(
    recipe_id: Uuid,
    entries: &[IngredientEntry],
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

    query_builder.push_values(entries.iter().take(65535 / 3), |mut b, entry| {
        b.push_bind(recipe_id)
            .push_bind(entry.id)
            .push_bind(entry.amount);
    });

    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

/// Creates a recipe together with its tag links and ingredient
/// associations in one transaction. Either everything is persisted or
/// nothing is.
pub async fn create_recipe(
    author_id: Uuid,
    draft: &RecipeDraft,
    image: String,
    pool: &Pool<Postgres>,
) -> Result<Uuid, Error> {
    validate_recipe_draft(draft)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()).into())?;

    ensure_catalog_refs(draft, &mut tr).await?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, cooking_time, image)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(&image)
    .fetch_optional(&mut *tr)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let recipe_id = match row {
        Some(row) => row.0,
        None => return Err(ApiError::Conflict.new("You already have a recipe with this name")),
    };

    insert_tag_links(recipe_id, &draft.tags, &mut tr).await?;
    insert_ingredient_links(recipe_id, &draft.ingredients, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()).into())?;
    Ok(recipe_id)
}

/// Replaces the recipe fields and both association sets in full. The old
/// sets are discarded and rewritten, there is no partial diff.
pub async fn update_recipe(
    recipe_id: Uuid,
    draft: &RecipeDraft,
    image: Option<String>,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    validate_recipe_draft(draft)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()).into())?;

    let author: Option<(Uuid,)> = sqlx::query_as("SELECT author_id FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .fetch_optional(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    let author_id = match author {
        Some(author) => author.0,
        None => return Err(ApiError::NotFound.new("No recipe exists with specified id")),
    };

    let clash: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM recipes WHERE name = $1 AND author_id = $2 AND id != $3")
            .bind(&draft.name)
            .bind(author_id)
            .bind(recipe_id)
            .fetch_optional(&mut *tr)
            .await
            .map_err(|e| QueryError::from(e).into())?;

    if clash.is_some() {
        return Err(ApiError::Conflict.new("You already have a recipe with this name"));
    }

    ensure_catalog_refs(draft, &mut tr).await?;

    match &image {
        Some(image) => {
            sqlx::query(
                "UPDATE recipes SET name = $1, text = $2, cooking_time = $3, image = $4 WHERE id = $5",
            )
            .bind(&draft.name)
            .bind(&draft.text)
            .bind(draft.cooking_time)
            .bind(image)
            .bind(recipe_id)
            .execute(&mut *tr)
            .await
            .map_err(|e| QueryError::from(e).into())?;
        }
        None => {
            sqlx::query("UPDATE recipes SET name = $1, text = $2, cooking_time = $3 WHERE id = $4")
                .bind(&draft.name)
                .bind(&draft.text)
                .bind(draft.cooking_time)
                .bind(recipe_id)
                .execute(&mut *tr)
                .await
                .map_err(|e| QueryError::from(e).into())?;
        }
    };

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    insert_tag_links(recipe_id, &draft.tags, &mut tr).await?;
    insert_ingredient_links(recipe_id, &draft.ingredients, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()).into())?;
    Ok(())
}

/// Deletes a recipe with its associations, favorites and cart rows.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF
pub async fn delete_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()).into())?;

    sqlx::query("DELETE FROM favorites WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM cart_items WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotFound.new("No recipe exists with specified id"));
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()).into())?;
    Ok(())
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn get_recipe_mut(
    id: Uuid,
    session: SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(ApiError::Unauthorized.default())
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(ApiError::NotFound.new("No recipe exists with specified id")),
    }
}

pub async fn list_recipe_tags(pool: &Pool<Postgres>, recipe_id: Uuid) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(list)
}

pub async fn list_recipe_parts(
    pool: &Pool<Postgres>,
    recipe_id: Uuid,
) -> Result<Vec<RecipePart>, Error> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, ri.amount AS amount,
               i.name AS name, i.measurement_unit AS measurement_unit
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

/// Assembles the full read shape. The viewer flags are existence checks
/// against the favorite and cart relations, false for anonymous viewers.
pub async fn get_recipe_full(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<RecipeRead, Error> {
    let recipe = match get_recipe(id, pool).await? {
        Some(recipe) => recipe,
        None => return Err(ApiError::NotFound.new("No recipe exists with specified id")),
    };

    let author = get_profile(recipe.author_id, viewer, pool).await?;
    let tags = list_recipe_tags(pool, id).await?;
    let ingredients = list_recipe_parts(pool, id).await?;

    let (favorited, in_cart) = match viewer {
        Some(viewer) => (
            is_favorite(id, viewer, pool).await?,
            is_in_cart(id, viewer, pool).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeRead {
        id: recipe.id,
        author,
        tags,
        ingredients,
        is_favorited: favorited,
        is_in_cart: in_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
    })
}

/// Filtered listing. The favorite and cart filters only narrow the
/// result for an authenticated viewer, anonymous requests ignore them.
pub async fn fetch_recipes(
    author: Option<Uuid>,
    tag_slugs: &[String],
    only_favorited: bool,
    only_in_cart: bool,
    viewer: Option<Uuid>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, Error> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT r.*, ");

    match viewer {
        Some(viewer) => {
            query_builder
                .push("EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ");
            query_builder.push_bind(viewer);
            query_builder
                .push(") AS is_favorited, EXISTS(SELECT 1 FROM cart_items c WHERE c.recipe_id = r.id AND c.user_id = ");
            query_builder.push_bind(viewer);
            query_builder.push(") AS is_in_cart, ");
        }
        None => {
            query_builder.push("FALSE AS is_favorited, FALSE AS is_in_cart, ");
        }
    }

    query_builder.push("COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = author {
        query_builder.push(" AND r.author_id = ");
        query_builder.push_bind(author);
    }

    if !tag_slugs.is_empty() {
        query_builder.push(
            " AND r.id IN (SELECT rt.recipe_id FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE t.slug = ANY(",
        );
        query_builder.push_bind(tag_slugs.to_vec());
        query_builder.push("))");
    }

    if let Some(viewer) = viewer {
        if only_favorited {
            query_builder
                .push(" AND EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ");
            query_builder.push_bind(viewer);
            query_builder.push(")");
        }
        if only_in_cart {
            query_builder
                .push(" AND EXISTS(SELECT 1 FROM cart_items c WHERE c.recipe_id = r.id AND c.user_id = ");
            query_builder.push_bind(viewer);
            query_builder.push(")");
        }
    }

    query_builder.push(" ORDER BY r.id DESC LIMIT ");
    query_builder.push_bind(RECIPE_COUNT_PER_PAGE);
    query_builder.push(" OFFSET ");
    query_builder.push_bind(offset);

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    let total_count = rows.get(0).map(|r| r.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, RECIPE_COUNT_PER_PAGE, offset);
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> RecipeDraft {
        RecipeDraft {
            name: String::from("Сырники"),
            text: String::from("Смешать и обжарить."),
            cooking_time: 25,
            tags: vec![1, 2],
            ingredients: vec![
                IngredientEntry { id: 10, amount: 400 },
                IngredientEntry { id: 11, amount: 2 },
            ],
        }
    }

    #[test]
    fn accepts_well_formed_draft() {
        assert!(validate_recipe_draft(&draft()).is_ok());
    }

    #[test]
    fn rejects_empty_tag_list() {
        let mut data = draft();
        data.tags.clear();
        assert_eq!(validate_recipe_draft(&data).unwrap_err().code, 400);
    }

    #[test]
    fn rejects_repeated_tags() {
        let mut data = draft();
        data.tags = vec![1, 1];
        assert_eq!(validate_recipe_draft(&data).unwrap_err().code, 400);
    }

    #[test]
    fn rejects_empty_ingredient_list() {
        let mut data = draft();
        data.ingredients.clear();
        assert_eq!(validate_recipe_draft(&data).unwrap_err().code, 400);
    }

    #[test]
    fn rejects_repeated_ingredients() {
        let mut data = draft();
        data.ingredients = vec![
            IngredientEntry { id: 10, amount: 1 },
            IngredientEntry { id: 10, amount: 5 },
        ];
        assert_eq!(validate_recipe_draft(&data).unwrap_err().code, 400);
    }

    #[test]
    fn rejects_zero_amount() {
        let mut data = draft();
        data.ingredients[0].amount = 0;
        assert_eq!(validate_recipe_draft(&data).unwrap_err().code, 400);
    }

    #[test]
    fn rejects_zero_cooking_time() {
        let mut data = draft();
        data.cooking_time = 0;
        assert_eq!(validate_recipe_draft(&data).unwrap_err().code, 400);
    }
}
