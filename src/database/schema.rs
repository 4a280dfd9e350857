use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub uid: UserRole,
}

/// Read shape of a user, relative to the requesting viewer.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserProfile {
    pub fn from_user(user: User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,

    pub count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterData {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagDraft {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientDraft {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: String,
    pub pub_date: DateTime<Utc>,
}

/// Listing row with viewer flags and the window total used for pagination.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: String,
    pub pub_date: DateTime<Utc>,

    pub is_favorited: bool,
    pub is_in_cart: bool,

    pub count: i64,
}

/// One ingredient association of a recipe, joined with catalog data.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipePart {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub amount: i32,
    pub name: String,
    pub measurement_unit: String,
}

/// Full read shape of a recipe. The viewer flags are recomputed on every
/// read, they are never stored on the entity.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeRead {
    pub id: Uuid,
    pub author: UserProfile,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipePart>,
    pub is_favorited: bool,
    pub is_in_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipePreview {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

/// Write shape of a recipe. The ingredient and tag lists always replace
/// the previous association sets in full.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientEntry {
    pub id: Uuid,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowedAuthor {
    pub author: UserProfile,
    pub recipes_count: i64,
    pub recipes: Vec<RecipePreview>,
}

/// One raw cart line prior to aggregation.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct CartIngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListRow {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}
