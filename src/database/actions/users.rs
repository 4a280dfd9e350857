use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    error::{ApiError, Error, QueryError},
    pagination::PageContext,
    schema::{RegisterData, User, UserProfile, UserRole, UserRow, Uuid},
    USER_COUNT_PER_PAGE,
};

use sqlx::{Pool, Postgres};

use super::is_following;

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub fn validate_register_data(data: &RegisterData) -> Result<(), Error> {
    if !data.email.contains('@') {
        return Err(ApiError::InvalidRequest.new("Invalid email address"));
    }

    let username_ok = !data.username.is_empty()
        && data
            .username
            .chars()
            .all(|c| c.is_alphanumeric() || "_.@+-".contains(c));
    if !username_ok {
        return Err(ApiError::InvalidRequest.new("Invalid username"));
    }

    if data.password.is_empty() {
        return Err(ApiError::InvalidRequest.new("Password can not be empty"));
    }

    Ok(())
}

/// Creates a user. The password is stored as an argon2 hash, email and
/// username are both unique.
pub async fn register_user(data: &RegisterData, pool: &Pool<Postgres>) -> Result<Uuid, Error> {
    validate_register_data(data)?;

    let password = hash_password(&data.password)
        .map_err(|_| ApiError::InternalServerError.new("Failed to hash password"))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password, uid)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(&data.email)
    .bind(&data.username)
    .bind(&data.first_name)
    .bind(&data.last_name)
    .bind(password)
    .bind(UserRole::User)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    match row {
        Some(row) => Ok(row.0),
        None => Err(ApiError::Conflict.new("Email or username is already registered")),
    }
}

pub async fn login_user(
    email: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = match get_user_by_email(pool, email).await? {
        Some(user) => user,
        None => return Err(ApiError::InvalidRequest.new("Invalid credentials")),
    };

    let authenticated = verify_password(password, &user.password).unwrap_or(false);
    if !authenticated {
        return Err(ApiError::InvalidRequest.new("Invalid credentials"));
    }

    Ok(generate_jwt_session(&user))
}

pub async fn set_password(
    user_id: Uuid,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if password.is_empty() {
        return Err(ApiError::InvalidRequest.new("Password can not be empty"));
    }

    let password = hash_password(password)
        .map_err(|_| ApiError::InternalServerError.new("Failed to hash password"))?;

    let result = sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotFound.new("No user exists with specified id"));
    }

    Ok(())
}

pub async fn fetch_users(
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserRow>, Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.id
        LIMIT $1 OFFSET $2
    ",
    )
    .bind(USER_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let total_count = rows.get(0).map(|u| u.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, USER_COUNT_PER_PAGE, offset);
    Ok(page)
}

/// Profile read shape. `is_subscribed` is computed against the viewer on
/// every call and is always false for anonymous viewers.
pub async fn get_profile(
    user_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, Error> {
    let user = match get_user_by_id(pool, user_id).await? {
        Some(user) => user,
        None => return Err(ApiError::NotFound.new("No user exists with specified id")),
    };

    let is_subscribed = match viewer {
        Some(viewer) => is_following(viewer, user_id, pool).await?,
        None => false,
    };

    Ok(UserProfile::from_user(user, is_subscribed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_data() -> RegisterData {
        RegisterData {
            email: String::from("cook@example.com"),
            username: String::from("cook_01"),
            first_name: String::from("Ada"),
            last_name: String::from("Lovelace"),
            password: String::from("hunter2"),
        }
    }

    #[test]
    fn accepts_well_formed_registration() {
        assert!(validate_register_data(&register_data()).is_ok());
    }

    #[test]
    fn rejects_mail_without_at_sign() {
        let mut data = register_data();
        data.email = String::from("cook.example.com");
        assert_eq!(validate_register_data(&data).unwrap_err().code, 400);
    }

    #[test]
    fn rejects_username_with_forbidden_characters() {
        let mut data = register_data();
        data.username = String::from("cook 01");
        assert_eq!(validate_register_data(&data).unwrap_err().code, 400);
    }

    #[test]
    fn rejects_empty_password() {
        let mut data = register_data();
        data.password = String::new();
        assert_eq!(validate_register_data(&data).unwrap_err().code, 400);
    }
}
