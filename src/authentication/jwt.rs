use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::User;
use crate::error::{ApiError, Error};
use crate::schema::UserRole;

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: i32,
    pub username: String,
    pub user_uid: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: i32, username: String, uid: UserRole) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(1)).timestamp();

        Self {
            user_id: id,
            username,
            user_uid: uid,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub username: String,
    pub user_uid: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(&self) {
            return Err(
                ApiError::Unauthorized.new("You don't have permission to perform this action")
            );
        }
        Ok(())
    }
}

impl Into<SessionData> for JwtSessionData {
    fn into(self) -> SessionData {
        SessionData {
            username: self.username,
            user_id: self.user_id,
            is_admin: self.user_uid == UserRole::Admin,
            user_uid: self.user_uid,
        }
    }
}

fn jwt_key() -> Hmac<Sha256> {
    let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| String::from("secret"));
    Hmac::new_from_slice(secret.as_bytes()).unwrap()
}

pub fn generate_jwt_session(user: &User) -> String {
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.uid.to_owned());

    claims.sign_with_key(&jwt_key()).unwrap()
}

pub fn verify_jwt_session(token: String) -> Result<JwtSessionData, Error> {
    token
        .verify_with_key(&jwt_key())
        .map_err(|_| ApiError::InvalidSession.new("Invalid Session; Invalid token"))
        .map(|session: JwtSessionData| {
            let now = Local::now().timestamp();

            if (session.exp - now).is_negative() {
                return Err(ApiError::InvalidSession.new("Invalid session; Token expired"));
            }
            return Ok(session);
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 3,
            email: String::from("cook@example.com"),
            username: String::from("cook_01"),
            first_name: String::from("Ada"),
            last_name: String::from("Lovelace"),
            password: String::from("<hash>"),
            uid: UserRole::User,
        }
    }

    #[test]
    fn session_round_trips_through_token() {
        let token = generate_jwt_session(&user());
        let session = verify_jwt_session(token).unwrap();

        assert_eq!(session.user_id, 3);
        assert_eq!(session.username, "cook_01");
        assert_eq!(session.user_uid, UserRole::User);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let mut token = generate_jwt_session(&user());
        token.push('x');

        let error = verify_jwt_session(token).unwrap_err();
        assert_eq!(error.code, 401);
    }

    #[test]
    fn admin_flag_is_derived_from_role() {
        let mut user = user();
        user.uid = UserRole::Admin;

        let token = generate_jwt_session(&user);
        let session: SessionData = verify_jwt_session(token).unwrap().into();
        assert!(session.is_admin);
    }
}
