use std::convert::Infallible;

use warp::{
    reject::Rejection,
    reply::Reply,
    Filter,
};

use crate::error::{ApiError, Error};

use super::jwt::{verify_jwt_session, JwtSessionData};

pub fn with_auth() -> impl Filter<Extract = ((),), Error = Rejection> + Copy {
    warp::cookie::<String>("session").and_then(|session: String| async move {
        if let Ok(_) = verify_jwt_session(session) {
            Ok(())
        } else {
            Err(warp::reject::custom(ApiError::InvalidSession.default()))
        }
    })
}

pub fn with_session() -> impl Filter<Extract = (JwtSessionData,), Error = Rejection> + Copy {
    warp::cookie::<String>("session").and_then(|session: String| async move {
        if let Ok(data) = verify_jwt_session(session) {
            Ok(data)
        } else {
            Err(warp::reject::custom(ApiError::InvalidSession.default()))
        }
    })
}

/// Anonymous requests extract as `None` instead of being rejected, the
/// viewer-relative flags fall back to false downstream.
pub fn with_possible_session(
) -> impl Filter<Extract = (Option<JwtSessionData>,), Error = Infallible> + Copy {
    warp::cookie::optional::<String>("session").map(move |session: Option<String>| {
        match session {
            Some(session) => verify_jwt_session(session).ok(),
            None => None,
        }
    })
}

/// Maps crate errors rejected by handlers to JSON replies.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = match err.find::<Error>() {
        Some(error) => (
            error.status(),
            error
                .info
                .to_owned()
                .unwrap_or_else(|| String::from("Request failed")),
        ),
        None => {
            if err.is_not_found() {
                (warp::http::StatusCode::NOT_FOUND, String::from("Not found"))
            } else {
                log::error!("Unhandled rejection: {err:?}");
                (
                    warp::http::StatusCode::INTERNAL_SERVER_ERROR,
                    String::from("Internal server error"),
                )
            }
        }
    };

    let body = warp::reply::json(&serde_json::json!({ "error": message }));
    Ok(warp::reply::with_status(body, status))
}
