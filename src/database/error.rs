use std::fmt::{self, Display};

use warp::http::StatusCode;
use warp::reject::{Reject, Rejection};

#[derive(Debug, Clone)]
pub struct Error {
    pub code: u16,
    pub info: Option<String>,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.info {
            Some(info) => write!(f, "[{}] {}", self.code, info),
            None => write!(f, "[{}]", self.code),
        }
    }
}

impl std::error::Error for Error {}
impl Reject for Error {}

#[derive(Debug, Clone, Copy)]
pub enum ApiError {
    InvalidRequest,
    Conflict,
    NotFound,
    Unauthorized,
    InvalidSession,
    InternalServerError,
}

impl ApiError {
    fn code(self) -> u16 {
        match self {
            ApiError::InvalidRequest => 400,
            ApiError::Conflict => 409,
            ApiError::NotFound => 404,
            ApiError::Unauthorized => 401,
            ApiError::InvalidSession => 401,
            ApiError::InternalServerError => 500,
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            code: self.code(),
            info: Some(info.to_string()),
        }
    }

    pub fn default(self) -> Error {
        Error {
            code: self.code(),
            info: None,
        }
    }
}

pub struct QueryError {
    info: String,
    unique_violation: bool,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            unique_violation: false,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self {
                info: format!("{e}"),
                unique_violation: e.is_unique_violation(),
            },
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::AnyDriverError(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(format!("Unknown error")),
        }
    }
}

impl Into<Error> for QueryError {
    fn into(self) -> Error {
        // Constraint races on the toggle relations surface as conflicts,
        // never as silent success or duplicates.
        if self.unique_violation {
            ApiError::Conflict.new(&self.info)
        } else {
            Error {
                code: 500,
                info: Some(self.info),
            }
        }
    }
}

pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl Into<Error> for CacheError {
    fn into(self) -> Error {
        Error {
            code: 500,
            info: Some(self.info),
        }
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Into<Error> for TypeError {
    fn into(self) -> Error {
        ApiError::InvalidRequest.new(&self.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

impl Into<Rejection> for TypeError {
    fn into(self) -> Rejection {
        warp::reject::custom(ApiError::InvalidRequest.new(&self.info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_codes() {
        assert_eq!(ApiError::InvalidRequest.default().code, 400);
        assert_eq!(ApiError::Conflict.default().code, 409);
        assert_eq!(ApiError::NotFound.default().code, 404);
        assert_eq!(ApiError::Unauthorized.default().code, 401);
        assert_eq!(ApiError::InternalServerError.default().code, 500);
    }

    #[test]
    fn error_display_includes_info() {
        let error = ApiError::Conflict.new("already favorited");
        assert_eq!(format!("{error}"), "[409] already favorited");
        assert_eq!(error.status(), warp::http::StatusCode::CONFLICT);
    }

    #[test]
    fn type_error_maps_to_invalid_request() {
        let error: Error = TypeError::new("bad payload").into();
        assert_eq!(error.code, 400);
        assert_eq!(error.info.as_deref(), Some("bad payload"));
    }
}
