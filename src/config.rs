use std::path::PathBuf;

use redis::aio::MultiplexedConnection;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::error::{ApiError, CacheError, Error, QueryError};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub media_root: PathBuf,
    pub max_connections: u32,
}

impl Config {
    /// Reads the configuration from the environment, an `.env` file is
    /// picked up when present. Only `DATABASE_URL` is mandatory.
    pub fn from_env() -> Result<Self, Error> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ApiError::InternalServerError.new("DATABASE_URL is not set"))?;
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| String::from("redis://127.0.0.1/"));
        let media_root = std::env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("media"));
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(8);

        Ok(Self {
            database_url,
            redis_url,
            media_root,
            max_connections,
        })
    }

    pub async fn connect_database(&self) -> Result<Pool<Postgres>, Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await
            .map_err(|e| QueryError::from(e).into())
    }

    pub async fn connect_cache(&self) -> Result<MultiplexedConnection, Error> {
        let client = redis::Client::open(self.redis_url.as_str())
            .map_err(|e| CacheError::from(e).into())?;

        client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::from(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // single test, the process environment is shared between threads
    #[test]
    fn reads_settings_from_the_environment() {
        std::env::remove_var("DATABASE_URL");
        let error = Config::from_env().unwrap_err();
        assert_eq!(error.code, 500);

        std::env::set_var("DATABASE_URL", "postgres://localhost/mealbook");
        let config = Config::from_env().unwrap();
        assert_eq!(config.redis_url, "redis://127.0.0.1/");
        assert_eq!(config.media_root, PathBuf::from("media"));
        assert_eq!(config.max_connections, 8);
        std::env::remove_var("DATABASE_URL");
    }
}
