//! Authentication Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets or sensitive data.

use crate::error::AuthError;
use std::env;
use std::str::FromStr;

/// Parse an optional numeric environment variable, falling back to a default
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Authentication configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret key for signing access tokens (from JWT_SECRET env var)
    pub jwt_secret: String,

    /// Secret key for signing refresh tokens (from JWT_REFRESH_SECRET env var,
    /// falls back to JWT_SECRET)
    pub jwt_refresh_secret: String,

    /// Access token expiration in seconds (from JWT_ACCESS_EXPIRATION env var)
    pub access_token_expiration: i64,

    /// Refresh token JWT expiration in seconds (from JWT_REFRESH_EXPIRATION env var)
    pub refresh_token_expiration: i64,

    /// Lifetime of the persisted refresh token record in seconds
    /// (from REFRESH_TOKEN_STORE_EXPIRATION env var)
    pub refresh_token_store_expiration: i64,

    /// JWT issuer (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// JWT audience (from JWT_AUDIENCE env var)
    pub jwt_audience: String,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// Minimum password length (from MIN_PASSWORD_LENGTH env var)
    pub min_password_length: usize,
}

impl AuthConfig {
    /// Load configuration from environment variables
    ///
    /// Fails if JWT_SECRET is not set.
    pub fn from_env() -> Result<Self, AuthError> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AuthError::Config("JWT_SECRET environment variable must be set".into()))?;

        let jwt_refresh_secret =
            env::var("JWT_REFRESH_SECRET").unwrap_or_else(|_| jwt_secret.clone());

        Ok(Self {
            jwt_secret,
            jwt_refresh_secret,
            access_token_expiration: env_or("JWT_ACCESS_EXPIRATION", 900), // 15 minutes
            refresh_token_expiration: env_or("JWT_REFRESH_EXPIRATION", 604800), // 7 days
            refresh_token_store_expiration: env_or("REFRESH_TOKEN_STORE_EXPIRATION", 604800),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "authflow".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authflow-api".to_string()),
            argon2_memory_cost: env_or("ARGON2_MEMORY_COST", 65536), // 64 MiB
            argon2_time_cost: env_or("ARGON2_TIME_COST", 3),
            argon2_parallelism: env_or("ARGON2_PARALLELISM", 4),
            min_password_length: env_or("MIN_PASSWORD_LENGTH", 8),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.jwt_refresh_secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT_REFRESH_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.access_token_expiration <= 0 {
            return Err(AuthError::Config(
                "JWT_ACCESS_EXPIRATION must be positive".to_string(),
            ));
        }

        if self.refresh_token_expiration <= self.access_token_expiration {
            return Err(AuthError::Config(
                "JWT_REFRESH_EXPIRATION must be greater than JWT_ACCESS_EXPIRATION".to_string(),
            ));
        }

        if self.refresh_token_store_expiration <= 0 {
            return Err(AuthError::Config(
                "REFRESH_TOKEN_STORE_EXPIRATION must be positive".to_string(),
            ));
        }

        if self.min_password_length == 0 {
            return Err(AuthError::Config(
                "MIN_PASSWORD_LENGTH must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Which persistence backend the server runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
    Mongo,
}

impl FromStr for StoreBackend {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            other => Err(AuthError::Config(format!("Unknown STORE_BACKEND: {}", other))),
        }
    }
}

/// Server process configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (from BIND_ADDR env var)
    pub bind_addr: String,

    /// Store backend (from STORE_BACKEND env var)
    pub backend: StoreBackend,

    /// PostgreSQL connection string (from DATABASE_URL env var)
    pub database_url: Option<String>,

    /// MongoDB connection string (from MONGO_URI env var)
    pub mongo_uri: Option<String>,

    /// MongoDB database name (from MONGO_DB_NAME env var)
    pub mongo_db_name: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        let backend = match env::var("STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Memory,
        };

        let config = Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            backend,
            database_url: env::var("DATABASE_URL").ok(),
            mongo_uri: env::var("MONGO_URI").ok(),
            mongo_db_name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "default_db".to_string()),
        };

        match config.backend {
            StoreBackend::Postgres if config.database_url.is_none() => Err(AuthError::Config(
                "DATABASE_URL must be set for the postgres backend".to_string(),
            )),
            StoreBackend::Mongo if config.mongo_uri.is_none() => Err(AuthError::Config(
                "MONGO_URI must be set for the mongo backend".to_string(),
            )),
            _ => Ok(config),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "a".repeat(32),
        jwt_refresh_secret: "b".repeat(32),
        access_token_expiration: 900,
        refresh_token_expiration: 604800,
        refresh_token_store_expiration: 604800,
        jwt_issuer: "test".to_string(),
        jwt_audience: "test".to_string(),
        argon2_memory_cost: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
        min_password_length: 8,
    }
}
