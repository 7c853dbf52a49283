//! Authflow Authentication Service
//!
//! Registration, login, token refresh and logout over pluggable stores:
//! - Argon2id hashing for passwords and stored refresh tokens
//! - HS256 JWT access and refresh tokens
//! - Hashed refresh token persistence with a server-side expiry
//! - Full session revocation on logout
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `JWT_SECRET` - Secret key for signing access tokens (required, min 32 chars)
//! - `JWT_REFRESH_SECRET` - Secret key for signing refresh tokens (defaults to `JWT_SECRET`)
//! - `JWT_ACCESS_EXPIRATION` - Access token expiration in seconds (default: 900)
//! - `JWT_REFRESH_EXPIRATION` - Refresh token expiration in seconds (default: 604800)
//! - `REFRESH_TOKEN_STORE_EXPIRATION` - Stored refresh token lifetime in seconds (default: 604800)
//! - `STORE_BACKEND` - `memory`, `postgres` or `mongo` (default: `memory`)
//! - `DATABASE_URL` - PostgreSQL connection string (postgres backend)
//! - `MONGO_URI` / `MONGO_DB_NAME` - MongoDB connection (mongo backend, `mongo` feature)
//!
//! # Usage
//!
//! ```rust,ignore
//! use authflow::{create_routes, AuthConfig, AuthService, PgStore};
//!
//! let store = Arc::new(PgStore::connect(&database_url).await?);
//! store.migrate().await?;
//!
//! let auth = Arc::new(AuthService::new(store.clone(), store, AuthConfig::from_env()?)?);
//! let app = create_routes(auth);
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod hasher;
pub mod models;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use config::{AuthConfig, ServerConfig, StoreBackend};
pub use error::AuthError;
pub use extractors::AuthUser;
pub use handlers::{create_routes, AuthState};
pub use hasher::CredentialHasher;
pub use models::*;
pub use service::AuthService;
#[cfg(feature = "mongo")]
pub use store::MongoStore;
pub use store::{MemoryStore, PgStore, RefreshTokenStore, StoreError, UserStore};
pub use token::{Identity, TokenClaims, TokenIssuer, TokenKind};
