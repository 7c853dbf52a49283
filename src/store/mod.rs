//! Persistence interfaces
//!
//! The service only sees these two traits; each backend implements both.

pub mod memory;
#[cfg(feature = "mongo")]
pub mod mongo;
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "mongo")]
pub use mongo::MongoStore;
pub use postgres::PgStore;

use crate::models::{NewRefreshToken, NewUser, RefreshToken, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Storage errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the field name
    #[error("Duplicate value for {0}")]
    Duplicate(&'static str),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate("email");
            }
        }
        StoreError::Backend(err.to_string())
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a user. Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshToken, StoreError>;

    /// All tokens currently stored for a user, oldest first
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<RefreshToken>, StoreError>;

    /// Remove every token of a user, returning how many were deleted
    async fn delete_all_by_user_id(&self, user_id: Uuid) -> Result<u64, StoreError>;
}
