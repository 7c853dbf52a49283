//! MongoDB document store, enabled with the `mongo` feature.

use super::{RefreshTokenStore, StoreError, UserStore};
use crate::models::{NewRefreshToken, NewUser, RefreshToken, Role, User};

use async_trait::async_trait;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: Role,
    active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl TryFrom<UserDocument> for User {
    type Error = StoreError;

    fn try_from(doc: UserDocument) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_id(&doc.id)?,
            name: doc.name,
            email: doc.email,
            password_hash: doc.password_hash,
            role: doc.role,
            active: doc.active,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RefreshTokenDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    token_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    expires_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

impl From<&RefreshToken> for RefreshTokenDocument {
    fn from(token: &RefreshToken) -> Self {
        Self {
            id: token.id.to_string(),
            user_id: token.user_id.to_string(),
            token_hash: token.token_hash.clone(),
            expires_at: token.expires_at,
            created_at: token.created_at,
            updated_at: token.updated_at,
        }
    }
}

impl TryFrom<RefreshTokenDocument> for RefreshToken {
    type Error = StoreError;

    fn try_from(doc: RefreshTokenDocument) -> Result<Self, Self::Error> {
        Ok(RefreshToken {
            id: parse_id(&doc.id)?,
            user_id: parse_id(&doc.user_id)?,
            token_hash: doc.token_hash,
            expires_at: doc.expires_at,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Backend(format!("Malformed id {}: {}", raw, e)))
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if let ErrorKind::Write(WriteFailure::WriteError(ref write_error)) = *err.kind {
            if write_error.code == DUPLICATE_KEY {
                return StoreError::Duplicate("email");
            }
        }
        StoreError::Backend(err.to_string())
    }
}

#[derive(Clone)]
pub struct MongoStore {
    users: Collection<UserDocument>,
    refresh_tokens: Collection<RefreshTokenDocument>,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);

        tracing::info!(database = db_name, "MongoDB connected");

        Ok(Self {
            users: db.collection("users"),
            refresh_tokens: db.collection("refresh_tokens"),
        })
    }

    /// Create the unique email index and the token owner index
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users.create_index(email_index).await?;

        let owner_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .build();
        self.refresh_tokens.create_index(owner_index).await?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.users
            .find_one(doc! { "email": email })
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.users
            .find_one(doc! { "_id": id.to_string() })
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let user = user.into_user();
        self.users.insert_one(UserDocument::from(&user)).await?;
        Ok(user)
    }
}

#[async_trait]
impl RefreshTokenStore for MongoStore {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshToken, StoreError> {
        let token = token.into_token();
        self.refresh_tokens
            .insert_one(RefreshTokenDocument::from(&token))
            .await?;
        Ok(token)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<RefreshToken>, StoreError> {
        let documents: Vec<RefreshTokenDocument> = self
            .refresh_tokens
            .find(doc! { "user_id": user_id.to_string() })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;

        documents.into_iter().map(RefreshToken::try_from).collect()
    }

    async fn delete_all_by_user_id(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = self
            .refresh_tokens
            .delete_many(doc! { "user_id": user_id.to_string() })
            .await?;
        Ok(result.deleted_count)
    }
}

#[cfg(all(test, feature = "mongo"))]
mod tests {
    use super::*;
    use bson::Bson;
    use chrono::TimeZone;

    fn at_millis(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: Role::User,
            active: true,
            created_at: at_millis(1_700_000_000_000),
            updated_at: at_millis(1_700_000_000_500),
        }
    }

    #[test]
    fn test_user_document_round_trip() {
        let user = user();

        let stored = bson::to_document(&UserDocument::from(&user)).unwrap();
        assert_eq!(stored.get_str("_id").unwrap(), user.id.to_string());
        assert_eq!(stored.get_str("role").unwrap(), "user");
        assert!(matches!(stored.get("created_at"), Some(Bson::DateTime(_))));

        let loaded: UserDocument = bson::from_document(stored).unwrap();
        let loaded = User::try_from(loaded).unwrap();
        assert_eq!(loaded.id, user.id);
        assert_eq!(loaded.email, user.email);
        assert_eq!(loaded.role, user.role);
        assert_eq!(loaded.created_at, user.created_at);
        assert_eq!(loaded.updated_at, user.updated_at);
    }

    #[test]
    fn test_refresh_token_document_round_trip() {
        let token = RefreshToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "$argon2id$stub".to_string(),
            expires_at: at_millis(1_700_604_800_000),
            created_at: at_millis(1_700_000_000_000),
            updated_at: at_millis(1_700_000_000_000),
        };

        let stored = bson::to_document(&RefreshTokenDocument::from(&token)).unwrap();
        assert_eq!(stored.get_str("user_id").unwrap(), token.user_id.to_string());
        assert_eq!(
            stored.get_datetime("expires_at").unwrap().timestamp_millis(),
            1_700_604_800_000
        );

        let loaded: RefreshTokenDocument = bson::from_document(stored).unwrap();
        let loaded = RefreshToken::try_from(loaded).unwrap();
        assert_eq!(loaded.id, token.id);
        assert_eq!(loaded.user_id, token.user_id);
        assert_eq!(loaded.expires_at, token.expires_at);
    }

    #[test]
    fn test_dates_sort_chronologically() {
        let whole = bson::to_document(&UserDocument::from(&User {
            created_at: at_millis(1_700_000_001_000),
            ..user()
        }))
        .unwrap();
        let fractional = bson::to_document(&UserDocument::from(&User {
            created_at: at_millis(1_700_000_000_500),
            ..user()
        }))
        .unwrap();

        let whole = whole.get_datetime("created_at").unwrap();
        let fractional = fractional.get_datetime("created_at").unwrap();
        assert!(fractional < whole);
    }

    #[test]
    fn test_malformed_id_is_backend_error() {
        assert!(matches!(parse_id("not-a-uuid"), Err(StoreError::Backend(_))));

        let mut document = UserDocument::from(&user());
        document.id = "not-a-uuid".to_string();
        assert!(matches!(User::try_from(document), Err(StoreError::Backend(_))));

        let mut document = RefreshTokenDocument::from(&RefreshToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "hash".to_string(),
            expires_at: at_millis(0),
            created_at: at_millis(0),
            updated_at: at_millis(0),
        });
        document.user_id = "42".to_string();
        assert!(matches!(
            RefreshToken::try_from(document),
            Err(StoreError::Backend(_))
        ));
    }
}
