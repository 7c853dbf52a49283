//! Authentication Service
//!
//! Orchestrates the hasher, the token issuer and the two stores to implement
//! register, login, refresh and logout.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::hasher::CredentialHasher;
use crate::models::*;
use crate::store::{RefreshTokenStore, UserStore};
use crate::token::{Identity, TokenClaims, TokenIssuer};

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Authentication service
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    config: AuthConfig,
    hasher: CredentialHasher,
    tokens: TokenIssuer,
    /// Verified on the unknown-email login path so it costs as much as a wrong password
    dummy_digest: String,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        let hasher = CredentialHasher::new(&config)?;
        let tokens = TokenIssuer::new(&config);
        let dummy_digest = hasher.hash(&Uuid::new_v4().to_string())?;

        Ok(Self {
            users,
            refresh_tokens,
            config,
            hasher,
            tokens,
            dummy_digest,
        })
    }

    /// Get reference to the token issuer
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    // ============================================
    // Token Issuance
    // ============================================

    /// Issue an access/refresh pair and persist the hashed refresh token
    async fn issue_session(&self, user: &User) -> Result<AuthResponse, AuthError> {
        let identity = Identity {
            id: user.id,
            email: user.email.clone(),
        };

        let access_token = self.tokens.issue_access_token(&identity)?;
        let refresh_token = self.tokens.issue_refresh_token(&identity)?;

        let expires_at = Utc::now() + Duration::seconds(self.config.refresh_token_store_expiration);
        let token_hash = self.hasher.hash(&refresh_token)?;

        RefreshTokenStore::create(
            self.refresh_tokens.as_ref(),
            NewRefreshToken {
                user_id: user.id,
                token_hash,
                expires_at,
            },
        )
        .await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            user: UserResponse::from(user),
        })
    }

    // ============================================
    // User Registration
    // ============================================

    /// Register a new user and open a session for it
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&req.email);

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailExists);
        }

        if req.password.chars().count() < self.config.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.config.min_password_length
            )));
        }

        let role = match req.role.as_deref() {
            Some(role) => role.parse::<Role>()?,
            None => Role::default(),
        };

        let new_user = NewUser {
            name: req.name.trim().to_string(),
            email,
            password_hash: self.hasher.hash(&req.password)?,
            role,
            active: true,
        };
        validate_new_user(&new_user)?;

        // A concurrent registration that slipped past the lookup is caught
        // by the store's unique constraint and surfaces as EmailExists.
        let user = UserStore::create(self.users.as_ref(), new_user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");

        self.issue_session(&user).await
    }

    // ============================================
    // Login / Logout
    // ============================================

    /// Verify credentials and open an additional session
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&req.email);

        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                let _ = self.hasher.verify(&req.password, &self.dummy_digest);
                tracing::warn!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(&req.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let response = self.issue_session(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(response)
    }

    /// Revoke every refresh token of a user
    pub async fn logout(&self, user_id: Uuid) -> Result<MessageResponse, AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let revoked = self.refresh_tokens.delete_all_by_user_id(user.id).await?;

        tracing::info!(user_id = %user.id, revoked, "User logged out");
        Ok(MessageResponse::new("User logged out successfully"))
    }

    // ============================================
    // Token Refresh
    // ============================================

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token itself is not rotated. Every failure is reported as
    /// [`AuthError::TokenRefreshFailed`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessTokenResponse, AuthError> {
        match self.try_refresh(refresh_token).await {
            Ok(access_token) => Ok(AccessTokenResponse { access_token }),
            Err(cause) => {
                tracing::warn!("Token refresh failed");
                tracing::debug!(cause = %cause, "Token refresh failure cause");
                Err(AuthError::TokenRefreshFailed)
            }
        }
    }

    async fn try_refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.tokens.verify_refresh_token(refresh_token)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let stored = self.refresh_tokens.find_by_user_id(user.id).await?;
        if stored.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        // Expired records can never match, so they are not worth a hash
        let now = Utc::now();
        let mut matched = false;
        for record in stored.iter().filter(|record| !record.is_expired_at(now)) {
            if self.hasher.verify(refresh_token, &record.token_hash)? {
                matched = true;
                break;
            }
        }
        if !matched {
            return Err(AuthError::InvalidToken);
        }

        let access_token = self.tokens.issue_access_token(&Identity {
            id: user.id,
            email: user.email.clone(),
        })?;

        tracing::debug!(user_id = %user.id, "Access token refreshed");
        Ok(access_token)
    }

    // ============================================
    // Access Tokens
    // ============================================

    /// Validate an access token presented on an authenticated request
    pub fn authenticate(&self, access_token: &str) -> Result<TokenClaims, AuthError> {
        self.tokens.verify_access_token(access_token)
    }

    /// Get user by ID
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.users.find_by_id(user_id).await?)
    }
}
