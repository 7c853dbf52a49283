//! Token Issuer/Verifier
//!
//! Signs and validates the HS256 access and refresh JWTs. The refresh JWT's
//! own `exp` is checked here; the persisted record's `expires_at` is checked
//! separately by the service.

use crate::config::AuthConfig;
use crate::error::AuthError;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which kind of credential a JWT is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Identity embedded in every issued token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// JWT ID, unique per issued token
    pub jti: Uuid,
    /// Token kind
    pub typ: TokenKind,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: i64,
}

impl SigningKeys {
    fn new(secret: &str, lifetime: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }
}

/// Issues and verifies signed tokens
pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
    issuer: String,
    audience: String,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: SigningKeys::new(&config.jwt_secret, config.access_token_expiration),
            refresh: SigningKeys::new(&config.jwt_refresh_secret, config.refresh_token_expiration),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
        }
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn issue(&self, identity: &Identity, kind: TokenKind, lifetime: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(lifetime);

        let claims = TokenClaims {
            sub: identity.id,
            email: identity.email.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
            typ: kind,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys(kind).encoding)?;
        Ok(token)
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data = decode::<TokenClaims>(token, &self.keys(kind).decoding, &validation)?;

        if token_data.claims.typ != kind {
            tracing::debug!(expected = ?kind, actual = ?token_data.claims.typ, "Token kind mismatch");
            return Err(AuthError::InvalidToken);
        }

        Ok(token_data.claims)
    }

    /// Generate a short-lived access token
    pub fn issue_access_token(&self, identity: &Identity) -> Result<String, AuthError> {
        self.issue(identity, TokenKind::Access, self.access.lifetime)
    }

    /// Generate a long-lived refresh token
    pub fn issue_refresh_token(&self, identity: &Identity) -> Result<String, AuthError> {
        self.issue(identity, TokenKind::Refresh, self.refresh.lifetime)
    }

    /// Validate an access token
    pub fn verify_access_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify(token, TokenKind::Access)
    }

    /// Validate a refresh token's signature, claims and embedded expiry
    pub fn verify_refresh_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify(token, TokenKind::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let issuer = TokenIssuer::new(&test_config());
        let identity = identity();

        let token = issuer.issue_refresh_token(&identity).unwrap();
        let claims = issuer.verify_refresh_token(&token).unwrap();

        assert_eq!(claims.sub, identity.id);
        assert_eq!(claims.email, identity.email);
        assert_eq!(claims.typ, TokenKind::Refresh);
    }

    #[test]
    fn test_tokens_are_unique() {
        let issuer = TokenIssuer::new(&test_config());
        let identity = identity();

        let first = issuer.issue_refresh_token(&identity).unwrap();
        let second = issuer.issue_refresh_token(&identity).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let issuer = TokenIssuer::new(&test_config());
        let access = issuer.issue_access_token(&identity()).unwrap();

        assert!(matches!(
            issuer.verify_refresh_token(&access),
            Err(AuthError::InvalidToken)
        ));
        assert!(issuer.verify_access_token(&access).is_ok());
    }

    #[test]
    fn test_kind_checked_with_shared_secret() {
        let config = AuthConfig {
            jwt_refresh_secret: "a".repeat(32),
            ..test_config()
        };
        let issuer = TokenIssuer::new(&config);
        let access = issuer.issue_access_token(&identity()).unwrap();

        assert!(issuer.verify_refresh_token(&access).is_err());
    }

    #[test]
    fn test_expired_refresh_token_rejected() {
        let issuer = TokenIssuer::new(&test_config());
        // Well past the default 60s leeway
        let token = issuer
            .issue(&identity(), TokenKind::Refresh, -3600)
            .unwrap();

        assert!(issuer.verify_refresh_token(&token).is_err());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let issuer = TokenIssuer::new(&test_config());
        let other = TokenIssuer::new(&AuthConfig {
            jwt_refresh_secret: "c".repeat(32),
            ..test_config()
        });

        let token = other.issue_refresh_token(&identity()).unwrap();
        assert!(issuer.verify_refresh_token(&token).is_err());
    }

    #[test]
    fn test_malformed_token_rejected() {
        let issuer = TokenIssuer::new(&test_config());
        assert!(issuer.verify_refresh_token("not.a.jwt").is_err());
        assert!(issuer.verify_refresh_token("").is_err());
    }
}
