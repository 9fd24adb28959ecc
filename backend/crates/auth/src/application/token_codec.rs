//! Token codec
//!
//! Signs and validates bearer JWTs. Access and refresh tokens use separate
//! HMAC secrets so a leaked key only compromises one kind.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use kernel::id::{SessionId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::config::AuthConfig;
use crate::domain::entity::User;
use crate::domain::value_object::token_type::TokenType;

/// Algorithm used for issuance
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Algorithms accepted on validation. Anything outside the HMAC family is
/// rejected before the signature is looked at.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("wrong token type")]
    WrongType,

    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,

    #[error("failed to sign token: {0}")]
    Encoding(String),
}

impl TokenError {
    /// Signing failures are ours; every other variant is a bad client token.
    pub fn is_server_fault(&self) -> bool {
        matches!(self, TokenError::Encoding(_))
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            JwtErrorKind::ExpiredSignature => TokenError::Expired,
            JwtErrorKind::InvalidSignature => TokenError::InvalidSignature,
            JwtErrorKind::InvalidAlgorithm
            | JwtErrorKind::InvalidAlgorithmName
            | JwtErrorKind::MissingAlgorithm => TokenError::UnsupportedAlgorithm,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// JWT claims carried by both token kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id
    pub sub: UserId,
    /// Display name
    pub name: String,
    pub email: String,
    /// Session id
    pub sid: SessionId,
    /// Device id
    pub did: String,
    pub typ: TokenType,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
    /// Per-issuance id; set on access tokens minted by a refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Assign a fresh `jti` so the token differs from any other with the same
    /// claims.
    pub fn with_unique_id(mut self) -> Self {
        self.jti = Some(uuid::Uuid::new_v4().to_string());
        self
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    issuer: String,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(&config.access_secret),
            access_decoding: DecodingKey::from_secret(&config.access_secret),
            refresh_encoding: EncodingKey::from_secret(&config.refresh_secret),
            refresh_decoding: DecodingKey::from_secret(&config.refresh_secret),
            issuer: config.issuer.clone(),
            access_ttl: config.access_ttl_chrono(),
            refresh_ttl: config.refresh_ttl_chrono(),
        }
    }

    /// Claims for a new token of `typ`, valid from now for the configured
    /// lifetime.
    pub fn claims_for(
        &self,
        user: &User,
        session_id: SessionId,
        device_id: &str,
        typ: TokenType,
    ) -> TokenClaims {
        let now = Utc::now();
        let ttl = match typ {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };

        TokenClaims {
            sub: user.id,
            name: user.name.clone(),
            email: user.email.as_str().to_owned(),
            sid: session_id,
            did: device_id.to_owned(),
            typ,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
            jti: None,
        }
    }

    /// Sign claims with the secret of their declared type.
    pub fn issue(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let key = match claims.typ {
            TokenType::Access => &self.access_encoding,
            TokenType::Refresh => &self.refresh_encoding,
        };

        jsonwebtoken::encode(&Header::new(SIGNING_ALGORITHM), claims, key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature, algorithm, time window and issuer with the secret of
    /// `expected`, then check the declared type.
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<TokenClaims, TokenError> {
        let key = match expected {
            TokenType::Access => &self.access_decoding,
            TokenType::Refresh => &self.refresh_decoding,
        };

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "sub"]);

        let data = jsonwebtoken::decode::<TokenClaims>(token, key, &validation)?;

        if data.claims.typ != expected {
            return Err(TokenError::WrongType);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::email::Email;
    use platform::password::ClearTextPassword;

    fn config() -> AuthConfig {
        AuthConfig {
            access_secret: b"access-secret-for-tests".to_vec(),
            refresh_secret: b"refresh-secret-for-tests".to_vec(),
            ..Default::default()
        }
    }

    fn user() -> User {
        let hash = ClearTextPassword::new("Correct-Horse-42".into())
            .unwrap()
            .hash(None)
            .unwrap();
        User::new("Alice", Email::new("alice@example.com").unwrap(), hash)
    }

    #[test]
    fn test_issue_validate_roundtrip() {
        let codec = TokenCodec::new(&config());
        let claims = codec.claims_for(&user(), SessionId::new(), "dev-1", TokenType::Access);

        let token = codec.issue(&claims).unwrap();
        let decoded = codec.validate(&token, TokenType::Access).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_refresh_roundtrip_and_expiry_helper() {
        let codec = TokenCodec::new(&config());
        let claims = codec.claims_for(&user(), SessionId::new(), "dev-1", TokenType::Refresh);
        let token = codec.issue(&claims).unwrap();
        let decoded = codec.validate(&token, TokenType::Refresh).unwrap();
        assert_eq!(decoded.expires_at().timestamp(), claims.exp);
        assert_eq!(decoded.typ, TokenType::Refresh);
    }

    #[test]
    fn test_cross_type_fails_closed() {
        let codec = TokenCodec::new(&config());
        let u = user();
        let sid = SessionId::new();

        let access = codec
            .issue(&codec.claims_for(&u, sid, "d", TokenType::Access))
            .unwrap();
        let refresh = codec
            .issue(&codec.claims_for(&u, sid, "d", TokenType::Refresh))
            .unwrap();

        // different secret => signature check fails first
        assert_eq!(
            codec.validate(&access, TokenType::Refresh),
            Err(TokenError::InvalidSignature)
        );
        assert_eq!(
            codec.validate(&refresh, TokenType::Access),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_declared_type_with_right_secret() {
        let codec = TokenCodec::new(&config());
        let mut claims = codec.claims_for(&user(), SessionId::new(), "d", TokenType::Access);
        claims.typ = TokenType::Refresh;

        // tagged refresh but signed with the access secret
        let forged = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"access-secret-for-tests"),
        )
        .unwrap();
        assert_eq!(
            codec.validate(&forged, TokenType::Access),
            Err(TokenError::WrongType)
        );
    }

    #[test]
    fn test_expired_is_distinct() {
        let codec = TokenCodec::new(&config());
        let mut claims = codec.claims_for(&user(), SessionId::new(), "d", TokenType::Access);
        claims.iat -= 3600;
        claims.nbf -= 3600;
        claims.exp = Utc::now().timestamp() - 60;
        let token = codec.issue(&claims).unwrap();

        assert_eq!(codec.validate(&token, TokenType::Access), Err(TokenError::Expired));
    }

    #[test]
    fn test_non_hmac_algorithm_rejected() {
        let codec = TokenCodec::new(&config());
        // {"alg":"none","typ":"JWT"}
        let header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
        let token = format!("{header}.e30.");
        let err = codec.validate(&token, TokenType::Access).unwrap_err();
        assert!(matches!(
            err,
            TokenError::UnsupportedAlgorithm | TokenError::Malformed(_)
        ));
        assert!(!err.is_server_fault());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = TokenCodec::new(&config());
        assert!(matches!(
            codec.validate("not-a-jwt", TokenType::Access),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_unique_id_makes_tokens_distinct() {
        let codec = TokenCodec::new(&config());
        let base = codec.claims_for(&user(), SessionId::new(), "d", TokenType::Access);
        let a = codec.issue(&base.clone().with_unique_id()).unwrap();
        let b = codec.issue(&base.with_unique_id()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let codec = TokenCodec::new(&config());
        let other = TokenCodec::new(&AuthConfig {
            issuer: "someone-else".into(),
            ..config()
        });
        let claims = other.claims_for(&user(), SessionId::new(), "d", TokenType::Access);
        let token = other.issue(&claims).unwrap();
        assert!(matches!(
            codec.validate(&token, TokenType::Access),
            Err(TokenError::Malformed(_))
        ));
    }
}
