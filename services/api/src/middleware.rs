//! Authentication middleware for JWT access tokens
//!
//! Tokens are issued by the external identity provider. A verified token
//! becomes an [`AuthUser`] in the request extensions, which handlers pass
//! explicitly into every workflow call.

use anyhow::Result;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{config::AuthConfig, error::ApiError, profiles, state::AppState};

/// JWT claims issued by the identity provider
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    /// Expiration time
    pub exp: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    pub full_name: Option<String>,
}

/// Authenticated user for the current request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// Verifies access tokens with a fixed key and validation policy
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Build a verifier from configuration
    ///
    /// An RS256 public key takes precedence over an HS256 shared secret.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let mut verifier = if let Some(public_key) = &config.jwt_public_key {
            Self::from_rsa_pem(&read_key(public_key)?)?
        } else if let Some(secret) = &config.jwt_secret {
            Self::from_secret(secret.as_bytes())
        } else {
            anyhow::bail!("either auth.jwt_public_key or auth.jwt_secret must be set");
        };

        if let Some(audience) = &config.audience {
            verifier.validation.set_audience(&[audience]);
            verifier.validation.validate_aud = true;
        }

        Ok(verifier)
    }

    pub fn from_rsa_pem(pem: &str) -> Result<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to create decoding key: {}", e))?;
        Ok(Self::new(decoding_key, Algorithm::RS256))
    }

    pub fn from_secret(secret: &[u8]) -> Self {
        Self::new(DecodingKey::from_secret(secret), Algorithm::HS256)
    }

    fn new(decoding_key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.validate_aud = false;
        Self {
            decoding_key,
            validation,
        }
    }

    /// Validate a token and turn its claims into the request's user
    pub fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                warn!("Failed to validate token: {}", e);
                ApiError::Unauthorized
            })?;

        let claims = token_data.claims;
        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            full_name: claims.user_metadata.full_name,
        })
    }
}

/// Read a PEM key given inline or as a file path
fn read_key(value: &str) -> Result<String> {
    if value.starts_with("-----BEGIN") {
        return Ok(value.to_string());
    }

    let pem = std::fs::read_to_string(value)
        .map_err(|e| anyhow::anyhow!("Failed to read public key file {}: {}", value, e))?;
    Ok(pem.trim().to_string())
}

/// Extract the bearer token from the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;

    let user = state.jwt.verify(&token).inspect_err(|_| {
        error!("Rejected request to {}", req.uri().path());
    })?;

    profiles::ensure_registered(state.repository.as_ref(), &user).await?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header::AUTHORIZATION};
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &[u8] = b"roam-test-secret";

    fn token(secret: &[u8], exp: u64, sub: Uuid) -> String {
        let claims = Claims {
            sub,
            email: Some("ana@roam.test".to_string()),
            user_metadata: UserMetadata {
                full_name: Some("Ana Lima".to_string()),
            },
            exp,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn in_one_hour() -> u64 {
        u64::try_from(chrono::Utc::now().timestamp()).unwrap() + 3600
    }

    #[test]
    fn verify_accepts_valid_token() {
        let sub = Uuid::new_v4();
        let verifier = JwtVerifier::from_secret(SECRET);

        let user = verifier.verify(&token(SECRET, in_one_hour(), sub)).unwrap();
        assert_eq!(user.id, sub);
        assert_eq!(user.email.as_deref(), Some("ana@roam.test"));
        assert_eq!(user.full_name.as_deref(), Some("Ana Lima"));
    }

    #[test]
    fn verify_rejects_expired_and_forged_tokens() {
        let verifier = JwtVerifier::from_secret(SECRET);

        let expired = token(SECRET, 1_000, Uuid::new_v4());
        assert!(matches!(verifier.verify(&expired), Err(ApiError::Unauthorized)));

        let forged = token(b"another-secret", in_one_hour(), Uuid::new_v4());
        assert!(matches!(verifier.verify(&forged), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn from_config_requires_a_key() {
        let config = AuthConfig::default();
        assert!(JwtVerifier::from_config(&config).is_err());

        let config = AuthConfig {
            jwt_secret: Some("s3cret".to_string()),
            ..AuthConfig::default()
        };
        assert!(JwtVerifier::from_config(&config).is_ok());
    }

    #[test]
    fn bearer_token_reads_authorization_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));
    }
}
