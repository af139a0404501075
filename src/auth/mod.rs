/*!
 * # Authentication and Authorization
 *
 * Bearer tokens are HS256 JWTs issued at login. [`auth_middleware`] turns a
 * valid `Authorization: Bearer <token>` header into an [`AuthUser`] in the
 * request extensions; [`role_middleware`] then gates on the caller's role.
 * Verification is a pure function of the credential and the configured key,
 * issuer and audience.
 */

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::{user, Role};
use crate::errors::ServiceError;

pub mod password;

pub use password::{hash_password, verify_password};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,      // Subject (user ID)
    pub email: String,  // User's email at issue time
    pub role: Role,     // User's role at issue time
    pub jti: String,    // Token id
    pub iat: i64,       // Issued at
    pub exp: i64,       // Expiration
    pub iss: String,    // Issuer
    pub aud: String,    // Audience
}

/// Authenticated caller extracted from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub token_id: String,
}

impl AuthUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn require_role(&self, role: Role) -> Result<(), ServiceError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(format!(
                "{} role required",
                role
            )))
        }
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            token_id: claims.jti,
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthenticated("authentication required".to_string()))
    }
}

/// Issued access token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until expiry
    pub expires_in: u64,
}

/// Token settings
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub issuer: String,
    pub audience: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, token_ttl_secs: u64, issuer: String, audience: String) -> Self {
        Self {
            jwt_secret,
            token_ttl_secs,
            issuer,
            audience,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.jwt_expiration_secs,
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
        )
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

/// Issues and verifies access tokens
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            config,
        }
    }

    pub fn issue_token(&self, user: &user::Model) -> Result<TokenResponse, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.config.token_ttl_secs as i64,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        let access_token = self.encode_claims(&claims)?;
        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_ttl_secs,
        })
    }

    pub(crate) fn encode_claims(&self, claims: &Claims) -> Result<String, ServiceError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Every failure reads the same to the caller.
    pub fn verify(&self, token: &str) -> Result<AuthUser, ServiceError> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims.into()),
            Err(err) => {
                match err.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        debug!("rejected expired token")
                    }
                    other => debug!(reason = ?other, "rejected token"),
                }
                Err(ServiceError::Unauthenticated(
                    "invalid or expired token".to_string(),
                ))
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ServiceError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ServiceError::Unauthenticated("missing bearer token".to_string()))?
        .to_str()
        .map_err(|_| ServiceError::Unauthenticated("malformed authorization header".to_string()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(ServiceError::Unauthenticated(
            "malformed authorization header".to_string(),
        )),
    }
}

/// Authentication middleware that validates the bearer token
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, ServiceError> {
    let auth_service = request
        .extensions()
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or_else(|| ServiceError::Internal("authentication service not available".to_string()))?;

    let user = auth_service.verify(bearer_token(request.headers())?)?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Rejects callers whose role differs from the required one
pub async fn role_middleware(
    State(required_role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ServiceError::Unauthenticated("authentication required".to_string()))?;

    user.require_role(required_role)?;

    Ok(next.run(request).await)
}

/// Admin-only gate
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, ServiceError> {
    role_middleware(State(Role::Admin), request, next).await
}

pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: Role) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: Role) -> Self {
        let gated = match role {
            Role::Admin => self.layer(axum::middleware::from_fn(admin_middleware)),
            other => self.layer(axum::middleware::from_fn_with_state(other, role_middleware)),
        };
        gated.with_auth()
    }
}
