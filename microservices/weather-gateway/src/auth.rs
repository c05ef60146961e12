//! Auth Service
//!
//! Password login for a single demo account, HS256 bearer tokens and the
//! axum glue that enforces them.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum::{Form, Json};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use nimbus_core::{NimbusError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AppState};
use crate::config::AuthConfig;

pub const INVALID_CREDENTIALS: &str = "Could not validate credentials";
pub const BAD_LOGIN: &str = "Incorrect username or password";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Caller identity established by [`require_bearer`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticatedUser {
    pub username: String,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn require_role(&self, role: &str) -> Result<()> {
        if self.has_role(role) {
            Ok(())
        } else {
            warn!(user = %self.username, role, "Missing required role");
            Err(NimbusError::Forbidden(format!(
                "User does not have the '{}' role",
                role
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

struct DemoUser {
    username: String,
    password_hash: String,
    roles: Vec<String>,
}

#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    demo_user: Arc<DemoUser>,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        if config.uses_dev_secret() {
            warn!("SECRET_KEY is not set; signing tokens with the development secret");
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            token_ttl: config.token_ttl,
            demo_user: Arc::new(DemoUser {
                username: config.demo_username.clone(),
                password_hash: hash_password(&config.demo_password)?,
                roles: config.demo_roles.clone(),
            }),
        })
    }

    /// Check a username/password pair against the demo account
    pub fn authenticate(&self, username: &str, password: &str) -> Option<AuthenticatedUser> {
        let user = &self.demo_user;
        if username != user.username || !verify_password(password, &user.password_hash) {
            return None;
        }
        Some(AuthenticatedUser {
            username: user.username.clone(),
            roles: user.roles.clone(),
        })
    }

    /// Generate access token
    pub fn issue_token(&self, user: &AuthenticatedUser) -> Result<TokenResponse> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.username.clone(),
            roles: user.roles.clone(),
            iat: now,
            exp: now + self.token_ttl.as_secs() as i64,
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| NimbusError::Internal(format!("Token signing failed: {}", e)))?;

        info!(user = %user.username, "Access token issued");
        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.token_ttl.as_secs(),
        })
    }

    /// Validate token and return the caller. Every failure looks the same.
    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser> {
        let claims = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                NimbusError::Auth(INVALID_CREDENTIALS.to_string())
            })?
            .claims;

        if claims.sub.is_empty() {
            debug!("Token has an empty subject");
            return Err(NimbusError::Auth(INVALID_CREDENTIALS.to_string()));
        }

        Ok(AuthenticatedUser {
            username: claims.sub,
            roles: claims.roles,
        })
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| NimbusError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// `POST /token`
pub async fn token(
    State(state): State<AppState>,
    Form(req): Form<TokenRequest>,
) -> std::result::Result<Json<TokenResponse>, ApiError> {
    let Some(user) = state.auth.authenticate(&req.username, &req.password) else {
        warn!(user = %req.username, "Login failed");
        return Err(NimbusError::Auth(BAD_LOGIN.to_string()).into());
    };
    Ok(Json(state.auth.issue_token(&user)?))
}

/// `GET /users/me`
pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}

/// Reject requests without a valid bearer token
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| NimbusError::Auth(INVALID_CREDENTIALS.to_string()))?;

    let user = state.auth.validate_token(token)?;
    debug!(user = %user.username, "Bearer token accepted");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| NimbusError::Auth(INVALID_CREDENTIALS.to_string()).into())
    }
}
