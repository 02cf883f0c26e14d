//! Bearer-token authentication and permission checks.
//!
//! Requests carry `Authorization: Bearer <jwt>`. The token is verified by a
//! [`TokenVerifier`] (normally [`Auth0Verifier`]) and the resulting
//! [`Claims`] must list the route's [`Permission`] in their `permissions`
//! array.

mod verifier;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use verifier::Auth0Verifier;

// ── Errors ──────────────────────────────────────────────────────────────────

/// Authentication or authorization failure.
///
/// `code` is a stable machine-readable tag (`token_expired`, `unauthorized`, …).
#[derive(Debug, Clone, Error)]
#[error("{code}: {description}")]
pub struct AuthError {
    pub code: &'static str,
    pub description: String,
    pub status: StatusCode,
}

impl AuthError {
    fn new(code: &'static str, description: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code,
            description: description.into(),
            status,
        }
    }

    pub fn header_missing() -> Self {
        Self::new(
            "authorization_header_missing",
            "Authorization header is expected.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub fn invalid_header(description: impl Into<String>) -> Self {
        Self::new("invalid_header", description, StatusCode::UNAUTHORIZED)
    }

    pub fn token_expired() -> Self {
        Self::new("token_expired", "Token expired.", StatusCode::UNAUTHORIZED)
    }

    pub fn invalid_claims(description: impl Into<String>) -> Self {
        Self::new("invalid_claims", description, StatusCode::UNAUTHORIZED)
    }

    /// The token is valid but carries no `permissions` claim at all.
    pub fn permissions_missing() -> Self {
        Self::new(
            "invalid_claims",
            "Permissions not included in JWT.",
            StatusCode::BAD_REQUEST,
        )
    }

    pub fn forbidden(permission: Permission) -> Self {
        Self::new(
            "unauthorized",
            format!("Permission '{permission}' not found."),
            StatusCode::FORBIDDEN,
        )
    }
}

// ── Claims & permissions ────────────────────────────────────────────────────

/// Decoded token payload. Audience, issuer and expiry are checked by the
/// verifier before this is handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<Audience>,
    pub exp: u64,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub azp: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// `aud` may be a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Self::One(a) => a == audience,
            Self::Many(all) => all.iter().any(|a| a == audience),
        }
    }
}

/// Route-level permissions granted through the identity provider's RBAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    GetDrinksDetail,
    PostDrinks,
    PatchDrinks,
    DeleteDrinks,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetDrinksDetail => "get:drinks-detail",
            Self::PostDrinks => "post:drinks",
            Self::PatchDrinks => "patch:drinks",
            Self::DeleteDrinks => "delete:drinks",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn check_permission(claims: &Claims, permission: Permission) -> Result<(), AuthError> {
    let granted = claims
        .permissions
        .as_ref()
        .ok_or_else(AuthError::permissions_missing)?;
    if granted.iter().any(|p| p == permission.as_str()) {
        Ok(())
    } else {
        Err(AuthError::forbidden(permission))
    }
}

// ── Header parsing ──────────────────────────────────────────────────────────

/// Extract the raw token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(AuthError::header_missing)?
        .to_str()
        .map_err(|_| AuthError::invalid_header("Authorization header is not valid ASCII."))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().ok_or_else(AuthError::header_missing)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::invalid_header(
            "Authorization header must start with \"Bearer\".",
        ));
    }
    let token = parts
        .next()
        .ok_or_else(|| AuthError::invalid_header("Token not found."))?;
    if parts.next().is_some() {
        return Err(AuthError::invalid_header(
            "Authorization header must be bearer token.",
        ));
    }
    Ok(token)
}

// ── Verifier seam ───────────────────────────────────────────────────────────

pub type VerifyFuture<'a> = Pin<Box<dyn Future<Output = Result<Claims, AuthError>> + Send + 'a>>;

/// Turns a raw bearer token into verified [`Claims`].
pub trait TokenVerifier: Send + Sync {
    fn verify<'a>(&'a self, token: &'a str) -> VerifyFuture<'a>;
}

/// Full check for a protected route: header → token → claims → permission.
pub async fn authorize(
    verifier: &dyn TokenVerifier,
    headers: &HeaderMap,
    permission: Permission,
) -> Result<Claims, AuthError> {
    let token = bearer_token(headers)?;
    let claims = verifier.verify(token).await?;
    check_permission(&claims, permission)?;
    Ok(claims)
}
