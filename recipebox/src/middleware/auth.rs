use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{
    Authorization, HeaderMapExt,
    authorization::{Basic, Bearer},
};
use chrono::Utc;

use crate::db::DB;
use crate::error::ApiError;
use crate::models::user::User;
use crate::state::AppState;
use crate::utils::auth::verify_password;

/// Resolves an email/password pair to a user.
///
/// Fails closed: an unknown email and a wrong password look the same to the caller.
pub async fn verify_credentials(
    db: &DB,
    email: &str,
    password: &str,
) -> Result<Option<User>, ApiError> {
    let Some(user) = db.find_user_by_email(&email.to_lowercase()).await? else {
        return Ok(None);
    };

    if verify_password(password, &user.password_hash) {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// Resolves a bearer token to its holder, as long as the token hasn't expired.
pub async fn verify_token(db: &DB, token: &str) -> Result<Option<User>, ApiError> {
    if token.is_empty() {
        return Ok(None);
    }
    let user = db.find_user_by_token(token).await?;
    Ok(user.filter(|u| u.has_valid_token(Utc::now())))
}

/// The user behind a valid `Authorization: Bearer <token>` header.
///
/// Add it to a handler's arguments and unauthenticated requests never reach the handler:
/// a missing, malformed, unknown, expired or revoked token is answered with 401.
pub struct AuthenticatedUser(pub User);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // 1. Extract token from Authorization header
        let header = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or(ApiError::Unauthorized("Missing or malformed bearer token"))?;

        // 2. Look it up and check it hasn't expired
        match verify_token(&state.db, header.token()).await? {
            Some(user) => Ok(AuthenticatedUser(user)),
            None => {
                tracing::debug!("rejected unknown or expired token");
                Err(ApiError::Unauthorized("Invalid or expired token"))
            }
        }
    }
}

/// The user behind a valid `Authorization: Basic base64(email:password)` header.
///
/// Only the token issuing endpoint takes this; everything else wants a bearer token.
pub struct CredentialUser(pub User);

impl FromRequestParts<AppState> for CredentialUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // 1. Extract email and password from Authorization header
        let header = parts
            .headers
            .typed_get::<Authorization<Basic>>()
            .ok_or(ApiError::Unauthorized("Missing or malformed basic credentials"))?;

        // 2. Fetch user and verify password
        match verify_credentials(&state.db, header.username(), header.password()).await? {
            Some(user) => Ok(CredentialUser(user)),
            None => {
                tracing::info!(email = header.username(), "failed login attempt");
                Err(ApiError::Unauthorized("Invalid credentials"))
            }
        }
    }
}
