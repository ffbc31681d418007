use axum::{Json, extract::State};
use chrono::Utc;
use serde_json::{Value, json};

use crate::error::ApiResult;
use crate::middleware::auth::{AuthenticatedUser, CredentialUser};
use crate::models::user::User;
use crate::state::AppState;

/// Trades basic credentials for a bearer token.
///
/// `Authorization: Basic base64(email:password)`. Answers with the user, token included.
/// Calling it again while the current token has more than a minute left returns the same
/// token instead of minting a new one.
pub async fn login(
    State(state): State<AppState>,
    CredentialUser(mut user): CredentialUser,
) -> ApiResult<Json<User>> {
    // 1. Credentials were checked by the extractor; keep or mint a token
    if user.issue_token(Utc::now(), state.config.token_ttl_secs) {
        // 2. Persist the new token before handing it out
        user = state.db.update_user(&user).await?;
        tracing::info!(user_id = user.id, "issued new token");
    }

    Ok(Json(user))
}

/// Revokes the caller's token. Any further request carrying it gets a 401.
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(mut user): AuthenticatedUser,
) -> ApiResult<Json<Value>> {
    user.revoke_token(Utc::now());
    state.db.update_user(&user).await?;
    tracing::info!(user_id = user.id, "token revoked");

    Ok(Json(json!({"status": "success"})))
}
