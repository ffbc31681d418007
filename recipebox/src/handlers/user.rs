use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::db::StoreError;
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::user::{NewUser, SignupRequest, User, UserChanges, normalize_email};
use crate::state::AppState;
use crate::utils::auth::hash_password;
use crate::utils::validation::{validate_email, validate_password, validate_username};

const DUPLICATE_EMAIL: &str = "Email already registered";

pub async fn get_user(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

/// Registers a new account. No auth.
///
/// Emails are unique regardless of case; a second registration gets 422.
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<Json<User>> {
    // 1. Validate input
    validate_username(&payload.username).map_err(ApiError::BadRequest)?;
    validate_email(&payload.email).map_err(ApiError::BadRequest)?;
    validate_password(&payload.password).map_err(ApiError::BadRequest)?;

    // 2. Check if the email is already registered
    let email = normalize_email(&payload.email);
    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Unprocessable(DUPLICATE_EMAIL.to_string()));
    }

    // 3. Hash password
    let new_user = NewUser {
        username: payload.username.trim().to_string(),
        email,
        password_hash: hash_password(&payload.password)?,
        avatar: payload.avatar,
    };

    // 4. Create user. Two concurrent signups can both pass step 2; the unique index
    // settles it.
    let user = state.db.create_user(new_user).await.map_err(|e| match e {
        StoreError::Duplicate => ApiError::Unprocessable(DUPLICATE_EMAIL.to_string()),
        other => other.into(),
    })?;
    tracing::info!(user_id = user.id, "user registered");

    Ok(Json(user))
}

/// Partial profile update for the token holder. Omitted fields keep their value.
pub async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(mut user): AuthenticatedUser,
    Json(changes): Json<UserChanges>,
) -> ApiResult<Json<User>> {
    // 1. Validate whatever was sent
    if let Some(username) = &changes.username {
        validate_username(username).map_err(ApiError::BadRequest)?;
    }
    if let Some(password) = &changes.password {
        validate_password(password).map_err(ApiError::BadRequest)?;
    }
    if let Some(email) = &changes.email {
        validate_email(email).map_err(ApiError::BadRequest)?;
        // 2. A new email must not belong to someone else
        let email = normalize_email(email);
        if let Some(existing) = state.db.find_user_by_email(&email).await? {
            if existing.id != user.id {
                return Err(ApiError::Unprocessable(DUPLICATE_EMAIL.to_string()));
            }
        }
    }

    // 3. Merge and save
    user.apply(changes)?;
    let user = state.db.update_user(&user).await.map_err(|e| match e {
        StoreError::Duplicate => ApiError::Unprocessable(DUPLICATE_EMAIL.to_string()),
        other => other.into(),
    })?;

    Ok(Json(user))
}

/// Deletes the token holder along with all of their recipes.
pub async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<Json<Value>> {
    state.db.delete_user(user.id).await?;
    tracing::info!(user_id = user.id, "user deleted");

    Ok(Json(json!({"status": "success"})))
}
