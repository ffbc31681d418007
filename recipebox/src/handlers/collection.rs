use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::db::StoreError;
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::collection::{Collection, CollectionRequest};
use crate::state::AppState;
use crate::utils::validation::validate_collection_name;

// Collections are shared: any signed-in user may list, rename or delete them.

pub async fn list_collections(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> ApiResult<Json<Value>> {
    let collections = state.db.list_collections().await?;
    Ok(Json(json!({ "collections": collections })))
}

pub async fn get_collection(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Collection>> {
    let collection = state
        .db
        .find_collection(id)
        .await?
        .ok_or(ApiError::NotFound("Collection"))?;
    Ok(Json(collection))
}

/// Names don't have to be unique.
pub async fn create_collection(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CollectionRequest>,
) -> ApiResult<Json<Collection>> {
    validate_collection_name(&payload.name).map_err(ApiError::BadRequest)?;
    let collection = state.db.create_collection(payload.name.trim()).await?;
    Ok(Json(collection))
}

pub async fn rename_collection(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<CollectionRequest>,
) -> ApiResult<Json<Collection>> {
    let mut collection = state
        .db
        .find_collection(id)
        .await?
        .ok_or(ApiError::NotFound("Collection"))?;
    validate_collection_name(&payload.name).map_err(ApiError::BadRequest)?;

    collection.name = payload.name.trim().to_string();
    Ok(Json(state.db.update_collection(&collection).await?))
}

/// Recipes filed under the collection survive, they just lose their collection.
pub async fn delete_collection(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .delete_collection(id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::NotFound("Collection"),
            other => other.into(),
        })?;

    Ok(Json(json!({"status": "success"})))
}
