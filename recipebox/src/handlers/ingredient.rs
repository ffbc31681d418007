use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};
use crate::handlers::recipe::load_owned_recipe;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::recipe::{Ingredient, IngredientInput};
use crate::models::user::User;
use crate::state::AppState;

/// Ingredients have no owner of their own; whoever owns the recipe owns its ingredients.
async fn load_owned_ingredient(state: &AppState, id: i64, user: &User) -> ApiResult<Ingredient> {
    let ingredient = state
        .db
        .find_ingredient(id)
        .await?
        .ok_or(ApiError::NotFound("Ingredient"))?;
    load_owned_recipe(state, ingredient.recipe_id, user).await?;
    Ok(ingredient)
}

pub async fn list_ingredients(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(recipe_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    load_owned_recipe(&state, recipe_id, &user).await?;
    let ingredients = state.db.list_ingredients(recipe_id).await?;

    Ok(Json(json!({ "ingredients": ingredients })))
}

pub async fn create_ingredient(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(recipe_id): Path<i64>,
    Json(payload): Json<IngredientInput>,
) -> ApiResult<Json<Ingredient>> {
    load_owned_recipe(&state, recipe_id, &user).await?;
    let ingredient = state.db.create_ingredient(recipe_id, payload).await?;

    Ok(Json(ingredient))
}

pub async fn update_ingredient(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(changes): Json<IngredientInput>,
) -> ApiResult<Json<Ingredient>> {
    let mut ingredient = load_owned_ingredient(&state, id, &user).await?;
    ingredient.apply(changes);
    let ingredient = state.db.update_ingredient(&ingredient).await?;

    Ok(Json(ingredient))
}

pub async fn delete_ingredient(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    load_owned_ingredient(&state, id, &user).await?;
    state.db.delete_ingredient(id).await?;

    Ok(Json(json!({"status": "success"})))
}
