use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::recipe::{CreateRecipeRequest, NewRecipe, Recipe, RecipeChanges, RecipeView};
use crate::models::user::User;
use crate::state::AppState;
use crate::utils::validation::{validate_collection_name, validate_title};

/// Loads a recipe and checks the caller owns it.
///
/// 404 if there is no such recipe, 403 if it belongs to someone else.
pub(crate) async fn load_owned_recipe(state: &AppState, id: i64, user: &User) -> ApiResult<Recipe> {
    let recipe = state
        .db
        .find_recipe(id)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;

    if !recipe.is_owned_by(user.id) {
        tracing::warn!(user_id = user.id, recipe_id = id, "refused access to another user's recipe");
        return Err(ApiError::Forbidden("Recipe belongs to another user"));
    }
    Ok(recipe)
}

/// Joins in the ingredients and the collection name.
async fn recipe_view(state: &AppState, recipe: Recipe) -> ApiResult<RecipeView> {
    let ingredients = state.db.list_ingredients(recipe.id).await?;
    let collection_name = match recipe.collection_id {
        Some(id) => state.db.find_collection(id).await?.map(|c| c.name),
        None => None,
    };

    Ok(RecipeView {
        recipe,
        collection_name,
        ingredients,
    })
}

/// Checks where a recipe should be filed.
///
/// An explicit id must exist (422 otherwise) and wins over a name. A name is validated
/// and handed back trimmed; the store finds or creates the collection in the same unit of
/// work as the recipe write, so a failed write leaves no stray collection behind.
async fn collection_to_file_under<'a>(
    state: &AppState,
    collection_id: Option<i64>,
    collection_name: Option<&'a str>,
) -> ApiResult<Option<&'a str>> {
    if let Some(id) = collection_id {
        if state.db.find_collection(id).await?.is_none() {
            return Err(ApiError::Unprocessable(format!("Unknown collection {id}")));
        }
        return Ok(None);
    }

    let Some(name) = collection_name else {
        return Ok(None);
    };
    validate_collection_name(name).map_err(ApiError::BadRequest)?;
    Ok(Some(name.trim()))
}

/// Lists the caller's recipes.
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<Json<Value>> {
    let recipes = state.db.list_recipes(user.id).await?;

    let mut results = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        results.push(recipe_view(&state, recipe).await?);
    }

    Ok(Json(json!({ "recipes": results })))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<RecipeView>> {
    let recipe = load_owned_recipe(&state, id, &user).await?;
    Ok(Json(recipe_view(&state, recipe).await?))
}

/// Creates a recipe owned by the caller, ingredients included.
///
/// The owner always comes from the token, never from the payload.
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateRecipeRequest>,
) -> ApiResult<Json<RecipeView>> {
    // 1. Validate the payload
    validate_title(&payload.title).map_err(ApiError::BadRequest)?;
    let collection_name = collection_to_file_under(
        &state,
        payload.collection_id,
        payload.collection_name.as_deref(),
    )
    .await?;

    // 2. Insert recipe, collection and ingredients together
    let new_recipe = NewRecipe {
        title: payload.title.trim().to_string(),
        instructions: payload.instructions,
        rating: payload.rating,
        img: payload.img,
        user_id: user.id,
        collection_id: payload.collection_id,
    };
    let recipe = state
        .db
        .create_recipe(new_recipe, collection_name, payload.ingredients)
        .await?;
    tracing::info!(user_id = user.id, recipe_id = recipe.id, "recipe created");

    // 3. Answer with the joined view
    Ok(Json(recipe_view(&state, recipe).await?))
}

async fn apply_update(
    state: &AppState,
    user: &User,
    id: i64,
    changes: RecipeChanges,
) -> ApiResult<RecipeView> {
    // 1. Ownership comes first: a stranger learns nothing from validation errors
    let mut recipe = load_owned_recipe(state, id, user).await?;

    // 2. Validate the changes
    if let Some(title) = &changes.title {
        validate_title(title).map_err(ApiError::BadRequest)?;
    }
    let collection_name = collection_to_file_under(
        state,
        changes.collection_id,
        changes.collection_name.as_deref(),
    )
    .await?;

    // 3. Merge into the stored row and save it with any new ingredient list
    recipe.apply(&changes, Utc::now());
    let recipe = state
        .db
        .update_recipe(&recipe, collection_name, changes.ingredients)
        .await?;

    recipe_view(state, recipe).await
}

/// Partial update of one of the caller's recipes. Omitted fields keep their value; an
/// `ingredients` list, when sent, replaces the existing one.
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(changes): Json<RecipeChanges>,
) -> ApiResult<Json<RecipeView>> {
    Ok(Json(apply_update(&state, &user, id, changes).await?))
}

/// Same as [`update_recipe`] for clients that send the id in the body.
pub async fn update_recipe_from_body(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(changes): Json<RecipeChanges>,
) -> ApiResult<Json<RecipeView>> {
    let id = changes
        .id
        .ok_or_else(|| ApiError::BadRequest("Recipe id is required".to_string()))?;
    Ok(Json(apply_update(&state, &user, id, changes).await?))
}

/// Deletes one of the caller's recipes along with its ingredients.
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    load_owned_recipe(&state, id, &user).await?;
    state.db.delete_recipe(id).await?;
    tracing::info!(user_id = user.id, recipe_id = id, "recipe deleted");

    Ok(Json(json!({"status": "success"})))
}
