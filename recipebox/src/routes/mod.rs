use crate::handlers::{
    auth::{login, logout},
    collection::{
        create_collection, delete_collection, get_collection, list_collections, rename_collection,
    },
    health::health_check,
    ingredient::{create_ingredient, delete_ingredient, list_ingredients, update_ingredient},
    recipe::{
        create_recipe, delete_recipe, get_recipe, list_recipes, update_recipe,
        update_recipe_from_body,
    },
    user::{create_user, delete_user, get_user, update_user},
};
use crate::middleware::rate_limit;
use crate::state::AppState;
use axum::{
    Router,
    handler::Handler,
    routing::{get, post, put},
};
use tower_governor::GovernorLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn create_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Only the password-checking endpoint is throttled.
    let login_conf = rate_limit::create_login_config(&state.config);

    Router::new()
        .route("/health", get(health_check))
        .route("/login", get(login.layer(GovernorLayer::new(login_conf))))
        .route("/logout", post(logout))
        .route(
            "/user",
            get(get_user)
                .post(create_user)
                .put(update_user)
                .delete(delete_user),
        )
        .route(
            "/recipe",
            get(list_recipes)
                .post(create_recipe)
                .put(update_recipe_from_body),
        )
        .route(
            "/recipe/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route(
            "/recipe/{id}/ingredient",
            get(list_ingredients).post(create_ingredient),
        )
        .route(
            "/ingredient/{id}",
            put(update_ingredient).delete(delete_ingredient),
        )
        .route(
            "/collection",
            get(list_collections).post(create_collection),
        )
        .route(
            "/collection/{id}",
            get(get_collection)
                .put(rename_collection)
                .delete(delete_collection),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
