pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::models::collection::Collection;
use crate::models::recipe::{Ingredient, IngredientInput, NewRecipe, Recipe};
use crate::models::user::{NewUser, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Shared handle to whichever store backs the app.
pub type DB = Arc<dyn Store>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint (email, token) was violated.
    #[error("duplicate value for a unique field")]
    Duplicate,
    /// A foreign key points at a row that doesn't exist.
    #[error("referenced row does not exist")]
    MissingReference,
    /// Update or delete aimed at a row that is gone.
    #[error("row not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        // Postgres error codes: 23505 unique_violation, 23503 foreign_key_violation.
        if let Some(db_err) = e.as_database_error() {
            match db_err.code().as_deref() {
                Some("23505") => return StoreError::Duplicate,
                Some("23503") => return StoreError::MissingReference,
                _ => {}
            }
        }
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row-level access to users, recipes, ingredients and collections.
///
/// Every method is a single unit of work: it either lands completely or not at all.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;
    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Returns the holder of `token` whether or not it has expired.
    async fn find_user_by_token(&self, token: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, user: &User) -> StoreResult<User>;
    /// Also removes the user's recipes and their ingredients.
    async fn delete_user(&self, id: i64) -> StoreResult<()>;

    async fn list_recipes(&self, user_id: i64) -> StoreResult<Vec<Recipe>>;
    async fn find_recipe(&self, id: i64) -> StoreResult<Option<Recipe>>;
    /// `collection_name`, when given, overrides `recipe.collection_id`: the recipe is filed
    /// under the first collection with that name, which is created if none exists.
    async fn create_recipe(
        &self,
        recipe: NewRecipe,
        collection_name: Option<&str>,
        ingredients: Vec<IngredientInput>,
    ) -> StoreResult<Recipe>;
    /// Saves the recipe row. `collection_name` works as in [`Store::create_recipe`], and
    /// `Some(ingredients)` replaces the ingredient list, all in the same unit of work.
    async fn update_recipe(
        &self,
        recipe: &Recipe,
        collection_name: Option<&str>,
        ingredients: Option<Vec<IngredientInput>>,
    ) -> StoreResult<Recipe>;
    /// Also removes the recipe's ingredients.
    async fn delete_recipe(&self, id: i64) -> StoreResult<()>;

    async fn list_ingredients(&self, recipe_id: i64) -> StoreResult<Vec<Ingredient>>;
    async fn find_ingredient(&self, id: i64) -> StoreResult<Option<Ingredient>>;
    async fn create_ingredient(
        &self,
        recipe_id: i64,
        ingredient: IngredientInput,
    ) -> StoreResult<Ingredient>;
    async fn update_ingredient(&self, ingredient: &Ingredient) -> StoreResult<Ingredient>;
    async fn delete_ingredient(&self, id: i64) -> StoreResult<()>;

    async fn list_collections(&self) -> StoreResult<Vec<Collection>>;
    async fn find_collection(&self, id: i64) -> StoreResult<Option<Collection>>;
    async fn create_collection(&self, name: &str) -> StoreResult<Collection>;
    async fn update_collection(&self, collection: &Collection) -> StoreResult<Collection>;
    /// Recipes filed under the collection are kept, with their collection cleared.
    async fn delete_collection(&self, id: i64) -> StoreResult<()>;
}

/// Opens the store named by `DATABASE_URL`.
///
/// `memory:` gives a throwaway in-process store, anything else is handed to Postgres and
/// migrated before we return.
pub async fn connect(config: &Config) -> anyhow::Result<DB> {
    if config.database_url.starts_with("memory:") {
        tracing::warn!("Using the in-memory store, nothing will survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PgStore::connect(&config.database_url, config.max_connections).await?;
    Ok(Arc::new(store))
}
