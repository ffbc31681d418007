use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use super::{Store, StoreError, StoreResult};
use crate::models::collection::Collection;
use crate::models::recipe::{Ingredient, IngredientInput, NewRecipe, Recipe};
use crate::models::user::{NewUser, User};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and runs the embedded migrations.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

async fn insert_ingredients(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
    ingredients: Vec<IngredientInput>,
) -> StoreResult<()> {
    for ingredient in ingredients {
        sqlx::query("INSERT INTO ingredients (qty, unit, item, recipe_id) VALUES ($1, $2, $3, $4)")
            .bind(ingredient.qty)
            .bind(ingredient.unit)
            .bind(ingredient.item)
            .bind(recipe_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// First collection (lowest id) called `name`, created if there is none.
async fn collection_for_name(tx: &mut Transaction<'_, Postgres>, name: &str) -> StoreResult<i64> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM collections WHERE name = $1 ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let id: i64 = sqlx::query_scalar("INSERT INTO collections (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
    Ok(id)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, avatar)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.avatar)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_token(&self, token: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $1, email = $2, password_hash = $3, avatar = $4, token = $5, token_exp = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(&user.token)
        .bind(user.token_exp)
        .bind(user.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        // recipes and ingredients go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_recipes(&self, user_id: i64) -> StoreResult<Vec<Recipe>> {
        let recipes =
            sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE user_id = $1 ORDER BY id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(recipes)
    }

    async fn find_recipe(&self, id: i64) -> StoreResult<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(recipe)
    }

    async fn create_recipe(
        &self,
        recipe: NewRecipe,
        collection_name: Option<&str>,
        ingredients: Vec<IngredientInput>,
    ) -> StoreResult<Recipe> {
        let mut tx = self.pool.begin().await?;

        let collection_id = match collection_name {
            Some(name) => Some(collection_for_name(&mut tx, name).await?),
            None => recipe.collection_id,
        };

        let created = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes (title, instructions, rating, img, user_id, collection_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(recipe.title)
        .bind(recipe.instructions)
        .bind(recipe.rating)
        .bind(recipe.img)
        .bind(recipe.user_id)
        .bind(collection_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_ingredients(&mut tx, created.id, ingredients).await?;
        tx.commit().await?;

        Ok(created)
    }

    async fn update_recipe(
        &self,
        recipe: &Recipe,
        collection_name: Option<&str>,
        ingredients: Option<Vec<IngredientInput>>,
    ) -> StoreResult<Recipe> {
        let mut tx = self.pool.begin().await?;

        let collection_id = match collection_name {
            Some(name) => Some(collection_for_name(&mut tx, name).await?),
            None => recipe.collection_id,
        };

        let updated = sqlx::query_as::<_, Recipe>(
            r#"
            UPDATE recipes
            SET title = $1, instructions = $2, rating = $3, img = $4, collection_id = $5, updated_on = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(&recipe.title)
        .bind(&recipe.instructions)
        .bind(&recipe.rating)
        .bind(&recipe.img)
        .bind(collection_id)
        .bind(recipe.updated_on)
        .bind(recipe.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        if let Some(ingredients) = ingredients {
            sqlx::query("DELETE FROM ingredients WHERE recipe_id = $1")
                .bind(recipe.id)
                .execute(&mut *tx)
                .await?;
            insert_ingredients(&mut tx, recipe.id, ingredients).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_recipe(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_ingredients(&self, recipe_id: i64) -> StoreResult<Vec<Ingredient>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            "SELECT * FROM ingredients WHERE recipe_id = $1 ORDER BY id",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ingredients)
    }

    async fn find_ingredient(&self, id: i64) -> StoreResult<Option<Ingredient>> {
        let ingredient = sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ingredient)
    }

    async fn create_ingredient(
        &self,
        recipe_id: i64,
        ingredient: IngredientInput,
    ) -> StoreResult<Ingredient> {
        let created = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (qty, unit, item, recipe_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(ingredient.qty)
        .bind(ingredient.unit)
        .bind(ingredient.item)
        .bind(recipe_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_ingredient(&self, ingredient: &Ingredient) -> StoreResult<Ingredient> {
        sqlx::query_as::<_, Ingredient>(
            r#"
            UPDATE ingredients SET qty = $1, unit = $2, item = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&ingredient.qty)
        .bind(&ingredient.unit)
        .bind(&ingredient.item)
        .bind(ingredient.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_ingredient(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        let collections = sqlx::query_as::<_, Collection>("SELECT * FROM collections ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(collections)
    }

    async fn find_collection(&self, id: i64) -> StoreResult<Option<Collection>> {
        let collection = sqlx::query_as::<_, Collection>("SELECT * FROM collections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(collection)
    }

    async fn create_collection(&self, name: &str) -> StoreResult<Collection> {
        let created =
            sqlx::query_as::<_, Collection>("INSERT INTO collections (name) VALUES ($1) RETURNING *")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(created)
    }

    async fn update_collection(&self, collection: &Collection) -> StoreResult<Collection> {
        sqlx::query_as::<_, Collection>("UPDATE collections SET name = $1 WHERE id = $2 RETURNING *")
            .bind(&collection.name)
            .bind(collection.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn delete_collection(&self, id: i64) -> StoreResult<()> {
        // recipes.collection_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
