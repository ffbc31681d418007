use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{Store, StoreError, StoreResult};
use crate::models::collection::Collection;
use crate::models::recipe::{Ingredient, IngredientInput, NewRecipe, Recipe};
use crate::models::user::{NewUser, User};

/// In-process store with the same constraints as the Postgres schema.
///
/// Used for `DATABASE_URL=memory:` and by the test suite. The lock is never held across
/// an await, so a plain mutex is enough.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    recipes: BTreeMap<i64, Recipe>,
    ingredients: BTreeMap<i64, Ingredient>,
    collections: BTreeMap<i64, Collection>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
    }

    fn token_taken(&self, token: &str, except: i64) -> bool {
        self.users
            .values()
            .any(|u| u.id != except && u.token.as_deref() == Some(token))
    }

    fn check_collection(&self, collection_id: Option<i64>) -> StoreResult<()> {
        match collection_id {
            Some(id) if !self.collections.contains_key(&id) => Err(StoreError::MissingReference),
            _ => Ok(()),
        }
    }

    /// First collection (lowest id) called `name`, created if there is none.
    fn collection_for_name(&mut self, name: &str) -> i64 {
        if let Some(existing) = self.collections.values().find(|c| c.name == name) {
            return existing.id;
        }
        let id = self.next_id();
        self.collections.insert(
            id,
            Collection {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    fn insert_ingredient(&mut self, recipe_id: i64, input: IngredientInput) -> Ingredient {
        let ingredient = Ingredient {
            id: self.next_id(),
            qty: input.qty,
            unit: input.unit,
            item: input.item,
            recipe_id,
        };
        self.ingredients.insert(ingredient.id, ingredient.clone());
        ingredient
    }

    fn remove_recipe(&mut self, id: i64) -> Option<Recipe> {
        let removed = self.recipes.remove(&id)?;
        self.ingredients.retain(|_, i| i.recipe_id != id);
        Some(removed)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panic mid-request can't leave a half-applied write behind, so poisoning is harmless.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables();
        if t.email_taken(&user.email, None) {
            return Err(StoreError::Duplicate);
        }
        let created = User {
            id: t.next_id(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            avatar: user.avatar,
            created_on: Utc::now(),
            token: None,
            token_exp: None,
        };
        t.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_token(&self, token: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.token.as_deref() == Some(token))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut t = self.tables();
        if !t.users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if t.email_taken(&user.email, Some(user.id)) {
            return Err(StoreError::Duplicate);
        }
        if let Some(token) = &user.token {
            if t.token_taken(token, user.id) {
                return Err(StoreError::Duplicate);
            }
        }
        t.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables();
        if t.users.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        let owned: Vec<i64> = t
            .recipes
            .values()
            .filter(|r| r.user_id == id)
            .map(|r| r.id)
            .collect();
        for recipe_id in owned {
            t.remove_recipe(recipe_id);
        }
        Ok(())
    }

    async fn list_recipes(&self, user_id: i64) -> StoreResult<Vec<Recipe>> {
        Ok(self
            .tables()
            .recipes
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_recipe(&self, id: i64) -> StoreResult<Option<Recipe>> {
        Ok(self.tables().recipes.get(&id).cloned())
    }

    async fn create_recipe(
        &self,
        recipe: NewRecipe,
        collection_name: Option<&str>,
        ingredients: Vec<IngredientInput>,
    ) -> StoreResult<Recipe> {
        let mut t = self.tables();
        if !t.users.contains_key(&recipe.user_id) {
            return Err(StoreError::MissingReference);
        }
        // Every check runs before the first write.
        let collection_id = match collection_name {
            Some(name) => Some(t.collection_for_name(name)),
            None => {
                t.check_collection(recipe.collection_id)?;
                recipe.collection_id
            }
        };

        let created = Recipe {
            id: t.next_id(),
            title: recipe.title,
            instructions: recipe.instructions,
            rating: recipe.rating,
            img: recipe.img,
            created_on: Utc::now(),
            updated_on: None,
            user_id: recipe.user_id,
            collection_id,
        };
        t.recipes.insert(created.id, created.clone());
        for input in ingredients {
            t.insert_ingredient(created.id, input);
        }
        Ok(created)
    }

    async fn update_recipe(
        &self,
        recipe: &Recipe,
        collection_name: Option<&str>,
        ingredients: Option<Vec<IngredientInput>>,
    ) -> StoreResult<Recipe> {
        let mut t = self.tables();
        if !t.recipes.contains_key(&recipe.id) {
            return Err(StoreError::NotFound);
        }
        let mut saved = recipe.clone();
        match collection_name {
            Some(name) => saved.collection_id = Some(t.collection_for_name(name)),
            None => t.check_collection(recipe.collection_id)?,
        }

        t.recipes.insert(saved.id, saved.clone());
        if let Some(ingredients) = ingredients {
            t.ingredients.retain(|_, i| i.recipe_id != saved.id);
            for input in ingredients {
                t.insert_ingredient(saved.id, input);
            }
        }
        Ok(saved)
    }

    async fn delete_recipe(&self, id: i64) -> StoreResult<()> {
        self.tables()
            .remove_recipe(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_ingredients(&self, recipe_id: i64) -> StoreResult<Vec<Ingredient>> {
        Ok(self
            .tables()
            .ingredients
            .values()
            .filter(|i| i.recipe_id == recipe_id)
            .cloned()
            .collect())
    }

    async fn find_ingredient(&self, id: i64) -> StoreResult<Option<Ingredient>> {
        Ok(self.tables().ingredients.get(&id).cloned())
    }

    async fn create_ingredient(
        &self,
        recipe_id: i64,
        ingredient: IngredientInput,
    ) -> StoreResult<Ingredient> {
        let mut t = self.tables();
        if !t.recipes.contains_key(&recipe_id) {
            return Err(StoreError::MissingReference);
        }
        Ok(t.insert_ingredient(recipe_id, ingredient))
    }

    async fn update_ingredient(&self, ingredient: &Ingredient) -> StoreResult<Ingredient> {
        let mut t = self.tables();
        match t.ingredients.get_mut(&ingredient.id) {
            Some(row) => {
                *row = ingredient.clone();
                Ok(ingredient.clone())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_ingredient(&self, id: i64) -> StoreResult<()> {
        self.tables()
            .ingredients
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        Ok(self.tables().collections.values().cloned().collect())
    }

    async fn find_collection(&self, id: i64) -> StoreResult<Option<Collection>> {
        Ok(self.tables().collections.get(&id).cloned())
    }

    async fn create_collection(&self, name: &str) -> StoreResult<Collection> {
        let mut t = self.tables();
        let created = Collection {
            id: t.next_id(),
            name: name.to_string(),
        };
        t.collections.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_collection(&self, collection: &Collection) -> StoreResult<Collection> {
        let mut t = self.tables();
        match t.collections.get_mut(&collection.id) {
            Some(row) => {
                *row = collection.clone();
                Ok(collection.clone())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_collection(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables();
        if t.collections.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        for recipe in t.recipes.values_mut() {
            if recipe.collection_id == Some(id) {
                recipe.collection_id = None;
            }
        }
        Ok(())
    }
}
