use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub instructions: Option<String>,
    pub rating: Option<String>,
    pub img: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: Option<DateTime<Utc>>,
    pub user_id: i64,
    pub collection_id: Option<i64>,
}

impl Recipe {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }

    /// Applies the scalar part of a partial update. Ingredients and collection names are
    /// resolved by the caller since they touch other rows.
    pub fn apply(&mut self, changes: &RecipeChanges, now: DateTime<Utc>) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(instructions) = &changes.instructions {
            self.instructions = Some(instructions.clone());
        }
        if let Some(rating) = &changes.rating {
            self.rating = Some(rating.clone());
        }
        if let Some(img) = &changes.img {
            self.img = Some(img.clone());
        }
        if let Some(collection_id) = changes.collection_id {
            self.collection_id = Some(collection_id);
        }
        self.updated_on = Some(now);
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub qty: Option<String>,
    pub unit: Option<String>,
    pub item: Option<String>,
    pub recipe_id: i64,
}

impl Ingredient {
    pub fn apply(&mut self, changes: IngredientInput) {
        if changes.qty.is_some() {
            self.qty = changes.qty;
        }
        if changes.unit.is_some() {
            self.unit = changes.unit;
        }
        if changes.item.is_some() {
            self.item = changes.item;
        }
    }
}

/// Ingredient as it arrives over the wire, both for creation and partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientInput {
    pub qty: Option<String>,
    pub unit: Option<String>,
    pub item: Option<String>,
}

/// Insert payload for the store.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub instructions: Option<String>,
    pub rating: Option<String>,
    pub img: Option<String>,
    pub user_id: i64,
    pub collection_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: String,
    pub instructions: Option<String>,
    pub rating: Option<String>,
    pub img: Option<String>,
    pub collection_id: Option<i64>,
    /// Files the recipe under the first collection with this name, creating it if needed.
    /// Ignored when `collection_id` is given.
    pub collection_name: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecipeChanges {
    /// Only read by `PUT /recipe`, where the id travels in the body.
    pub id: Option<i64>,
    pub title: Option<String>,
    pub instructions: Option<String>,
    pub rating: Option<String>,
    pub img: Option<String>,
    pub collection_id: Option<i64>,
    pub collection_name: Option<String>,
    /// When present, replaces the recipe's whole ingredient list.
    pub ingredients: Option<Vec<IngredientInput>>,
}

/// What clients see for a recipe: the row plus its ingredients and collection name.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecipeView {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub collection_name: Option<String>,
    pub ingredients: Vec<Ingredient>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe() -> Recipe {
        Recipe {
            id: 7,
            title: "Pancakes".to_string(),
            instructions: Some("Mix and fry".to_string()),
            rating: Some("4".to_string()),
            img: None,
            created_on: Utc::now(),
            updated_on: None,
            user_id: 1,
            collection_id: None,
        }
    }

    #[test]
    fn partial_update_keeps_omitted_fields() {
        let mut r = recipe();
        let now = Utc::now();
        r.apply(
            &RecipeChanges {
                rating: Some("5".to_string()),
                ..Default::default()
            },
            now,
        );

        assert_eq!(r.title, "Pancakes");
        assert_eq!(r.instructions.as_deref(), Some("Mix and fry"));
        assert_eq!(r.rating.as_deref(), Some("5"));
        assert_eq!(r.updated_on, Some(now));
    }

    #[test]
    fn ownership() {
        let r = recipe();
        assert!(r.is_owned_by(1));
        assert!(!r.is_owned_by(2));
    }

    #[test]
    fn view_flattens_recipe_fields() {
        let view = RecipeView {
            recipe: recipe(),
            collection_name: Some("Breakfast".to_string()),
            ingredients: vec![Ingredient {
                id: 1,
                qty: Some("2".to_string()),
                unit: Some("cups".to_string()),
                item: Some("flour".to_string()),
                recipe_id: 7,
            }],
        };
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["title"], "Pancakes");
        assert_eq!(json["user_id"], 1);
        assert_eq!(json["collection_name"], "Breakfast");
        assert_eq!(json["ingredients"][0]["item"], "flour");
    }

    #[test]
    fn ingredient_partial_update() {
        let mut i = Ingredient {
            id: 1,
            qty: Some("2".to_string()),
            unit: Some("cups".to_string()),
            item: Some("flour".to_string()),
            recipe_id: 7,
        };
        i.apply(IngredientInput {
            qty: Some("3".to_string()),
            ..Default::default()
        });
        assert_eq!(i.qty.as_deref(), Some("3"));
        assert_eq!(i.unit.as_deref(), Some("cups"));
    }
}
