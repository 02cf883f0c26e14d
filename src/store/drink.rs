//! Drink menu types and their two JSON representations.
//!
//! The public menu (`short`) shows each ingredient only as a coloured
//! portion; staff views (`long`) include ingredient names.

use serde::{Deserialize, Serialize};

/// One layer of a drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: u32,
}

/// A stored drink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drink {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

#[derive(Debug, Serialize)]
pub struct ShortIngredient<'a> {
    pub color: &'a str,
    pub parts: u32,
}

#[derive(Debug, Serialize)]
pub struct ShortDrink<'a> {
    pub id: i64,
    pub title: &'a str,
    pub recipe: Vec<ShortIngredient<'a>>,
}

#[derive(Debug, Serialize)]
pub struct LongDrink<'a> {
    pub id: i64,
    pub title: &'a str,
    pub recipe: &'a [Ingredient],
}

impl Drink {
    pub fn short(&self) -> ShortDrink<'_> {
        ShortDrink {
            id: self.id,
            title: &self.title,
            recipe: self
                .recipe
                .iter()
                .map(|i| ShortIngredient {
                    color: &i.color,
                    parts: i.parts,
                })
                .collect(),
        }
    }

    pub fn long(&self) -> LongDrink<'_> {
        LongDrink {
            id: self.id,
            title: &self.title,
            recipe: &self.recipe,
        }
    }
}

/// Input for [`DrinkStore::insert`](super::DrinkStore::insert).
#[derive(Debug, Clone)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Partial update. Empty values leave the stored field untouched.
#[derive(Debug, Clone, Default)]
pub struct DrinkPatch {
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}
