//! Drink recipes: which reservoirs to pour from, and how much.
//!
//! A recipe file maps drink names to `reservoir → mL` tables:
//!
//! ```json
//! { "Screwdriver": { "1": 50, "3": 150 } }
//! ```
//!
//! Reservoir keys are validated on load; zero and negative amounts are
//! kept but skipped when pouring.

use std::collections::BTreeMap;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::reservoir::ReservoirId;

/// A named set of pours, executed in reservoir order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub ingredients: BTreeMap<ReservoirId, f32>,
}

impl Recipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ingredients: BTreeMap::new() }
    }

    /// Builder-style ingredient insertion. A repeated reservoir replaces
    /// the earlier amount.
    #[must_use]
    pub fn with(mut self, reservoir: ReservoirId, ml: f32) -> Self {
        self.ingredients.insert(reservoir, ml);
        self
    }

    /// Pours that will actually open a valve.
    pub fn pours(&self) -> impl Iterator<Item = (ReservoirId, f32)> + '_ {
        self.ingredients
            .iter()
            .filter(|&(_, &ml)| ml > 0.0)
            .map(|(&id, &ml)| (id, ml))
    }

    pub fn total_ml(&self) -> f32 {
        self.pours().map(|(_, ml)| ml).sum()
    }
}

/// Recipes keyed by drink name, as stored in a recipe file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeBook {
    recipes: BTreeMap<String, Recipe>,
}

impl RecipeBook {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, BTreeMap<ReservoirId, f32>> =
            serde_json::from_str(text).map_err(|e| {
                warn!("Recipe file rejected: {}", e);
                ConfigError::Corrupted
            })?;
        let recipes = raw
            .into_iter()
            .map(|(name, ingredients)| (name.clone(), Recipe { name, ingredients }))
            .collect();
        Ok(Self { recipes })
    }

    /// Load a recipe file. A missing file yields [`ConfigError::NotFound`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                warn!("Recipe file {}: {}", path.display(), e);
                ConfigError::IoError
            }
        })?;
        let book = Self::from_json(&text)?;
        info!("Loaded {} recipes from {}", book.len(), path.display());
        Ok(book)
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    pub fn insert(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.name.clone(), recipe);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
