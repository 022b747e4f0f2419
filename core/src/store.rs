//! Persistence interface used by the duplicate consolidator.
//!
//! The SQLite [`Database`](crate::db::Database) implements it, as does the
//! in-memory fake the tests run against, so the merge procedure never reaches
//! for a shared handle.

use std::fmt;

use thiserror::Error;

use crate::models::{DuplicateGroup, Ingredient};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed row: {0}")]
    Malformed(String),
}

/// Tables holding an `ingredient_id` that must follow an ingredient when it is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReferenceTable {
    RecipeIngredients,
    Prices,
    CookingSessionIngredients,
}

impl ReferenceTable {
    /// Rewrite order used by the consolidator.
    pub const ALL: [ReferenceTable; 3] = [
        ReferenceTable::RecipeIngredients,
        ReferenceTable::Prices,
        ReferenceTable::CookingSessionIngredients,
    ];

    #[must_use]
    pub fn table_name(self) -> &'static str {
        match self {
            Self::RecipeIngredients => "recipe_ingredients",
            Self::Prices => "prices",
            Self::CookingSessionIngredients => "cooking_session_ingredients",
        }
    }
}

impl fmt::Display for ReferenceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

pub trait IngredientStore {
    type Tx<'a>: IngredientTransaction
    where
        Self: 'a;

    /// Live ingredient names held by more than one row. Names compare
    /// byte-for-byte; groups are ordered by count descending, then name.
    fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, StoreError>;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError>;
}

/// A unit of work over the ingredient tables.
///
/// Dropping a transaction without calling [`commit`](Self::commit) must discard
/// every write made through it, including when the drop happens while a panic
/// unwinds.
pub trait IngredientTransaction {
    /// Live ingredients with exactly this name, lowest id first.
    fn ingredients_by_name(&self, name: &str) -> Result<Vec<Ingredient>, StoreError>;

    /// Point every row of `table` referencing one of `from` at `to`.
    fn reassign_references(
        &mut self,
        table: ReferenceTable,
        from: &[i64],
        to: i64,
    ) -> Result<usize, StoreError>;

    /// Soft-delete the given ingredients.
    fn delete_ingredients(&mut self, ids: &[i64]) -> Result<usize, StoreError>;

    fn commit(self) -> Result<(), StoreError>;

    fn rollback(self) -> Result<(), StoreError>;
}
