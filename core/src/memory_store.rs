//! In-memory [`IngredientStore`] with failure injection, for exercising the
//! consolidator without SQLite.

use std::collections::BTreeMap;

use chrono::Local;

use crate::models::{DuplicateGroup, Ingredient};
use crate::store::{IngredientStore, IngredientTransaction, ReferenceTable, StoreError};

/// Where the next operation should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Scan,
    Lookup,
    Reassign(ReferenceTable),
    Delete,
    Commit,
    PanicOnReassign(ReferenceTable),
}

/// A row in one of the dependent tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceRow {
    pub id: i64,
    pub ingredient_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySnapshot {
    pub ingredients: Vec<Ingredient>,
    pub references: BTreeMap<ReferenceTable, Vec<ReferenceRow>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: MemorySnapshot,
    next_id: i64,
    fail_point: Option<FailPoint>,
    newest_first: bool,
    mutations: usize,
    transactions: usize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Insert an ingredient without any uniqueness check.
    pub fn add_ingredient(&mut self, name: &str, kind: &str) -> i64 {
        let id = self.allocate_id();
        let now = Local::now().to_rfc3339();
        self.tables.ingredients.push(Ingredient {
            id,
            name: name.to_string(),
            kind: kind.to_string(),
            created_at: now.clone(),
            updated_at: now,
            deleted_at: None,
        });
        id
    }

    pub fn add_reference(&mut self, table: ReferenceTable, ingredient_id: i64) -> i64 {
        let id = self.allocate_id();
        self.tables
            .references
            .entry(table)
            .or_default()
            .push(ReferenceRow { id, ingredient_id });
        id
    }

    #[must_use]
    pub fn ingredients(&self) -> &[Ingredient] {
        &self.tables.ingredients
    }

    #[must_use]
    pub fn live_ingredients(&self) -> Vec<&Ingredient> {
        self.tables
            .ingredients
            .iter()
            .filter(|i| i.is_live())
            .collect()
    }

    #[must_use]
    pub fn references(&self, table: ReferenceTable) -> &[ReferenceRow] {
        self.tables
            .references
            .get(&table)
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn snapshot(&self) -> MemorySnapshot {
        self.tables.clone()
    }

    pub fn fail_at(&mut self, point: FailPoint) {
        self.fail_point = Some(point);
    }

    pub fn clear_failure(&mut self) {
        self.fail_point = None;
    }

    /// Hand back name lookups highest id first.
    pub fn lookups_newest_first(&mut self) {
        self.newest_first = true;
    }

    /// Committed write operations so far.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    #[must_use]
    pub fn transactions_opened(&self) -> usize {
        self.transactions
    }

    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        if self.fail_point == Some(point) {
            return Err(StoreError::Unavailable(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

impl IngredientStore for MemoryStore {
    type Tx<'a> = MemoryTransaction<'a>;

    fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, StoreError> {
        self.check(FailPoint::Scan)?;

        let mut by_name: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
        for ing in self.tables.ingredients.iter().filter(|i| i.is_live()) {
            by_name.entry(ing.name.as_str()).or_default().push(ing.id);
        }

        let mut groups: Vec<DuplicateGroup> = by_name
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(name, mut ids)| {
                ids.sort_unstable();
                DuplicateGroup {
                    name: name.to_string(),
                    count: i64::try_from(ids.len()).unwrap_or(i64::MAX),
                    ids,
                }
            })
            .collect();
        groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        Ok(groups)
    }

    fn begin(&mut self) -> Result<MemoryTransaction<'_>, StoreError> {
        self.transactions += 1;
        let staged = self.tables.clone();
        Ok(MemoryTransaction {
            store: self,
            staged,
            mutations: 0,
        })
    }
}

/// Writes land in `staged` and are published on commit; dropping discards them.
pub struct MemoryTransaction<'a> {
    store: &'a mut MemoryStore,
    staged: MemorySnapshot,
    mutations: usize,
}

impl IngredientTransaction for MemoryTransaction<'_> {
    fn ingredients_by_name(&self, name: &str) -> Result<Vec<Ingredient>, StoreError> {
        self.store.check(FailPoint::Lookup)?;
        let mut found: Vec<Ingredient> = self
            .staged
            .ingredients
            .iter()
            .filter(|i| i.is_live() && i.name == name)
            .cloned()
            .collect();
        found.sort_by_key(|i| i.id);
        if self.store.newest_first {
            found.reverse();
        }
        Ok(found)
    }

    fn reassign_references(
        &mut self,
        table: ReferenceTable,
        from: &[i64],
        to: i64,
    ) -> Result<usize, StoreError> {
        if self.store.fail_point == Some(FailPoint::PanicOnReassign(table)) {
            panic!("injected panic while updating {table}");
        }
        self.store.check(FailPoint::Reassign(table))?;

        let mut changed = 0;
        if let Some(rows) = self.staged.references.get_mut(&table) {
            for row in rows.iter_mut().filter(|r| from.contains(&r.ingredient_id)) {
                row.ingredient_id = to;
                changed += 1;
            }
        }
        self.mutations += 1;
        Ok(changed)
    }

    fn delete_ingredients(&mut self, ids: &[i64]) -> Result<usize, StoreError> {
        self.store.check(FailPoint::Delete)?;

        let now = Local::now().to_rfc3339();
        let mut deleted = 0;
        for ing in self
            .staged
            .ingredients
            .iter_mut()
            .filter(|i| i.is_live() && ids.contains(&i.id))
        {
            ing.deleted_at = Some(now.clone());
            ing.updated_at.clone_from(&now);
            deleted += 1;
        }
        self.mutations += 1;
        Ok(deleted)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.store.check(FailPoint::Commit)?;
        self.store.tables = self.staged;
        self.store.mutations += self.mutations;
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_groups_exact_names_only() {
        let mut store = MemoryStore::new();
        store.add_ingredient("Chicken", "meat");
        store.add_ingredient("Chicken", "meat");
        store.add_ingredient("chicken", "meat");
        store.add_ingredient("Chicken ", "meat");
        store.add_ingredient("Salt", "spice");

        let groups = store.duplicate_groups().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Chicken");
        assert_eq!(groups[0].ids, vec![1, 2]);
    }

    #[test]
    fn test_duplicate_groups_sorted_by_count() {
        let mut store = MemoryStore::new();
        store.add_ingredient("Beta", "x");
        store.add_ingredient("Beta", "x");
        store.add_ingredient("Alpha", "x");
        store.add_ingredient("Alpha", "x");
        store.add_ingredient("Gamma", "x");
        store.add_ingredient("Gamma", "x");
        store.add_ingredient("Gamma", "x");

        let names: Vec<String> = store
            .duplicate_groups()
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
    }

    #[test]
    fn test_dropped_transaction_discards_writes() {
        let mut store = MemoryStore::new();
        let a = store.add_ingredient("Chicken", "meat");
        let b = store.add_ingredient("Chicken", "meat");
        store.add_reference(ReferenceTable::Prices, b);
        let before = store.snapshot();

        {
            let mut tx = store.begin().unwrap();
            tx.reassign_references(ReferenceTable::Prices, &[b], a)
                .unwrap();
            tx.delete_ingredients(&[b]).unwrap();
        }

        assert_eq!(store.snapshot(), before);
        assert_eq!(store.mutation_count(), 0);
    }

    #[test]
    fn test_commit_publishes_writes() {
        let mut store = MemoryStore::new();
        let a = store.add_ingredient("Chicken", "meat");
        let b = store.add_ingredient("Chicken", "meat");
        store.add_reference(ReferenceTable::Prices, b);

        let mut tx = store.begin().unwrap();
        assert_eq!(
            tx.reassign_references(ReferenceTable::Prices, &[b], a)
                .unwrap(),
            1
        );
        assert_eq!(tx.delete_ingredients(&[b]).unwrap(), 1);
        tx.commit().unwrap();

        assert_eq!(store.references(ReferenceTable::Prices)[0].ingredient_id, a);
        assert_eq!(store.live_ingredients().len(), 1);
        assert_eq!(store.ingredients().len(), 2);
        assert_eq!(store.mutation_count(), 2);
    }

    #[test]
    fn test_fail_point_scan() {
        let mut store = MemoryStore::new();
        store.fail_at(FailPoint::Scan);
        assert!(matches!(
            store.duplicate_groups(),
            Err(StoreError::Unavailable(_))
        ));
        store.clear_failure();
        assert!(store.duplicate_groups().is_ok());
    }
}
