//! Duplicate ingredient consolidation.
//!
//! Ingredient names are meant to be unique among live rows but storage does not
//! enforce it. A consolidation run finds every name held by more than one live
//! ingredient, keeps the lowest id as the master, repoints recipe lines, prices
//! and cooking-session lines at it, and soft-deletes the rest. The whole run is a
//! single transaction: either every group is merged or nothing changes.

use log::{info, warn};
use thiserror::Error;

use crate::models::{ConsolidationReport, DuplicateReport, Ingredient, MergedGroup};
use crate::store::{IngredientStore, IngredientTransaction, ReferenceTable, StoreError};

#[derive(Debug, Error)]
pub enum ConsolidateError {
    #[error("failed to scan for duplicate ingredients")]
    ScanFailed(#[source] StoreError),
    #[error("failed to begin consolidation transaction")]
    BeginFailed(#[source] StoreError),
    #[error("failed to load ingredients named '{name}'")]
    LookupFailed {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to update {table} while merging '{name}'")]
    ReferenceUpdateFailed {
        name: String,
        table: ReferenceTable,
        #[source]
        source: StoreError,
    },
    #[error("failed to delete duplicates of '{name}'")]
    DeleteFailed {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to commit consolidation")]
    CommitFailed(#[source] StoreError),
}

/// Report duplicate groups without writing anything.
pub fn check_only<S: IngredientStore>(store: &S) -> Result<DuplicateReport, ConsolidateError> {
    let groups = store
        .duplicate_groups()
        .map_err(ConsolidateError::ScanFailed)?;

    if groups.is_empty() {
        info!("No duplicate ingredients found");
    } else {
        info!("Found {} groups of duplicate ingredients", groups.len());
        for group in &groups {
            info!("  - '{}': {} duplicates", group.name, group.count);
        }
    }

    Ok(DuplicateReport { groups })
}

/// Merge every duplicate group in one transaction.
///
/// A failure at any step rolls back the whole run. Panics unwind through the
/// open transaction, which rolls back on drop.
pub fn consolidate<S: IngredientStore>(
    store: &mut S,
) -> Result<ConsolidationReport, ConsolidateError> {
    let groups = store
        .duplicate_groups()
        .map_err(ConsolidateError::ScanFailed)?;
    info!("Found {} duplicate groups", groups.len());

    if groups.is_empty() {
        return Ok(ConsolidationReport::default());
    }

    let mut tx = store.begin().map_err(ConsolidateError::BeginFailed)?;
    let mut report = ConsolidationReport::default();

    for group in &groups {
        match merge_group(&mut tx, &group.name) {
            Ok(Some(merged)) => report.groups.push(merged),
            Ok(None) => {}
            Err(err) => {
                warn!("Rolling back consolidation: {err}");
                if let Err(rollback_err) = tx.rollback() {
                    warn!("Rollback failed: {rollback_err}");
                }
                return Err(err);
            }
        }
    }

    tx.commit().map_err(ConsolidateError::CommitFailed)?;
    info!(
        "Successfully merged {} duplicate ingredients",
        report.merged_count()
    );
    Ok(report)
}

fn merge_group<T: IngredientTransaction>(
    tx: &mut T,
    name: &str,
) -> Result<Option<MergedGroup>, ConsolidateError> {
    let ingredients =
        tx.ingredients_by_name(name)
            .map_err(|source| ConsolidateError::LookupFailed {
                name: name.to_string(),
                source,
            })?;

    // The group may have shrunk since the scan.
    let Some((master_id, merged_ids)) = elect_master(&ingredients) else {
        return Ok(None);
    };
    info!(
        "Merging {} duplicates for ingredient '{name}'",
        ingredients.len()
    );

    for table in ReferenceTable::ALL {
        tx.reassign_references(table, &merged_ids, master_id)
            .map_err(|source| ConsolidateError::ReferenceUpdateFailed {
                name: name.to_string(),
                table,
                source,
            })?;
    }

    tx.delete_ingredients(&merged_ids)
        .map_err(|source| ConsolidateError::DeleteFailed {
            name: name.to_string(),
            source,
        })?;

    info!(
        "Merged {} duplicates for '{name}' into master ID: {master_id}",
        merged_ids.len()
    );
    Ok(Some(MergedGroup {
        name: name.to_string(),
        master_id,
        merged_ids,
    }))
}

/// Lowest id wins; the rest are returned ascending. `None` unless at least two
/// rows remain. Makes no assumption about the order the store returned them in.
fn elect_master(ingredients: &[Ingredient]) -> Option<(i64, Vec<i64>)> {
    let master_id = ingredients.iter().map(|i| i.id).min()?;
    let mut merged_ids: Vec<i64> = ingredients
        .iter()
        .map(|i| i.id)
        .filter(|id| *id != master_id)
        .collect();
    if merged_ids.is_empty() {
        return None;
    }
    merged_ids.sort_unstable();
    merged_ids.dedup();
    Some((master_id, merged_ids))
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::memory_store::{FailPoint, MemoryStore};

    /// Three "Chicken" rows (ids 1, 2, 3), each referenced from every dependent table,
    /// plus an unrelated "Salt".
    fn chicken_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        let ids = [
            store.add_ingredient("Chicken", "meat"),
            store.add_ingredient("Chicken", "meat"),
            store.add_ingredient("Chicken", "meat"),
        ];
        let salt = store.add_ingredient("Salt", "spice");
        for id in ids {
            for table in ReferenceTable::ALL {
                store.add_reference(table, id);
            }
        }
        store.add_reference(ReferenceTable::Prices, salt);
        store
    }

    #[test]
    fn test_consolidate_merges_into_lowest_id() {
        let mut store = chicken_store();
        let report = consolidate(&mut store).unwrap();

        assert_eq!(
            report.groups,
            vec![MergedGroup {
                name: "Chicken".to_string(),
                master_id: 1,
                merged_ids: vec![2, 3],
            }]
        );
        assert_eq!(report.merged_count(), 2);

        let live: Vec<i64> = store.live_ingredients().iter().map(|i| i.id).collect();
        assert_eq!(live, vec![1, 4]);
        // Redundant rows are soft-deleted, not removed
        assert_eq!(store.ingredients().len(), 4);

        for table in ReferenceTable::ALL {
            let chicken_refs: Vec<i64> = store
                .references(table)
                .iter()
                .map(|r| r.ingredient_id)
                .filter(|id| *id != 4)
                .collect();
            assert_eq!(chicken_refs, vec![1, 1, 1], "table {table}");
        }
        // Salt untouched
        assert!(
            store
                .references(ReferenceTable::Prices)
                .iter()
                .any(|r| r.ingredient_id == 4)
        );
    }

    #[test]
    fn test_consolidate_is_idempotent() {
        let mut store = chicken_store();
        consolidate(&mut store).unwrap();
        let mutations = store.mutation_count();
        let transactions = store.transactions_opened();

        assert_eq!(check_only(&store).unwrap().group_count(), 0);

        let second = consolidate(&mut store).unwrap();
        assert!(second.groups.is_empty());
        assert_eq!(store.mutation_count(), mutations);
        assert_eq!(store.transactions_opened(), transactions);
    }

    #[test]
    fn test_multiple_groups_share_one_transaction() {
        let mut store = chicken_store();
        store.add_ingredient("Salt", "spice");
        let report = consolidate(&mut store).unwrap();

        assert_eq!(report.groups.len(), 2);
        assert_eq!(store.transactions_opened(), 1);
        assert_eq!(store.live_ingredients().len(), 2);
    }

    #[test]
    fn test_failure_on_second_table_rolls_back_everything() {
        let mut store = chicken_store();
        store.add_ingredient("Salt", "spice");
        let before = store.snapshot();

        store.fail_at(FailPoint::Reassign(ReferenceTable::Prices));
        let err = consolidate(&mut store).unwrap_err();

        match err {
            ConsolidateError::ReferenceUpdateFailed { ref name, table, .. } => {
                assert_eq!(name, "Chicken");
                assert_eq!(table, ReferenceTable::Prices);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.mutation_count(), 0);
    }

    #[test]
    fn test_delete_failure_rolls_back() {
        let mut store = chicken_store();
        let before = store.snapshot();
        store.fail_at(FailPoint::Delete);

        let err = consolidate(&mut store).unwrap_err();
        assert!(matches!(err, ConsolidateError::DeleteFailed { .. }));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_commit_failure_leaves_store_untouched() {
        let mut store = chicken_store();
        let before = store.snapshot();
        store.fail_at(FailPoint::Commit);

        let err = consolidate(&mut store).unwrap_err();
        assert!(matches!(err, ConsolidateError::CommitFailed(_)));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_scan_failure_opens_no_transaction() {
        let mut store = chicken_store();
        store.fail_at(FailPoint::Scan);

        let err = consolidate(&mut store).unwrap_err();
        assert!(matches!(err, ConsolidateError::ScanFailed(_)));
        assert_eq!(store.transactions_opened(), 0);

        assert!(matches!(
            check_only(&store),
            Err(ConsolidateError::ScanFailed(_))
        ));
    }

    #[test]
    fn test_lookup_failure_names_the_group() {
        let mut store = chicken_store();
        store.fail_at(FailPoint::Lookup);

        let err = consolidate(&mut store).unwrap_err();
        assert_eq!(err.to_string(), "failed to load ingredients named 'Chicken'");
    }

    #[test]
    fn test_panic_mid_run_rolls_back() {
        let mut store = chicken_store();
        let before = store.snapshot();
        store.fail_at(FailPoint::PanicOnReassign(
            ReferenceTable::CookingSessionIngredients,
        ));

        let outcome = catch_unwind(AssertUnwindSafe(|| consolidate(&mut store)));
        assert!(outcome.is_err());
        assert_eq!(store.snapshot(), before);

        store.clear_failure();
        assert_eq!(consolidate(&mut store).unwrap().merged_count(), 2);
    }

    #[test]
    fn test_master_is_lowest_id_whatever_the_lookup_order() {
        let mut store = chicken_store();
        store.lookups_newest_first();

        let report = consolidate(&mut store).unwrap();
        assert_eq!(report.groups[0].master_id, 1);
        assert_eq!(report.groups[0].merged_ids, vec![2, 3]);
        let live: Vec<i64> = store.live_ingredients().iter().map(|i| i.id).collect();
        assert_eq!(live, vec![1, 4]);
        for table in ReferenceTable::ALL {
            assert!(
                store
                    .references(table)
                    .iter()
                    .all(|r| r.ingredient_id == 1 || r.ingredient_id == 4),
                "table {table}"
            );
        }
    }

    #[test]
    fn test_elect_master() {
        let ingredient = |id: i64| Ingredient {
            id,
            name: "Chicken".to_string(),
            kind: "meat".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
            deleted_at: None,
        };
        assert_eq!(
            elect_master(&[ingredient(7), ingredient(3), ingredient(5)]),
            Some((3, vec![5, 7]))
        );
        assert_eq!(elect_master(&[ingredient(3)]), None);
        assert_eq!(elect_master(&[]), None);
    }

    #[test]
    fn test_case_and_whitespace_variants_are_distinct() {
        let mut store = MemoryStore::new();
        store.add_ingredient("Chicken", "meat");
        store.add_ingredient("chicken", "meat");
        store.add_ingredient("Chicken ", "meat");

        assert_eq!(check_only(&store).unwrap().group_count(), 0);
        assert!(consolidate(&mut store).unwrap().groups.is_empty());
        assert_eq!(store.live_ingredients().len(), 3);
    }

    #[test]
    fn test_check_only_reports_without_writing() {
        let store = chicken_store();
        let before = store.snapshot();

        let report = check_only(&store).unwrap();
        assert_eq!(report.group_count(), 1);
        assert_eq!(report.groups[0].name, "Chicken");
        assert_eq!(report.groups[0].count, 3);
        assert_eq!(report.groups[0].ids, vec![1, 2, 3]);
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.transactions_opened(), 0);
    }
}
