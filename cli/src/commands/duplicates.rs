use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cookhouse_core::consolidate::{check_only, consolidate};
use cookhouse_core::db::Database;
use cookhouse_core::models::DuplicateGroup;

use super::helpers::truncate;

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn print_group_table(groups: &[DuplicateGroup]) {
    #[derive(Tabled)]
    struct GroupRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Count")]
        count: i64,
        #[tabled(rename = "IDs")]
        ids: String,
    }

    let rows: Vec<GroupRow> = groups
        .iter()
        .map(|g| GroupRow {
            name: truncate(&g.name, 35),
            count: g.count,
            ids: join_ids(&g.ids),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn cmd_duplicates_check(db: &Database, json: bool) -> Result<()> {
    let report = check_only(db)?;
    let unique_index = db.has_unique_name_index()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "groups": report.groups,
                "unique_index": unique_index,
            }))?
        );
        return Ok(());
    }

    if report.groups.is_empty() {
        println!("No duplicate ingredients found.");
    } else {
        println!("Found {} groups of duplicate ingredients:", report.group_count());
        print_group_table(&report.groups);
        println!("Run `cookhouse duplicates merge` to consolidate them.");
    }

    if unique_index {
        println!("Ingredient names are enforced unique.");
    } else {
        println!("Ingredient names are not enforced unique (use `duplicates merge --enforce-unique`).");
    }
    Ok(())
}

pub(crate) fn cmd_duplicates_merge(db: &mut Database, enforce_unique: bool, json: bool) -> Result<()> {
    let report = consolidate(db)?;
    if enforce_unique {
        db.enforce_unique_names()?;
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "groups": report.groups,
                "merged": report.merged_count(),
                "unique_index": db.has_unique_name_index()?,
            }))?
        );
        return Ok(());
    }

    if report.groups.is_empty() {
        println!("No duplicate ingredients found; nothing to merge.");
    } else {
        for group in &report.groups {
            println!(
                "Merged '{}': kept {}, removed {}",
                group.name,
                group.master_id,
                join_ids(&group.merged_ids)
            );
        }
        println!(
            "Successfully merged {} duplicate ingredients.",
            report.merged_count()
        );
    }
    if enforce_unique {
        println!("Ingredient names are now enforced unique.");
    }
    Ok(())
}
