use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cookhouse_core::db::Database;
use cookhouse_core::models::NewIngredient;

use super::helpers::truncate;

pub(crate) fn cmd_ingredient_add(db: &Database, name: &str, kind: &str, json: bool) -> Result<()> {
    let ingredient = db.create_ingredient(&NewIngredient {
        name: name.to_string(),
        kind: kind.to_string(),
    })?;
    if json {
        println!("{}", serde_json::to_string_pretty(&ingredient)?);
    } else {
        let id = ingredient.id;
        println!(
            "Created ingredient: {} ({}) (id: {id})",
            ingredient.name, ingredient.kind
        );
    }
    Ok(())
}

pub(crate) fn cmd_ingredient_list(db: &Database, json: bool) -> Result<()> {
    let ingredients = db.list_ingredients()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ingredients)?);
        return Ok(());
    }

    if ingredients.is_empty() {
        println!("No ingredients yet. Add one with: cookhouse ingredient add <name> --type <type>");
        return Ok(());
    }

    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Latest price")]
        latest: String,
    }

    let mut rows = Vec::with_capacity(ingredients.len());
    for ing in &ingredients {
        let latest = db.latest_price(ing.id)?.map_or_else(
            || "-".to_string(),
            |p| format!("{:.2} / {} {}", p.price, p.quantity, p.unit),
        );
        rows.push(IngredientRow {
            id: ing.id,
            name: truncate(&ing.name, 35),
            kind: truncate(&ing.kind, 20),
            latest,
        });
    }

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_ingredient_check(db: &Database, name: &str, json: bool) -> Result<()> {
    let found = db.find_ingredient_by_name(name)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "exists": found.is_some(),
                "ingredient": found,
            }))?
        );
    } else {
        match found {
            Some(ing) => println!("'{}' exists (id: {}, type: {})", ing.name, ing.id, ing.kind),
            None => println!("No ingredient named '{}'", name.trim()),
        }
    }
    Ok(())
}
