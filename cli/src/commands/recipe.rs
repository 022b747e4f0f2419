use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cookhouse_core::db::Database;
use cookhouse_core::models::NewRecipeIngredient;

use super::helpers::{format_cost, json_error, no_neg_zero, truncate};

pub(crate) fn cmd_recipe_create(db: &Database, name: &str, json: bool) -> Result<()> {
    let recipe = db.create_recipe(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        let id = recipe.id;
        println!("Created recipe: {} (id: {id})", recipe.name);
        println!(
            "Add ingredients with: cookhouse recipe add-ingredient {id} <ingredient-id> <quantity> [unit]"
        );
    }
    Ok(())
}

pub(crate) fn cmd_recipe_add_ingredient(
    db: &Database,
    recipe_id: i64,
    ingredient_id: i64,
    quantity: &str,
    unit: Option<String>,
    json: bool,
) -> Result<()> {
    let line = db.add_recipe_ingredient(
        recipe_id,
        &NewRecipeIngredient {
            ingredient_id,
            quantity: quantity.to_string(),
            unit: unit.unwrap_or_default(),
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&line)?);
    } else {
        let name = line.ingredient_name.as_deref().unwrap_or("?");
        let cost = format_cost(line.calculated_cost);
        println!(
            "Added {} {} of {name} to recipe {recipe_id} (cost: {cost})",
            line.quantity, line.unit
        );
    }
    Ok(())
}

pub(crate) fn cmd_recipe_remove_ingredient(
    db: &Database,
    recipe_id: i64,
    ingredient_id: i64,
    json: bool,
) -> Result<()> {
    if db.remove_recipe_ingredient(recipe_id, ingredient_id)? {
        if json {
            println!(
                "{}",
                serde_json::json!({ "recipe_id": recipe_id, "removed": ingredient_id })
            );
        } else {
            println!("Removed ingredient {ingredient_id} from recipe {recipe_id}");
        }
    } else {
        let message = format!("Ingredient {ingredient_id} not found in recipe {recipe_id}");
        if json {
            println!("{}", json_error(&message));
        } else {
            eprintln!("{message}");
        }
        process::exit(2);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_show(db: &Database, recipe_id: i64, json: bool) -> Result<()> {
    let detail = db.get_recipe_detail(recipe_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let total = no_neg_zero(detail.total_cost);
    println!("=== {} ===", detail.name);
    println!("  Total cost: {total:.2}\n");

    if detail.ingredients.is_empty() {
        println!("  No ingredients yet.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct LineRow {
        #[tabled(rename = "Ingredient")]
        name: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Unit")]
        unit: String,
        #[tabled(rename = "Latest price")]
        latest: String,
        #[tabled(rename = "Cost")]
        cost: String,
    }

    let rows: Vec<LineRow> = detail
        .ingredients
        .iter()
        .map(|i| LineRow {
            name: truncate(i.ingredient_name.as_deref().unwrap_or("?"), 30),
            quantity: i.quantity.clone(),
            unit: i.unit.clone(),
            latest: i.latest_price.as_ref().map_or_else(
                || "-".to_string(),
                |p| format!("{:.2} / {} {}", p.price, p.quantity, p.unit),
            ),
            cost: format_cost(i.calculated_cost),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let uncosted = detail
        .ingredients
        .iter()
        .filter(|i| i.calculated_cost.is_none())
        .count();
    if uncosted > 0 {
        println!("  {uncosted} ingredient(s) could not be costed and are left out of the total.");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_list(db: &Database, ingredient_id: Option<i64>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
        #[tabled(rename = "Total cost")]
        total_cost: String,
    }

    let recipes = db.list_recipes(ingredient_id)?;
    if recipes.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id,
            name: truncate(&r.name, 30),
            ingredients: r.ingredients.len(),
            total_cost: format!("{:.2}", no_neg_zero(r.total_cost)),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_recipe_delete(db: &Database, recipe_id: i64, json: bool) -> Result<()> {
    let recipe = db.get_recipe(recipe_id)?;
    db.delete_recipe(recipe_id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": recipe_id }));
    } else {
        println!("Deleted recipe: {} (id: {recipe_id})", recipe.name);
    }
    Ok(())
}
