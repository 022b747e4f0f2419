use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cookhouse_core::db::Database;
use cookhouse_core::models::{NewCookingSession, NewSessionIngredient};

use super::helpers::{parse_optional_date, truncate};

pub(crate) fn cmd_session_create(
    db: &Database,
    recipe_id: i64,
    yield_amount: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let session = db.create_cooking_session(&NewCookingSession {
        recipe_id,
        date: parse_optional_date(date)?,
        yield_amount: yield_amount.to_string(),
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        let recipe = session.recipe_name.as_deref().unwrap_or("?");
        println!(
            "Logged cooking session {} for {recipe} on {} (yield: {})",
            session.id, session.date, session.yield_amount
        );
    }
    Ok(())
}

pub(crate) fn cmd_session_add_ingredient(
    db: &Database,
    session_id: i64,
    ingredient: NewSessionIngredient,
    json: bool,
) -> Result<()> {
    let line = db.add_session_ingredient(session_id, &ingredient)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&line)?);
    } else {
        let name = line.ingredient_name.as_deref().unwrap_or("?");
        println!(
            "Added {} {} of {name} to session {session_id} ({:.2})",
            line.quantity, line.unit, line.price
        );
    }
    Ok(())
}

pub(crate) fn cmd_session_list(db: &Database, json: bool) -> Result<()> {
    let sessions = db.list_cooking_sessions()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No cooking sessions logged.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct SessionRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Recipe")]
        recipe: String,
        #[tabled(rename = "Yield")]
        yield_amount: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
        #[tabled(rename = "Cost")]
        cost: String,
    }

    let rows: Vec<SessionRow> = sessions
        .iter()
        .map(|s| SessionRow {
            id: s.id,
            date: s.date.to_string(),
            recipe: truncate(s.recipe_name.as_deref().unwrap_or("?"), 30),
            yield_amount: truncate(&s.yield_amount, 20),
            ingredients: s.ingredients.len(),
            cost: format!("{:.2}", s.ingredients.iter().map(|i| i.price).sum::<f64>()),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
