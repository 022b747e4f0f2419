use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cookhouse_core::db::Database;
use cookhouse_core::models::{NewPrice, PriceFilter, PriceSortColumn, SortDirection};

use super::helpers::{parse_optional_date, truncate};

pub(crate) struct PriceArgs {
    pub ingredient_id: i64,
    pub price: f64,
    pub quantity: i64,
    pub unit: String,
    pub date: Option<String>,
}

pub(crate) fn cmd_price_add(db: &Database, args: PriceArgs, json: bool) -> Result<()> {
    let price = db.add_price(&NewPrice {
        ingredient_id: args.ingredient_id,
        price: args.price,
        quantity: args.quantity,
        unit: args.unit,
        date: parse_optional_date(args.date)?,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&price)?);
    } else {
        let name = price.ingredient_name.as_deref().unwrap_or("?");
        println!(
            "Recorded {:.2} for {} {} of {name} on {} (id: {})",
            price.price, price.quantity, price.unit, price.date, price.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_price_list(
    db: &Database,
    ingredient_id: Option<i64>,
    date: Option<String>,
    sort: Option<&str>,
    order: Option<&str>,
    json: bool,
) -> Result<()> {
    let filter = PriceFilter {
        ingredient_id,
        date: parse_optional_date(date)?,
        sort_column: sort.map(PriceSortColumn::parse).transpose()?.unwrap_or_default(),
        sort_direction: order.map(SortDirection::parse).transpose()?.unwrap_or_default(),
    };
    let prices = db.list_prices(&filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&prices)?);
        return Ok(());
    }

    if prices.is_empty() {
        println!("No prices found.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct PriceRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Ingredient")]
        ingredient: String,
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Qty")]
        quantity: i64,
        #[tabled(rename = "Unit")]
        unit: String,
    }

    let rows: Vec<PriceRow> = prices
        .iter()
        .map(|p| PriceRow {
            id: p.id,
            date: p.date.to_string(),
            ingredient: truncate(p.ingredient_name.as_deref().unwrap_or("?"), 30),
            kind: truncate(p.ingredient_type.as_deref().unwrap_or("-"), 15),
            price: format!("{:.2}", p.price),
            quantity: p.quantity,
            unit: p.unit.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
