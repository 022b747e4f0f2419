use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cookhouse_core::db::Database;
use cookhouse_core::models::{NewProduct, Product};

use super::helpers::{no_neg_zero, truncate};

fn recipe_list(product: &Product) -> String {
    if product.recipe_ids.is_empty() {
        return "-".to_string();
    }
    product
        .recipe_ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_product(product: &Product) {
    let margin = no_neg_zero(product.price - product.cost);
    println!("=== {} (id: {}) ===", product.name, product.id);
    if !product.description.is_empty() {
        println!("  {}", product.description);
    }
    println!(
        "  Price: {:.2}  Cost: {:.2}  Margin: {margin:.2}",
        no_neg_zero(product.price),
        no_neg_zero(product.cost)
    );
    println!(
        "  Package: {} (id: {})",
        product.package_name.as_deref().unwrap_or("?"),
        product.package_id
    );
    println!("  Recipes: {}", recipe_list(product));
    if !product.image.is_empty() {
        println!("  Image: {}", product.image);
    }
}

pub(crate) fn cmd_product_add(db: &Database, product: &NewProduct, json: bool) -> Result<()> {
    let product = db.create_product(product)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&product)?);
    } else {
        println!("Created product: {} (id: {})", product.name, product.id);
    }
    Ok(())
}

pub(crate) fn cmd_product_list(db: &Database, json: bool) -> Result<()> {
    let products = db.list_products()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&products)?);
        return Ok(());
    }

    if products.is_empty() {
        println!(
            "No products yet. Add one with: cookhouse product add <name> --price <price> --package <id>"
        );
        return Ok(());
    }

    #[derive(Tabled)]
    struct ProductRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Cost")]
        cost: String,
        #[tabled(rename = "Package")]
        package: String,
        #[tabled(rename = "Recipes")]
        recipes: String,
    }

    let rows: Vec<ProductRow> = products
        .iter()
        .map(|p| ProductRow {
            id: p.id,
            name: truncate(&p.name, 30),
            price: format!("{:.2}", no_neg_zero(p.price)),
            cost: format!("{:.2}", no_neg_zero(p.cost)),
            package: truncate(p.package_name.as_deref().unwrap_or("?"), 20),
            recipes: recipe_list(p),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_product_show(db: &Database, id: i64, json: bool) -> Result<()> {
    let product = db.get_product(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&product)?);
    } else {
        print_product(&product);
    }
    Ok(())
}

pub(crate) fn cmd_product_update(
    db: &Database,
    id: i64,
    product: &NewProduct,
    json: bool,
) -> Result<()> {
    let product = db.update_product(id, product)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&product)?);
    } else {
        println!("Updated product {id}");
        print_product(&product);
    }
    Ok(())
}

pub(crate) fn cmd_product_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    db.delete_product(id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted product {id}");
    }
    Ok(())
}
