use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cookhouse_core::db::Database;
use cookhouse_core::models::{NewOrder, Order, OrderStatus};

use super::helpers::{no_neg_zero, parse_order_item, truncate};

/// An order as typed on the command line, before items are parsed.
pub(crate) struct OrderArgs {
    pub client_id: i64,
    pub status: Option<String>,
    pub comment: String,
    pub items: Vec<String>,
}

impl OrderArgs {
    fn into_new_order(self) -> Result<NewOrder> {
        Ok(NewOrder {
            client_id: self.client_id,
            status: self.status.as_deref().map(OrderStatus::parse).transpose()?,
            comment: self.comment,
            items: self
                .items
                .iter()
                .map(String::as_str)
                .map(parse_order_item)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn print_order(order: &Order) {
    println!(
        "=== Order {} for {} ({}) ===",
        order.id,
        order.client_name.as_deref().unwrap_or("?"),
        order.status
    );
    if !order.comment.is_empty() {
        println!("  {}", order.comment);
    }

    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "Product")]
        product: String,
        #[tabled(rename = "Qty")]
        quantity: i64,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Cost")]
        cost: String,
        #[tabled(rename = "Line total")]
        total: String,
    }

    let rows: Vec<ItemRow> = order
        .items
        .iter()
        .map(|i| ItemRow {
            product: truncate(i.product_name.as_deref().unwrap_or("?"), 30),
            quantity: i.quantity,
            price: format!("{:.2}", no_neg_zero(i.price)),
            cost: format!("{:.2}", no_neg_zero(i.cost_price)),
            total: format!("{:.2}", no_neg_zero(i.price * i.quantity as f64)),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!("  Total: {:.2}", no_neg_zero(order.total));
}

pub(crate) fn cmd_order_create(db: &Database, args: OrderArgs, json: bool) -> Result<()> {
    let order = db.create_order(&args.into_new_order()?)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&order)?);
    } else {
        println!("Created order {}", order.id);
        print_order(&order);
    }
    Ok(())
}

pub(crate) fn cmd_order_list(db: &Database, status: Option<&str>, json: bool) -> Result<()> {
    let status = status.map(OrderStatus::parse).transpose()?;
    let orders = db.list_orders(status)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&orders)?);
        return Ok(());
    }

    if orders.is_empty() {
        println!("No orders.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct OrderRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Client")]
        client: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Items")]
        items: usize,
        #[tabled(rename = "Total")]
        total: String,
        #[tabled(rename = "Date")]
        date: String,
    }

    let rows: Vec<OrderRow> = orders
        .iter()
        .map(|o| OrderRow {
            id: o.id,
            client: truncate(o.client_name.as_deref().unwrap_or("?"), 25),
            status: o.status.to_string(),
            items: o.items.len(),
            total: format!("{:.2}", no_neg_zero(o.total)),
            date: o.created_at.chars().take(10).collect(),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_order_show(db: &Database, id: i64, json: bool) -> Result<()> {
    let order = db.get_order(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&order)?);
    } else {
        print_order(&order);
    }
    Ok(())
}

pub(crate) fn cmd_order_update(db: &Database, id: i64, args: OrderArgs, json: bool) -> Result<()> {
    let order = db.update_order(id, &args.into_new_order()?)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&order)?);
    } else {
        println!("Updated order {id}");
        print_order(&order);
    }
    Ok(())
}

pub(crate) fn cmd_order_status(db: &Database, id: i64, status: &str, json: bool) -> Result<()> {
    let order = db.update_order_status(id, OrderStatus::parse(status)?)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&order)?);
    } else {
        println!("Order {id} is now {}", order.status);
    }
    Ok(())
}

pub(crate) fn cmd_order_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    db.delete_order(id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted order {id}");
    }
    Ok(())
}
