use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabled::{Table, Tabled, settings::Style};
use tokio::task::{JoinHandle, spawn_blocking};

use cookhouse_core::consolidate::check_only;
use cookhouse_core::db::{Database, RECENT_ORDER_LIMIT};
use cookhouse_core::models::{CountedTable, DashboardSummary};

use super::helpers::no_neg_zero;

/// Run one read on the blocking pool against its own connection.
fn spawn_read<T, F>(path: &Path, busy_timeout: Duration, read: F) -> JoinHandle<Result<T>>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> Result<T> + Send + 'static,
{
    let path: PathBuf = path.to_path_buf();
    spawn_blocking(move || {
        let db = Database::open_with_timeout(&path, busy_timeout)?;
        read(&db)
    })
}

fn spawn_count(path: &Path, busy_timeout: Duration, table: CountedTable) -> JoinHandle<Result<i64>> {
    spawn_read(path, busy_timeout, move |db| db.count(table))
}

/// Run every dashboard read concurrently, each on its own connection.
///
/// All branches run to completion; the first failure in field order is returned.
pub(crate) async fn load_summary(db_path: &Path, busy_timeout: Duration) -> Result<DashboardSummary> {
    let recipes = spawn_count(db_path, busy_timeout, CountedTable::Recipes);
    let products = spawn_count(db_path, busy_timeout, CountedTable::Products);
    let orders = spawn_count(db_path, busy_timeout, CountedTable::Orders);
    let pending = spawn_count(db_path, busy_timeout, CountedTable::PendingOrders);
    let recent = spawn_read(db_path, busy_timeout, |db| db.recent_orders(RECENT_ORDER_LIMIT));
    let distribution = spawn_read(db_path, busy_timeout, Database::order_status_distribution);
    let profit = spawn_read(db_path, busy_timeout, Database::profit_summary);
    let ingredients = spawn_count(db_path, busy_timeout, CountedTable::Ingredients);
    let prices = spawn_count(db_path, busy_timeout, CountedTable::Prices);
    let sessions = spawn_count(db_path, busy_timeout, CountedTable::CookingSessions);
    let duplicates = spawn_read(db_path, busy_timeout, |db| {
        let report = check_only(db)?;
        Ok(i64::try_from(report.group_count())?)
    });

    let (
        recipes,
        products,
        orders,
        pending,
        recent,
        distribution,
        profit,
        ingredients,
        prices,
        sessions,
        duplicates,
    ) = tokio::join!(
        recipes,
        products,
        orders,
        pending,
        recent,
        distribution,
        profit,
        ingredients,
        prices,
        sessions,
        duplicates
    );

    Ok(DashboardSummary {
        total_recipes: recipes??,
        total_products: products??,
        total_orders: orders??,
        pending_orders: pending??,
        recent_orders: recent??,
        order_status_distribution: distribution??,
        profit: profit??,
        ingredients: ingredients??,
        prices: prices??,
        cooking_sessions: sessions??,
        duplicate_groups: duplicates??,
    })
}

pub(crate) async fn cmd_dashboard(db_path: &Path, busy_timeout: Duration, json: bool) -> Result<()> {
    let summary = load_summary(db_path, busy_timeout).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("=== Kitchen overview ===");
    println!("  Recipes:           {}", summary.total_recipes);
    println!("  Products:          {}", summary.total_products);
    println!(
        "  Orders:            {} ({} pending)",
        summary.total_orders, summary.pending_orders
    );
    println!("  Ingredients:       {}", summary.ingredients);
    println!("  Prices recorded:   {}", summary.prices);
    println!("  Cooking sessions:  {}", summary.cooking_sessions);
    if summary.duplicate_groups > 0 {
        println!(
            "  Duplicate names:   {} (run `cookhouse duplicates check`)",
            summary.duplicate_groups
        );
    } else {
        println!("  Duplicate names:   0");
    }

    let profit = &summary.profit;
    println!("\n=== Finished orders ({}) ===", profit.order_count);
    println!("  Revenue:  {:.2}", no_neg_zero(profit.total_revenue));
    println!("  Costs:    {:.2}", no_neg_zero(profit.total_costs));
    println!("  Profit:   {:.2}", no_neg_zero(profit.total_profit));

    if !summary.order_status_distribution.is_empty() {
        let by_status: Vec<String> = summary
            .order_status_distribution
            .iter()
            .map(|c| format!("{} {}", c.count, c.status))
            .collect();
        println!("\n  By status: {}", by_status.join(", "));
    }

    if summary.recent_orders.is_empty() {
        return Ok(());
    }

    #[derive(Tabled)]
    struct RecentRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Client")]
        client: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Total")]
        total: String,
        #[tabled(rename = "Date")]
        date: String,
    }

    let rows: Vec<RecentRow> = summary
        .recent_orders
        .iter()
        .map(|o| RecentRow {
            id: o.id,
            client: o.client_name.clone(),
            status: o.status.to_string(),
            total: format!("{:.2}", no_neg_zero(o.total_amount)),
            date: o.order_date.chars().take(10).collect(),
        })
        .collect();
    println!("\nRecent orders:");
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}
