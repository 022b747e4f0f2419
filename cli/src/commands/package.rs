use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use cookhouse_core::db::Database;

pub(crate) fn cmd_package_add(db: &Database, name: &str, json: bool) -> Result<()> {
    let package = db.create_package(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&package)?);
    } else {
        println!("Created package: {} (id: {})", package.name, package.id);
    }
    Ok(())
}

pub(crate) fn cmd_package_list(db: &Database, json: bool) -> Result<()> {
    let packages = db.list_packages()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
        return Ok(());
    }

    if packages.is_empty() {
        println!("No packages yet. Add one with: cookhouse package add <name>");
        return Ok(());
    }

    #[derive(Tabled)]
    struct PackageRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
    }

    let rows: Vec<PackageRow> = packages
        .into_iter()
        .map(|p| PackageRow {
            id: p.id,
            name: p.name,
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}
