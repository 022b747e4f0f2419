use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use cookhouse_core::db::Database;
use cookhouse_core::models::{Client, NewClient};

use super::helpers::truncate;

fn print_client(client: &Client) {
    println!("=== {} {} (id: {}) ===", client.name, client.surname, client.id);
    for (label, value) in [
        ("Telegram", &client.telegram),
        ("Instagram", &client.instagram),
        ("Phone", &client.phone),
        ("Address", &client.address),
        ("Source", &client.source),
    ] {
        if !value.is_empty() {
            println!("  {label}: {value}");
        }
    }
}

pub(crate) fn cmd_client_add(db: &Database, client: &NewClient, json: bool) -> Result<()> {
    let client = db.create_client(client)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&client)?);
    } else {
        println!(
            "Created client: {} {} (id: {})",
            client.name, client.surname, client.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_client_list(db: &Database, json: bool) -> Result<()> {
    let clients = db.list_clients()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&clients)?);
        return Ok(());
    }

    if clients.is_empty() {
        println!("No clients yet. Add one with: cookhouse client add <name> <surname>");
        return Ok(());
    }

    #[derive(Tabled)]
    struct ClientRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Phone")]
        phone: String,
        #[tabled(rename = "Telegram")]
        telegram: String,
        #[tabled(rename = "Source")]
        source: String,
    }

    let rows: Vec<ClientRow> = clients
        .iter()
        .map(|c| ClientRow {
            id: c.id,
            name: truncate(&format!("{} {}", c.name, c.surname), 30),
            phone: c.phone.clone(),
            telegram: truncate(&c.telegram, 20),
            source: truncate(&c.source, 20),
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_client_show(db: &Database, id: i64, json: bool) -> Result<()> {
    let client = db.get_client(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&client)?);
    } else {
        print_client(&client);
    }
    Ok(())
}

pub(crate) fn cmd_client_update(
    db: &Database,
    id: i64,
    client: &NewClient,
    json: bool,
) -> Result<()> {
    let client = db.update_client(id, client)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&client)?);
    } else {
        println!("Updated client {id}");
        print_client(&client);
    }
    Ok(())
}

pub(crate) fn cmd_client_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    db.delete_client(id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted client {id}");
    }
    Ok(())
}
