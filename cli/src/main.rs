mod commands;
mod config;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::process;

use crate::commands::{
    OrderArgs, PriceArgs, cmd_client_add, cmd_client_delete, cmd_client_list, cmd_client_show,
    cmd_client_update, cmd_dashboard, cmd_duplicates_check, cmd_duplicates_merge,
    cmd_ingredient_add, cmd_ingredient_check, cmd_ingredient_list, cmd_order_create,
    cmd_order_delete, cmd_order_list, cmd_order_show, cmd_order_status, cmd_order_update,
    cmd_package_add, cmd_package_list, cmd_price_add, cmd_price_list, cmd_product_add,
    cmd_product_delete, cmd_product_list, cmd_product_show, cmd_product_update,
    cmd_recipe_add_ingredient, cmd_recipe_create, cmd_recipe_delete, cmd_recipe_list,
    cmd_recipe_remove_ingredient, cmd_recipe_show, cmd_session_add_ingredient, cmd_session_create,
    cmd_session_list,
};
use crate::config::Config;
use cookhouse_core::db::Database;
use cookhouse_core::models::{NewClient, NewProduct, NewSessionIngredient};

#[derive(Parser)]
#[command(
    name = "cookhouse",
    version,
    about = "Recipes, ingredient prices, and cooking sessions for a small kitchen"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage ingredients
    Ingredient {
        #[command(subcommand)]
        command: IngredientCommands,
    },
    /// Record and list ingredient prices
    Price {
        #[command(subcommand)]
        command: PriceCommands,
    },
    /// Manage recipes and see what they cost
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Log cooking sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Find and merge ingredients sharing a name
    Duplicates {
        #[command(subcommand)]
        command: DuplicateCommands,
    },
    /// Manage clients
    Client {
        #[command(subcommand)]
        command: ClientCommands,
    },
    /// Manage packaging
    Package {
        #[command(subcommand)]
        command: PackageCommands,
    },
    /// Manage products for sale
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },
    /// Take and track orders
    Order {
        #[command(subcommand)]
        command: OrderCommands,
    },
    /// Show counts, recent orders and profit
    Dashboard {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum IngredientCommands {
    /// Add a new ingredient
    Add {
        /// Ingredient name (must not match an existing ingredient)
        name: String,
        /// Ingredient type, e.g. "meat", "dairy", "spice"
        #[arg(long = "type")]
        kind: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all ingredients with their latest price
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether an ingredient with this exact name exists
    Check {
        /// Ingredient name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PriceCommands {
    /// Record a purchase price
    Add {
        /// Ingredient ID
        ingredient_id: i64,
        /// Price paid for the purchased quantity
        price: f64,
        /// Purchased quantity
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
        /// Purchase unit (kg, g, l, ml, piece, ...)
        #[arg(short, long, default_value = "")]
        unit: String,
        /// Purchase date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recorded prices
    List {
        /// Only prices for this ingredient
        #[arg(long)]
        ingredient_id: Option<i64>,
        /// Only prices on this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Sort by: price, quantity, date, ingredient_name, ingredient_type, unit
        #[arg(long)]
        sort: Option<String>,
        /// Sort direction: asc or desc (default: desc)
        #[arg(long)]
        order: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Create a new recipe
    Create {
        /// Recipe name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an ingredient line to a recipe
    AddIngredient {
        /// Recipe ID
        recipe_id: i64,
        /// Ingredient ID
        ingredient_id: i64,
        /// Quantity as written, e.g. "500" or "12,5"
        quantity: String,
        /// Unit of the quantity (g, kg, ml, l, piece, ...)
        unit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an ingredient from a recipe
    RemoveIngredient {
        /// Recipe ID
        recipe_id: i64,
        /// Ingredient ID
        ingredient_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with per-ingredient costs
    Show {
        /// Recipe ID
        recipe_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recipes with their total cost
    List {
        /// Only recipes using this ingredient
        #[arg(long)]
        ingredient_id: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe along with its ingredient lines and sessions
    Delete {
        /// Recipe ID
        recipe_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Log a cooking session for a recipe
    Create {
        /// Recipe ID
        recipe_id: i64,
        /// What the session produced, e.g. "12 portions"
        #[arg(value_name = "YIELD")]
        yield_amount: String,
        /// Session date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record an ingredient used in a session
    AddIngredient {
        /// Cooking session ID
        session_id: i64,
        /// Ingredient ID
        ingredient_id: i64,
        /// Quantity used
        quantity: String,
        /// Unit of the quantity
        unit: Option<String>,
        /// Cost of the quantity used (default: derived from the latest price)
        #[arg(long)]
        price: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List cooking sessions, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DuplicateCommands {
    /// Report ingredient names held by more than one ingredient
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge duplicates into the oldest ingredient of each name
    Merge {
        /// Afterwards, make the database reject duplicate names
        #[arg(long)]
        enforce_unique: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ClientFields {
    /// First name
    name: String,
    /// Surname
    surname: String,
    #[arg(long, default_value = "")]
    telegram: String,
    #[arg(long, default_value = "")]
    instagram: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    address: String,
    /// Where the client came from, e.g. "instagram", "friend"
    #[arg(long, default_value = "")]
    source: String,
}

impl From<ClientFields> for NewClient {
    fn from(f: ClientFields) -> Self {
        NewClient {
            name: f.name,
            surname: f.surname,
            telegram: f.telegram,
            instagram: f.instagram,
            phone: f.phone,
            address: f.address,
            source: f.source,
        }
    }
}

#[derive(Subcommand)]
enum ClientCommands {
    /// Add a client
    Add {
        #[command(flatten)]
        fields: ClientFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List clients
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one client
    Show {
        /// Client ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace a client's details
    Update {
        /// Client ID
        id: i64,
        #[command(flatten)]
        fields: ClientFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a client
    Delete {
        /// Client ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PackageCommands {
    /// Add a package
    Add {
        /// Package name, e.g. "Cake box"
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List packages
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ProductFields {
    /// Product name
    name: String,
    /// Selling price
    #[arg(long)]
    price: f64,
    /// Cost to make one
    #[arg(long, default_value_t = 0.0)]
    cost: f64,
    /// Package ID
    #[arg(long = "package")]
    package_id: i64,
    #[arg(long, default_value = "")]
    description: String,
    /// Image path or URL (on update, omitted keeps the current one)
    #[arg(long)]
    image: Option<String>,
    /// Recipe the product is made from (repeatable)
    #[arg(long = "recipe")]
    recipe_ids: Vec<i64>,
}

impl From<ProductFields> for NewProduct {
    fn from(f: ProductFields) -> Self {
        NewProduct {
            name: f.name,
            description: f.description,
            price: f.price,
            cost: f.cost,
            image: f.image,
            package_id: f.package_id,
            recipe_ids: f.recipe_ids,
        }
    }
}

#[derive(Subcommand)]
enum ProductCommands {
    /// Add a product
    Add {
        #[command(flatten)]
        fields: ProductFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List products
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one product
    Show {
        /// Product ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace a product's details and recipes
    Update {
        /// Product ID
        id: i64,
        #[command(flatten)]
        fields: ProductFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a product
    Delete {
        /// Product ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct OrderFields {
    /// Client ID
    client_id: i64,
    /// new, in_progress, ready, finished or canceled
    #[arg(long)]
    status: Option<String>,
    #[arg(long, default_value = "")]
    comment: String,
    /// PRODUCT_ID:QTY:PRICE[:COST] (repeatable, cost defaults to the product's)
    #[arg(long = "item", required = true)]
    items: Vec<String>,
}

impl From<OrderFields> for OrderArgs {
    fn from(f: OrderFields) -> Self {
        OrderArgs {
            client_id: f.client_id,
            status: f.status,
            comment: f.comment,
            items: f.items,
        }
    }
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Take a new order
    Create {
        #[command(flatten)]
        fields: OrderFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List orders, newest first
    List {
        /// Only orders with this status
        #[arg(long)]
        status: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one order with its items
    Show {
        /// Order ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace an order's client, comment and items
    Update {
        /// Order ID
        id: i64,
        #[command(flatten)]
        fields: OrderFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move an order to another status
    Status {
        /// Order ID
        id: i64,
        /// new, in_progress, ready, finished or canceled
        status: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an order
    Delete {
        /// Order ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let mut db = Database::open_with_timeout(&config.db_path, config.busy_timeout)?;

    match cli.command {
        Commands::Ingredient { command } => match command {
            IngredientCommands::Add { name, kind, json } => {
                cmd_ingredient_add(&db, &name, &kind, json)
            }
            IngredientCommands::List { json } => cmd_ingredient_list(&db, json),
            IngredientCommands::Check { name, json } => cmd_ingredient_check(&db, &name, json),
        },
        Commands::Price { command } => match command {
            PriceCommands::Add {
                ingredient_id,
                price,
                quantity,
                unit,
                date,
                json,
            } => cmd_price_add(
                &db,
                PriceArgs {
                    ingredient_id,
                    price,
                    quantity,
                    unit,
                    date,
                },
                json,
            ),
            PriceCommands::List {
                ingredient_id,
                date,
                sort,
                order,
                json,
            } => cmd_price_list(
                &db,
                ingredient_id,
                date,
                sort.as_deref(),
                order.as_deref(),
                json,
            ),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Create { name, json } => cmd_recipe_create(&db, &name, json),
            RecipeCommands::AddIngredient {
                recipe_id,
                ingredient_id,
                quantity,
                unit,
                json,
            } => cmd_recipe_add_ingredient(&db, recipe_id, ingredient_id, &quantity, unit, json),
            RecipeCommands::RemoveIngredient {
                recipe_id,
                ingredient_id,
                json,
            } => cmd_recipe_remove_ingredient(&db, recipe_id, ingredient_id, json),
            RecipeCommands::Show { recipe_id, json } => cmd_recipe_show(&db, recipe_id, json),
            RecipeCommands::List {
                ingredient_id,
                json,
            } => cmd_recipe_list(&db, ingredient_id, json),
            RecipeCommands::Delete { recipe_id, json } => cmd_recipe_delete(&db, recipe_id, json),
        },
        Commands::Session { command } => match command {
            SessionCommands::Create {
                recipe_id,
                yield_amount,
                date,
                json,
            } => cmd_session_create(&db, recipe_id, &yield_amount, date, json),
            SessionCommands::AddIngredient {
                session_id,
                ingredient_id,
                quantity,
                unit,
                price,
                json,
            } => cmd_session_add_ingredient(
                &db,
                session_id,
                NewSessionIngredient {
                    ingredient_id,
                    quantity,
                    unit: unit.unwrap_or_default(),
                    price,
                },
                json,
            ),
            SessionCommands::List { json } => cmd_session_list(&db, json),
        },
        Commands::Duplicates { command } => match command {
            DuplicateCommands::Check { json } => cmd_duplicates_check(&db, json),
            DuplicateCommands::Merge {
                enforce_unique,
                json,
            } => cmd_duplicates_merge(&mut db, enforce_unique, json),
        },
        Commands::Client { command } => match command {
            ClientCommands::Add { fields, json } => cmd_client_add(&db, &fields.into(), json),
            ClientCommands::List { json } => cmd_client_list(&db, json),
            ClientCommands::Show { id, json } => cmd_client_show(&db, id, json),
            ClientCommands::Update { id, fields, json } => {
                cmd_client_update(&db, id, &fields.into(), json)
            }
            ClientCommands::Delete { id, json } => cmd_client_delete(&db, id, json),
        },
        Commands::Package { command } => match command {
            PackageCommands::Add { name, json } => cmd_package_add(&db, &name, json),
            PackageCommands::List { json } => cmd_package_list(&db, json),
        },
        Commands::Product { command } => match command {
            ProductCommands::Add { fields, json } => cmd_product_add(&db, &fields.into(), json),
            ProductCommands::List { json } => cmd_product_list(&db, json),
            ProductCommands::Show { id, json } => cmd_product_show(&db, id, json),
            ProductCommands::Update { id, fields, json } => {
                cmd_product_update(&db, id, &fields.into(), json)
            }
            ProductCommands::Delete { id, json } => cmd_product_delete(&db, id, json),
        },
        Commands::Order { command } => match command {
            OrderCommands::Create { fields, json } => cmd_order_create(&db, fields.into(), json),
            OrderCommands::List { status, json } => cmd_order_list(&db, status.as_deref(), json),
            OrderCommands::Show { id, json } => cmd_order_show(&db, id, json),
            OrderCommands::Update { id, fields, json } => {
                cmd_order_update(&db, id, fields.into(), json)
            }
            OrderCommands::Status { id, status, json } => {
                cmd_order_status(&db, id, &status, json)
            }
            OrderCommands::Delete { id, json } => cmd_order_delete(&db, id, json),
        },
        Commands::Dashboard { json } => {
            drop(db);
            cmd_dashboard(&config.db_path, config.busy_timeout, json).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_price_add_defaults() {
        let cli = Cli::try_parse_from(["cookhouse", "price", "add", "3", "4.5"]).unwrap();
        match cli.command {
            Commands::Price {
                command:
                    PriceCommands::Add {
                        ingredient_id,
                        quantity,
                        unit,
                        date,
                        ..
                    },
            } => {
                assert_eq!(ingredient_id, 3);
                assert_eq!(quantity, 1);
                assert!(unit.is_empty());
                assert!(date.is_none());
            }
            _ => panic!("expected price add"),
        }
    }

    #[test]
    fn test_parse_ingredient_add_type_flag() {
        let cli = Cli::try_parse_from([
            "cookhouse",
            "ingredient",
            "add",
            "Chicken",
            "--type",
            "meat",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ingredient {
                command: IngredientCommands::Add { ref kind, .. }
            } if kind == "meat"
        ));
    }

    #[test]
    fn test_parse_order_create_repeated_items() {
        let cli = Cli::try_parse_from([
            "cookhouse", "order", "create", "7", "--item", "1:2:30", "--item", "2:1:15:6",
            "--status", "ready",
        ])
        .unwrap();
        match cli.command {
            Commands::Order {
                command: OrderCommands::Create { fields, .. },
            } => {
                assert_eq!(fields.client_id, 7);
                assert_eq!(fields.items, vec!["1:2:30", "2:1:15:6"]);
                assert_eq!(fields.status.as_deref(), Some("ready"));
                assert!(fields.comment.is_empty());
            }
            _ => panic!("expected order create"),
        }

        // At least one item is required
        assert!(Cli::try_parse_from(["cookhouse", "order", "create", "7"]).is_err());
    }

    #[test]
    fn test_parse_product_add_recipes() {
        let cli = Cli::try_parse_from([
            "cookhouse", "product", "add", "Cake", "--price", "30", "--package", "1", "--recipe",
            "4", "--recipe", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Product {
                command: ProductCommands::Add { fields, .. },
            } => {
                let product = NewProduct::from(fields);
                assert_eq!(product.recipe_ids, vec![4, 5]);
                assert_eq!(product.package_id, 1);
                assert!(product.cost.abs() < f64::EPSILON);
                assert!(product.image.is_none());
            }
            _ => panic!("expected product add"),
        }
    }

    #[test]
    fn test_parse_client_add() {
        let cli = Cli::try_parse_from([
            "cookhouse", "client", "add", "Anna", "Ivanova", "--phone", "+7 900",
        ])
        .unwrap();
        match cli.command {
            Commands::Client {
                command: ClientCommands::Add { fields, .. },
            } => {
                let client = NewClient::from(fields);
                assert_eq!(client.surname, "Ivanova");
                assert_eq!(client.phone, "+7 900");
                assert!(client.telegram.is_empty());
            }
            _ => panic!("expected client add"),
        }
    }

    #[test]
    fn test_parse_duplicates_merge() {
        let cli =
            Cli::try_parse_from(["cookhouse", "duplicates", "merge", "--enforce-unique"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Duplicates {
                command: DuplicateCommands::Merge {
                    enforce_unique: true,
                    json: false
                }
            }
        ));
    }
}
