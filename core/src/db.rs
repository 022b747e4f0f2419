use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use log::debug;
use rusqlite::types::{Type, Value};
use rusqlite::{
    Connection, OptionalExtension, TransactionBehavior, params, params_from_iter,
};

use crate::cost::compute_cost;
use crate::models::{
    Client, CookingSession, CookingSessionIngredient, CountedTable, DuplicateGroup, Ingredient,
    NewClient, NewCookingSession, NewIngredient, NewOrder, NewPrice, NewProduct,
    NewRecipeIngredient, NewSessionIngredient, Order, OrderItem, OrderStatus, Package, Price,
    PriceFilter, Product, ProfitSummary, Recipe, RecipeDetail, RecipeIngredient, RecentOrder,
    StatusCount, validate_order, validate_price, validate_product, validate_quantity_text,
};
use crate::store::{IngredientStore, IngredientTransaction, ReferenceTable, StoreError};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const DATE_FORMAT: &str = "%Y-%m-%d";
const UNIQUE_NAME_INDEX: &str = "idx_ingredients_name_live";

const INGREDIENT_COLUMNS: &str = "id, name, type, created_at, updated_at, deleted_at";

// Expects prices aliased as p, ingredients as i
const PRICE_COLUMNS: &str = "p.id, p.ingredient_id, p.price, p.quantity, p.unit, p.date, \
     p.created_at, p.updated_at, i.name, i.type";

const CLIENT_COLUMNS: &str =
    "id, name, surname, telegram, instagram, phone, address, source, created_at, updated_at";

// Expects products aliased as p, packages as pk
const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.price, p.cost, p.image, \
     p.package_id, pk.name, p.created_at, p.updated_at";

// Expects orders aliased as o, clients as c
const ORDER_COLUMNS: &str =
    "o.id, o.client_id, c.name, o.status, o.comment, o.created_at, o.updated_at";

pub const RECENT_ORDER_LIMIT: usize = 5;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open with a bound on how long writes wait for a competing writer.
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.busy_timeout(busy_timeout)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            // ingredients.name carries no UNIQUE constraint, see enforce_unique_names
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    type TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    deleted_at TEXT
                );

                CREATE TABLE IF NOT EXISTS prices (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
                    price REAL NOT NULL,
                    quantity INTEGER NOT NULL DEFAULT 1,
                    unit TEXT NOT NULL DEFAULT '',
                    date TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
                    quantity TEXT NOT NULL,
                    unit TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS cooking_sessions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    date TEXT NOT NULL,
                    yield_amount TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS cooking_session_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    cooking_session_id INTEGER NOT NULL REFERENCES cooking_sessions(id) ON DELETE CASCADE,
                    ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
                    quantity TEXT NOT NULL,
                    price REAL NOT NULL,
                    unit TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE INDEX IF NOT EXISTS idx_ingredients_name ON ingredients(name);
                 CREATE INDEX IF NOT EXISTS idx_prices_ingredient_id ON prices(ingredient_id);
                 CREATE INDEX IF NOT EXISTS idx_prices_date ON prices(date DESC);
                 CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe_id ON recipe_ingredients(recipe_id);
                 CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_ingredient_id ON recipe_ingredients(ingredient_id);
                 CREATE INDEX IF NOT EXISTS idx_cooking_sessions_recipe_id ON cooking_sessions(recipe_id);
                 CREATE INDEX IF NOT EXISTS idx_cooking_sessions_date ON cooking_sessions(date DESC);
                 CREATE INDEX IF NOT EXISTS idx_cooking_session_ingredients_session ON cooking_session_ingredients(cooking_session_id);

                 PRAGMA user_version = 2;",
            )?;
        }

        if version < 3 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS clients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    surname TEXT NOT NULL,
                    telegram TEXT NOT NULL DEFAULT '',
                    instagram TEXT NOT NULL DEFAULT '',
                    phone TEXT NOT NULL DEFAULT '',
                    address TEXT NOT NULL DEFAULT '',
                    source TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    deleted_at TEXT
                );

                CREATE TABLE IF NOT EXISTS packages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS products (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    price REAL NOT NULL,
                    cost REAL NOT NULL DEFAULT 0,
                    image TEXT NOT NULL DEFAULT '',
                    package_id INTEGER NOT NULL REFERENCES packages(id),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    deleted_at TEXT
                );

                CREATE TABLE IF NOT EXISTS product_options (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS orders (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    client_id INTEGER NOT NULL REFERENCES clients(id),
                    status TEXT NOT NULL,
                    comment TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    deleted_at TEXT
                );

                CREATE TABLE IF NOT EXISTS order_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
                    product_id INTEGER NOT NULL REFERENCES products(id),
                    quantity INTEGER NOT NULL,
                    price REAL NOT NULL,
                    cost_price REAL NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_product_options_product_id ON product_options(product_id);
                CREATE INDEX IF NOT EXISTS idx_product_options_recipe_id ON product_options(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
                CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at DESC);
                CREATE INDEX IF NOT EXISTS idx_order_items_order_id ON order_items(order_id);

                PRAGMA user_version = 3;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<Ingredient> {
        Ok(Ingredient {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            deleted_at: row.get(5)?,
        })
    }

    fn date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
        let raw: String = row.get(idx)?;
        NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn price_from_row(row: &rusqlite::Row) -> rusqlite::Result<Price> {
        Ok(Price {
            id: row.get(0)?,
            ingredient_id: row.get(1)?,
            price: row.get(2)?,
            quantity: row.get(3)?,
            unit: row.get(4)?,
            date: Self::date_column(row, 5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            ingredient_name: row.get(8)?,
            ingredient_type: row.get(9)?,
        })
    }

    // Expects columns:
    // 0: ri.id, 1: ri.recipe_id, 2: ri.ingredient_id, 3: ri.quantity, 4: ri.unit,
    // 5: i.name, 6: i.type
    fn recipe_ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<RecipeIngredient> {
        Ok(RecipeIngredient {
            id: row.get(0)?,
            recipe_id: row.get(1)?,
            ingredient_id: row.get(2)?,
            quantity: row.get(3)?,
            unit: row.get(4)?,
            ingredient_name: row.get(5)?,
            ingredient_type: row.get(6)?,
            latest_price: None,
            calculated_cost: None,
        })
    }

    // Expects columns:
    // 0: cs.id, 1: cs.recipe_id, 2: r.name, 3: cs.date, 4: cs.yield_amount,
    // 5: cs.created_at, 6: cs.updated_at
    fn cooking_session_from_row(row: &rusqlite::Row) -> rusqlite::Result<CookingSession> {
        Ok(CookingSession {
            id: row.get(0)?,
            recipe_id: row.get(1)?,
            recipe_name: row.get(2)?,
            date: Self::date_column(row, 3)?,
            yield_amount: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            ingredients: Vec::new(),
        })
    }

    fn session_ingredient_from_row(
        row: &rusqlite::Row,
    ) -> rusqlite::Result<CookingSessionIngredient> {
        Ok(CookingSessionIngredient {
            id: row.get(0)?,
            cooking_session_id: row.get(1)?,
            ingredient_id: row.get(2)?,
            ingredient_name: row.get(3)?,
            quantity: row.get(4)?,
            price: row.get(5)?,
            unit: row.get(6)?,
        })
    }

    fn status_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<OrderStatus> {
        let raw: String = row.get(idx)?;
        OrderStatus::parse(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
    }

    fn client_from_row(row: &rusqlite::Row) -> rusqlite::Result<Client> {
        Ok(Client {
            id: row.get(0)?,
            name: row.get(1)?,
            surname: row.get(2)?,
            telegram: row.get(3)?,
            instagram: row.get(4)?,
            phone: row.get(5)?,
            address: row.get(6)?,
            source: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn product_from_row(row: &rusqlite::Row) -> rusqlite::Result<Product> {
        Ok(Product {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            price: row.get(3)?,
            cost: row.get(4)?,
            image: row.get(5)?,
            package_id: row.get(6)?,
            package_name: row.get(7)?,
            recipe_ids: Vec::new(),
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn order_from_row(row: &rusqlite::Row) -> rusqlite::Result<Order> {
        Ok(Order {
            id: row.get(0)?,
            client_id: row.get(1)?,
            client_name: row.get(2)?,
            status: Self::status_column(row, 3)?,
            comment: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            items: Vec::new(),
            total: 0.0,
        })
    }

    // Expects columns:
    // 0: oi.id, 1: oi.order_id, 2: oi.product_id, 3: p.name, 4: oi.quantity,
    // 5: oi.price, 6: oi.cost_price
    fn order_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<OrderItem> {
        Ok(OrderItem {
            id: row.get(0)?,
            order_id: row.get(1)?,
            product_id: row.get(2)?,
            product_name: row.get(3)?,
            quantity: row.get(4)?,
            price: row.get(5)?,
            cost_price: row.get(6)?,
        })
    }

    // --- Ingredients ---

    pub fn create_ingredient(&self, ingredient: &NewIngredient) -> Result<Ingredient> {
        let ingredient = ingredient.normalized()?;
        if let Some(existing) = self.find_ingredient_by_name(&ingredient.name)? {
            bail!(
                "Ingredient '{}' already exists (id: {})",
                existing.name,
                existing.id
            );
        }

        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO ingredients (name, type, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![ingredient.name, ingredient.kind, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_ingredient(id)
    }

    pub fn get_ingredient(&self, id: i64) -> Result<Ingredient> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = ?1 AND deleted_at IS NULL"
                ),
                params![id],
                Self::ingredient_from_row,
            )
            .with_context(|| format!("Ingredient {id} not found"))
    }

    /// Exact (case-sensitive) match on the trimmed name, lowest id first.
    pub fn find_ingredient_by_name(&self, name: &str) -> Result<Option<Ingredient>> {
        let found = self
            .conn
            .query_row(
                &format!(
                    "SELECT {INGREDIENT_COLUMNS} FROM ingredients
                     WHERE name = ?1 AND deleted_at IS NULL
                     ORDER BY id LIMIT 1"
                ),
                params![name.trim()],
                Self::ingredient_from_row,
            )
            .optional()?;
        Ok(found)
    }

    pub fn list_ingredients(&self) -> Result<Vec<Ingredient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE deleted_at IS NULL ORDER BY name, id"
        ))?;
        let ingredients = stmt
            .query_map([], Self::ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ingredients)
    }

    // --- Prices ---

    pub fn add_price(&self, price: &NewPrice) -> Result<Price> {
        validate_price(price)?;
        self.get_ingredient(price.ingredient_id)?;

        let date = price.date.unwrap_or_else(|| Local::now().date_naive());
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO prices (ingredient_id, price, quantity, unit, date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                price.ingredient_id,
                price.price,
                price.quantity,
                price.unit.trim(),
                date.format(DATE_FORMAT).to_string(),
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_price(id)
    }

    pub fn get_price(&self, id: i64) -> Result<Price> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {PRICE_COLUMNS} FROM prices p
                     LEFT JOIN ingredients i ON i.id = p.ingredient_id
                     WHERE p.id = ?1"
                ),
                params![id],
                Self::price_from_row,
            )
            .with_context(|| format!("Price {id} not found"))
    }

    pub fn list_prices(&self, filter: &PriceFilter) -> Result<Vec<Price>> {
        let mut sql = format!(
            "SELECT {PRICE_COLUMNS} FROM prices p
             LEFT JOIN ingredients i ON i.id = p.ingredient_id
             WHERE 1 = 1"
        );
        let mut values: Vec<Value> = Vec::new();
        if let Some(ingredient_id) = filter.ingredient_id {
            sql.push_str(" AND p.ingredient_id = ?");
            values.push(Value::Integer(ingredient_id));
        }
        if let Some(date) = filter.date {
            sql.push_str(" AND p.date = ?");
            values.push(Value::Text(date.format(DATE_FORMAT).to_string()));
        }
        let dir = filter.sort_direction.sql();
        write!(sql, " ORDER BY {} {dir}, p.id {dir}", filter.sort_column.sql())?;

        let mut stmt = self.conn.prepare(&sql)?;
        let prices = stmt
            .query_map(params_from_iter(values), Self::price_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }

    /// Most recent price by date; same-day entries resolve to the last one recorded.
    pub fn latest_price(&self, ingredient_id: i64) -> Result<Option<Price>> {
        let price = self
            .conn
            .query_row(
                &format!(
                    "SELECT {PRICE_COLUMNS} FROM prices p
                     LEFT JOIN ingredients i ON i.id = p.ingredient_id
                     WHERE p.ingredient_id = ?1
                     ORDER BY p.date DESC, p.id DESC LIMIT 1"
                ),
                params![ingredient_id],
                Self::price_from_row,
            )
            .optional()?;
        Ok(price)
    }

    // --- Recipes ---

    pub fn create_recipe(&self, name: &str) -> Result<Recipe> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Recipe name cannot be empty");
        }
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO recipes (name, created_at, updated_at) VALUES (?1, ?2, ?3)",
            params![name, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(Recipe {
            id,
            name: name.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn get_recipe(&self, id: i64) -> Result<Recipe> {
        self.conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM recipes WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Recipe {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .with_context(|| format!("Recipe {id} not found"))
    }

    pub fn add_recipe_ingredient(
        &self,
        recipe_id: i64,
        line: &NewRecipeIngredient,
    ) -> Result<RecipeIngredient> {
        self.get_recipe(recipe_id)?;
        let ingredient = self.get_ingredient(line.ingredient_id)?;
        let quantity = validate_quantity_text(&line.quantity)?;
        let unit = line.unit.trim().to_string();

        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, quantity, unit, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![recipe_id, ingredient.id, quantity, unit, now, now],
        )?;
        let id = self.conn.last_insert_rowid();

        let mut added = RecipeIngredient {
            id,
            recipe_id,
            ingredient_id: ingredient.id,
            quantity,
            unit,
            ingredient_name: Some(ingredient.name),
            ingredient_type: Some(ingredient.kind),
            latest_price: None,
            calculated_cost: None,
        };
        self.attach_cost(&mut added)?;
        Ok(added)
    }

    pub fn remove_recipe_ingredient(&self, recipe_id: i64, ingredient_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM recipe_ingredients WHERE recipe_id = ?1 AND ingredient_id = ?2",
            params![recipe_id, ingredient_id],
        )?;
        Ok(rows > 0)
    }

    /// Price a recipe line from its ingredient's latest price. Lines that cannot be
    /// priced keep `calculated_cost` empty.
    fn attach_cost(&self, line: &mut RecipeIngredient) -> Result<()> {
        let Some(price) = self.latest_price(line.ingredient_id)? else {
            return Ok(());
        };
        match compute_cost(
            price.price,
            price.quantity,
            &price.unit,
            &line.quantity,
            &line.unit,
        ) {
            Ok(cost) if cost.is_finite() => line.calculated_cost = Some(cost),
            Ok(cost) => debug!("Skipping cost for recipe line {}: got {cost}", line.id),
            Err(e) => debug!("Skipping cost for recipe line {}: {e}", line.id),
        }
        line.latest_price = Some(price);
        Ok(())
    }

    pub fn get_recipe_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
        let mut stmt = self.conn.prepare(
            "SELECT ri.id, ri.recipe_id, ri.ingredient_id, ri.quantity, ri.unit, i.name, i.type
             FROM recipe_ingredients ri
             LEFT JOIN ingredients i ON ri.ingredient_id = i.id
             WHERE ri.recipe_id = ?1
             ORDER BY ri.id",
        )?;
        let mut lines = stmt
            .query_map(params![recipe_id], Self::recipe_ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for line in &mut lines {
            self.attach_cost(line)?;
        }
        Ok(lines)
    }

    pub fn get_recipe_detail(&self, recipe_id: i64) -> Result<RecipeDetail> {
        let recipe = self.get_recipe(recipe_id)?;
        let ingredients = self.get_recipe_ingredients(recipe_id)?;
        let total_cost = ingredients
            .iter()
            .filter_map(|i| i.calculated_cost)
            .filter(|cost| cost.is_finite())
            .sum();

        Ok(RecipeDetail {
            id: recipe.id,
            name: recipe.name,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
            ingredients,
            total_cost,
        })
    }

    /// All recipes, or only those using `ingredient_id`.
    pub fn list_recipes(&self, ingredient_id: Option<i64>) -> Result<Vec<RecipeDetail>> {
        let ids: Vec<i64> = match ingredient_id {
            Some(ingredient_id) => {
                let mut stmt = self.conn.prepare(
                    "SELECT DISTINCT r.id FROM recipes r
                     JOIN recipe_ingredients ri ON ri.recipe_id = r.id
                     WHERE ri.ingredient_id = ?1
                     ORDER BY r.id",
                )?;
                let ids = stmt
                    .query_map(params![ingredient_id], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                ids
            }
            None => {
                let mut stmt = self.conn.prepare("SELECT id FROM recipes ORDER BY id")?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                ids
            }
        };

        let mut details = Vec::new();
        for id in ids {
            details.push(self.get_recipe_detail(id)?);
        }
        Ok(details)
    }

    pub fn delete_recipe(&self, recipe_id: i64) -> Result<()> {
        self.get_recipe(recipe_id)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM cooking_session_ingredients WHERE cooking_session_id IN (
                SELECT id FROM cooking_sessions WHERE recipe_id = ?1
            )",
            params![recipe_id],
        )?;
        tx.execute(
            "DELETE FROM cooking_sessions WHERE recipe_id = ?1",
            params![recipe_id],
        )?;
        tx.execute(
            "DELETE FROM recipe_ingredients WHERE recipe_id = ?1",
            params![recipe_id],
        )?;
        tx.execute(
            "DELETE FROM product_options WHERE recipe_id = ?1",
            params![recipe_id],
        )?;
        tx.execute("DELETE FROM recipes WHERE id = ?1", params![recipe_id])?;
        tx.commit()?;
        Ok(())
    }

    // --- Cooking sessions ---

    pub fn create_cooking_session(&self, session: &NewCookingSession) -> Result<CookingSession> {
        self.get_recipe(session.recipe_id)?;
        let yield_amount = session.yield_amount.trim();
        if yield_amount.is_empty() {
            bail!("Yield cannot be empty");
        }

        let date = session.date.unwrap_or_else(|| Local::now().date_naive());
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO cooking_sessions (recipe_id, date, yield_amount, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.recipe_id,
                date.format(DATE_FORMAT).to_string(),
                yield_amount,
                now,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_cooking_session(id)
    }

    /// Record an ingredient consumed by a session. Without an explicit price the
    /// cost is derived from the ingredient's latest price.
    pub fn add_session_ingredient(
        &self,
        session_id: i64,
        line: &NewSessionIngredient,
    ) -> Result<CookingSessionIngredient> {
        self.get_cooking_session(session_id)?;
        let ingredient = self.get_ingredient(line.ingredient_id)?;
        let quantity = validate_quantity_text(&line.quantity)?;
        let unit = line.unit.trim().to_string();

        let price = match line.price {
            Some(price) => {
                if !price.is_finite() || price < 0.0 {
                    bail!("Price must be a non-negative number");
                }
                price
            }
            None => {
                let latest = self.latest_price(ingredient.id)?.with_context(|| {
                    format!(
                        "No price recorded for '{}'; pass one explicitly",
                        ingredient.name
                    )
                })?;
                let cost =
                    compute_cost(latest.price, latest.quantity, &latest.unit, &quantity, &unit)
                        .with_context(|| {
                            format!("Cannot cost {quantity} {unit} of '{}'", ingredient.name)
                        })?;
                if !cost.is_finite() {
                    bail!(
                        "Cost of {quantity} {unit} of '{}' is not a finite number",
                        ingredient.name
                    );
                }
                cost
            }
        };

        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO cooking_session_ingredients
                (cooking_session_id, ingredient_id, quantity, price, unit, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![session_id, ingredient.id, quantity, price, unit, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(CookingSessionIngredient {
            id,
            cooking_session_id: session_id,
            ingredient_id: ingredient.id,
            ingredient_name: Some(ingredient.name),
            quantity,
            price,
            unit,
        })
    }

    fn get_session_ingredients(&self, session_id: i64) -> Result<Vec<CookingSessionIngredient>> {
        let mut stmt = self.conn.prepare(
            "SELECT csi.id, csi.cooking_session_id, csi.ingredient_id, i.name,
                    csi.quantity, csi.price, csi.unit
             FROM cooking_session_ingredients csi
             LEFT JOIN ingredients i ON csi.ingredient_id = i.id
             WHERE csi.cooking_session_id = ?1
             ORDER BY csi.id",
        )?;
        let lines = stmt
            .query_map(params![session_id], Self::session_ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    pub fn get_cooking_session(&self, id: i64) -> Result<CookingSession> {
        let mut session = self
            .conn
            .query_row(
                "SELECT cs.id, cs.recipe_id, r.name, cs.date, cs.yield_amount, cs.created_at, cs.updated_at
                 FROM cooking_sessions cs
                 LEFT JOIN recipes r ON cs.recipe_id = r.id
                 WHERE cs.id = ?1",
                params![id],
                Self::cooking_session_from_row,
            )
            .with_context(|| format!("Cooking session {id} not found"))?;
        session.ingredients = self.get_session_ingredients(id)?;
        Ok(session)
    }

    /// Newest first.
    pub fn list_cooking_sessions(&self) -> Result<Vec<CookingSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT cs.id, cs.recipe_id, r.name, cs.date, cs.yield_amount, cs.created_at, cs.updated_at
             FROM cooking_sessions cs
             LEFT JOIN recipes r ON cs.recipe_id = r.id
             ORDER BY cs.date DESC, cs.id DESC",
        )?;
        let mut sessions = stmt
            .query_map([], Self::cooking_session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for session in &mut sessions {
            session.ingredients = self.get_session_ingredients(session.id)?;
        }
        Ok(sessions)
    }

    // --- Clients ---

    pub fn create_client(&self, client: &NewClient) -> Result<Client> {
        let client = client.normalized()?;
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO clients (name, surname, telegram, instagram, phone, address, source, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                client.name,
                client.surname,
                client.telegram,
                client.instagram,
                client.phone,
                client.address,
                client.source,
                now,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_client(id)
    }

    pub fn get_client(&self, id: i64) -> Result<Client> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1 AND deleted_at IS NULL"
                ),
                params![id],
                Self::client_from_row,
            )
            .with_context(|| format!("Client {id} not found"))
    }

    pub fn list_clients(&self) -> Result<Vec<Client>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE deleted_at IS NULL ORDER BY surname, name, id"
        ))?;
        let clients = stmt
            .query_map([], Self::client_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(clients)
    }

    /// Replace every field of a client.
    pub fn update_client(&self, id: i64, client: &NewClient) -> Result<Client> {
        self.get_client(id)?;
        let client = client.normalized()?;
        self.conn.execute(
            "UPDATE clients SET name = ?1, surname = ?2, telegram = ?3, instagram = ?4,
                    phone = ?5, address = ?6, source = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                client.name,
                client.surname,
                client.telegram,
                client.instagram,
                client.phone,
                client.address,
                client.source,
                Local::now().to_rfc3339(),
                id
            ],
        )?;
        self.get_client(id)
    }

    /// Soft delete. Existing orders keep pointing at the client.
    pub fn delete_client(&self, id: i64) -> Result<()> {
        self.get_client(id)?;
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "UPDATE clients SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        Ok(())
    }

    // --- Packages ---

    pub fn create_package(&self, name: &str) -> Result<Package> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Package name cannot be empty");
        }
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO packages (name, created_at, updated_at) VALUES (?1, ?2, ?3)",
            params![name, now, now],
        )?;
        Ok(Package {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn get_package(&self, id: i64) -> Result<Package> {
        self.conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM packages WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Package {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .with_context(|| format!("Package {id} not found"))
    }

    pub fn list_packages(&self) -> Result<Vec<Package>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at, updated_at FROM packages ORDER BY name, id")?;
        let packages = stmt
            .query_map([], |row| {
                Ok(Package {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(packages)
    }

    // --- Products ---

    /// Check the package and every recipe a product points at.
    fn check_product_links(&self, product: &NewProduct) -> Result<()> {
        validate_product(product)?;
        self.get_package(product.package_id)?;
        for recipe_id in &product.recipe_ids {
            self.get_recipe(*recipe_id)?;
        }
        Ok(())
    }

    fn insert_product_options(
        conn: &Connection,
        product_id: i64,
        recipe_ids: &[i64],
        now: &str,
    ) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT INTO product_options (product_id, recipe_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for recipe_id in recipe_ids {
            stmt.execute(params![product_id, recipe_id, now, now])?;
        }
        Ok(())
    }

    /// Insert a product and its recipe options together.
    pub fn create_product(&self, product: &NewProduct) -> Result<Product> {
        self.check_product_links(product)?;

        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO products (name, description, price, cost, image, package_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                product.name.trim(),
                product.description.trim(),
                product.price,
                product.cost,
                product.image.as_deref().unwrap_or_default().trim(),
                product.package_id,
                now,
                now
            ],
        )?;
        let id = tx.last_insert_rowid();
        Self::insert_product_options(&tx, id, &product.recipe_ids, &now)?;
        tx.commit()?;
        self.get_product(id)
    }

    fn product_recipe_ids(&self, product_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT recipe_id FROM product_options WHERE product_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![product_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn get_product(&self, id: i64) -> Result<Product> {
        let mut product = self
            .conn
            .query_row(
                &format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products p
                     LEFT JOIN packages pk ON pk.id = p.package_id
                     WHERE p.id = ?1 AND p.deleted_at IS NULL"
                ),
                params![id],
                Self::product_from_row,
            )
            .with_context(|| format!("Product {id} not found"))?;
        product.recipe_ids = self.product_recipe_ids(id)?;
        Ok(product)
    }

    pub fn list_products(&self) -> Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p
             LEFT JOIN packages pk ON pk.id = p.package_id
             WHERE p.deleted_at IS NULL
             ORDER BY p.name, p.id"
        ))?;
        let mut products = stmt
            .query_map([], Self::product_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for product in &mut products {
            product.recipe_ids = self.product_recipe_ids(product.id)?;
        }
        Ok(products)
    }

    /// Replace a product's fields and its recipe options.
    pub fn update_product(&self, id: i64, product: &NewProduct) -> Result<Product> {
        let existing = self.get_product(id)?;
        self.check_product_links(product)?;
        let image = product.image.as_deref().map_or(existing.image, |i| i.trim().to_string());

        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE products SET name = ?1, description = ?2, price = ?3, cost = ?4, image = ?5,
                    package_id = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                product.name.trim(),
                product.description.trim(),
                product.price,
                product.cost,
                image,
                product.package_id,
                now,
                id
            ],
        )?;
        tx.execute(
            "DELETE FROM product_options WHERE product_id = ?1",
            params![id],
        )?;
        Self::insert_product_options(&tx, id, &product.recipe_ids, &now)?;
        tx.commit()?;
        self.get_product(id)
    }

    /// Soft-delete a product and drop its recipe options.
    pub fn delete_product(&self, id: i64) -> Result<()> {
        self.get_product(id)?;
        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM product_options WHERE product_id = ?1",
            params![id],
        )?;
        tx.execute(
            "UPDATE products SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        tx.commit()?;
        Ok(())
    }

    // --- Orders ---

    /// Resolve every item against a live product, filling in the product cost
    /// where the item has none. Returns `(product_id, quantity, price, cost_price)`.
    fn resolve_order_items(&self, order: &NewOrder) -> Result<Vec<(i64, i64, f64, f64)>> {
        validate_order(order)?;
        self.get_client(order.client_id)?;
        order
            .items
            .iter()
            .map(|item| {
                let product = self.get_product(item.product_id)?;
                let cost_price = item.cost_price.unwrap_or(product.cost);
                Ok((product.id, item.quantity, item.price, cost_price))
            })
            .collect()
    }

    fn insert_order_items(
        conn: &Connection,
        order_id: i64,
        items: &[(i64, i64, f64, f64)],
        now: &str,
    ) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT INTO order_items (order_id, product_id, quantity, price, cost_price, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (product_id, quantity, price, cost_price) in items {
            stmt.execute(params![order_id, product_id, quantity, price, cost_price, now, now])?;
        }
        Ok(())
    }

    /// Insert an order and its items in one transaction. Status defaults to `new`.
    pub fn create_order(&self, order: &NewOrder) -> Result<Order> {
        let items = self.resolve_order_items(order)?;
        let status = order.status.unwrap_or_default();

        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO orders (client_id, status, comment, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![order.client_id, status.as_str(), order.comment.trim(), now, now],
        )?;
        let id = tx.last_insert_rowid();
        Self::insert_order_items(&tx, id, &items, &now)?;
        tx.commit()?;
        self.get_order(id)
    }

    fn get_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT oi.id, oi.order_id, oi.product_id, p.name, oi.quantity, oi.price, oi.cost_price
             FROM order_items oi
             LEFT JOIN products p ON p.id = oi.product_id
             WHERE oi.order_id = ?1
             ORDER BY oi.id",
        )?;
        let items = stmt
            .query_map(params![order_id], Self::order_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    #[allow(clippy::cast_precision_loss)]
    fn attach_items(&self, order: &mut Order) -> Result<()> {
        order.items = self.get_order_items(order.id)?;
        order.total = order
            .items
            .iter()
            .map(|i| i.price * i.quantity as f64)
            .sum();
        Ok(())
    }

    pub fn get_order(&self, id: i64) -> Result<Order> {
        let mut order = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ORDER_COLUMNS} FROM orders o
                     LEFT JOIN clients c ON c.id = o.client_id
                     WHERE o.id = ?1 AND o.deleted_at IS NULL"
                ),
                params![id],
                Self::order_from_row,
            )
            .with_context(|| format!("Order {id} not found"))?;
        self.attach_items(&mut order)?;
        Ok(order)
    }

    /// Newest first, optionally only one status.
    pub fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let mut sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o
             LEFT JOIN clients c ON c.id = o.client_id
             WHERE o.deleted_at IS NULL"
        );
        let mut values: Vec<Value> = Vec::new();
        if let Some(status) = status {
            sql.push_str(" AND o.status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY o.created_at DESC, o.id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut orders = stmt
            .query_map(params_from_iter(values), Self::order_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for order in &mut orders {
            self.attach_items(order)?;
        }
        Ok(orders)
    }

    /// Replace an order's client, comment and items. A `None` status keeps the current one.
    pub fn update_order(&self, id: i64, order: &NewOrder) -> Result<Order> {
        let existing = self.get_order(id)?;
        let items = self.resolve_order_items(order)?;
        let status = order.status.unwrap_or(existing.status);

        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE orders SET client_id = ?1, status = ?2, comment = ?3, updated_at = ?4
             WHERE id = ?5",
            params![order.client_id, status.as_str(), order.comment.trim(), now, id],
        )?;
        tx.execute("DELETE FROM order_items WHERE order_id = ?1", params![id])?;
        Self::insert_order_items(&tx, id, &items, &now)?;
        tx.commit()?;
        self.get_order(id)
    }

    pub fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<Order> {
        let rows = self.conn.execute(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND deleted_at IS NULL",
            params![status.as_str(), Local::now().to_rfc3339(), id],
        )?;
        if rows == 0 {
            bail!("Order {id} not found");
        }
        self.get_order(id)
    }

    /// Soft delete; items stay attached to the hidden order.
    pub fn delete_order(&self, id: i64) -> Result<()> {
        self.get_order(id)?;
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "UPDATE orders SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        Ok(())
    }

    // --- Dashboard ---

    /// The latest orders with their item totals.
    pub fn recent_orders(&self, limit: usize) -> Result<Vec<RecentOrder>> {
        let mut stmt = self.conn.prepare(
            "SELECT o.id, c.name, o.status, o.created_at,
                    COALESCE(SUM(oi.price * oi.quantity), 0)
             FROM orders o
             JOIN clients c ON c.id = o.client_id
             LEFT JOIN order_items oi ON oi.order_id = o.id
             WHERE o.deleted_at IS NULL
             GROUP BY o.id, c.name, o.status, o.created_at
             ORDER BY o.created_at DESC, o.id DESC
             LIMIT ?1",
        )?;
        let orders = stmt
            .query_map(params![i64::try_from(limit)?], |row| {
                Ok(RecentOrder {
                    id: row.get(0)?,
                    client_name: row.get(1)?,
                    status: Self::status_column(row, 2)?,
                    order_date: row.get(3)?,
                    total_amount: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    /// Live orders per status, in status order; statuses with no orders are left out.
    pub fn order_status_distribution(&self) -> Result<Vec<StatusCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM orders WHERE deleted_at IS NULL GROUP BY status",
        )?;
        let mut counts = stmt
            .query_map([], |row| {
                Ok(StatusCount {
                    status: Self::status_column(row, 0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        counts.sort_by_key(|c| c.status as u8);
        Ok(counts)
    }

    /// Revenue, cost and profit over finished orders.
    pub fn profit_summary(&self) -> Result<ProfitSummary> {
        let (total_revenue, total_costs, order_count): (f64, f64, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(oi.price * oi.quantity), 0),
                    COALESCE(SUM(oi.cost_price * oi.quantity), 0),
                    COUNT(DISTINCT o.id)
             FROM order_items oi
             JOIN orders o ON o.id = oi.order_id
             WHERE o.status = ?1 AND o.deleted_at IS NULL",
            params![OrderStatus::Finished.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(ProfitSummary {
            total_revenue,
            total_costs,
            total_profit: total_revenue - total_costs,
            order_count,
        })
    }

    // --- Maintenance ---

    pub fn count(&self, table: CountedTable) -> Result<i64> {
        let sql = match table {
            CountedTable::Ingredients => {
                "SELECT COUNT(*) FROM ingredients WHERE deleted_at IS NULL"
            }
            CountedTable::Recipes => "SELECT COUNT(*) FROM recipes",
            CountedTable::Prices => "SELECT COUNT(*) FROM prices",
            CountedTable::CookingSessions => "SELECT COUNT(*) FROM cooking_sessions",
            CountedTable::Products => "SELECT COUNT(*) FROM products WHERE deleted_at IS NULL",
            CountedTable::Orders => "SELECT COUNT(*) FROM orders WHERE deleted_at IS NULL",
            CountedTable::PendingOrders => {
                "SELECT COUNT(*) FROM orders
                 WHERE deleted_at IS NULL AND status NOT IN ('finished', 'canceled')"
            }
        };
        let count = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn has_unique_name_index(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
            params![UNIQUE_NAME_INDEX],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Make storage reject a second live ingredient with an existing name.
    /// Fails while duplicates remain.
    pub fn enforce_unique_names(&self) -> Result<()> {
        self.conn
            .execute_batch(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {UNIQUE_NAME_INDEX}
                 ON ingredients(name) WHERE deleted_at IS NULL;"
            ))
            .context("Duplicate ingredient names remain; merge them before enforcing uniqueness")
    }
}

// --- Consolidation store ---

fn id_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn parse_id_list(raw: &str) -> Result<Vec<i64>, StoreError> {
    raw.split(',')
        .map(|id| {
            id.trim()
                .parse::<i64>()
                .map_err(|_| StoreError::Malformed(format!("ingredient id list '{raw}'")))
        })
        .collect()
}

impl IngredientStore for Database {
    type Tx<'a> = SqliteTransaction<'a>;

    fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, COUNT(*), GROUP_CONCAT(id)
             FROM ingredients
             WHERE deleted_at IS NULL
             GROUP BY name
             HAVING COUNT(*) > 1
             ORDER BY COUNT(*) DESC, name",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(name, count, ids)| {
                let mut ids = parse_id_list(&ids)?;
                ids.sort_unstable();
                Ok(DuplicateGroup { name, count, ids })
            })
            .collect()
    }

    fn begin(&mut self) -> Result<SqliteTransaction<'_>, StoreError> {
        // Take the write lock up front so the busy timeout bounds the wait.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteTransaction { tx })
    }
}

/// Rolls back on drop unless committed.
pub struct SqliteTransaction<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl IngredientTransaction for SqliteTransaction<'_> {
    fn ingredients_by_name(&self, name: &str) -> Result<Vec<Ingredient>, StoreError> {
        let mut stmt = self.tx.prepare(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredients
             WHERE name = ?1 AND deleted_at IS NULL
             ORDER BY id"
        ))?;
        let ingredients = stmt
            .query_map(params![name], Database::ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ingredients)
    }

    fn reassign_references(
        &mut self,
        table: ReferenceTable,
        from: &[i64],
        to: i64,
    ) -> Result<usize, StoreError> {
        if from.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE {table} SET ingredient_id = ?, updated_at = ? WHERE ingredient_id IN ({})",
            id_placeholders(from.len())
        );
        let mut values = vec![
            Value::Integer(to),
            Value::Text(Local::now().to_rfc3339()),
        ];
        values.extend(from.iter().map(|id| Value::Integer(*id)));
        Ok(self.tx.execute(&sql, params_from_iter(values))?)
    }

    fn delete_ingredients(&mut self, ids: &[i64]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let now = Local::now().to_rfc3339();
        let sql = format!(
            "UPDATE ingredients SET deleted_at = ?, updated_at = ?
             WHERE deleted_at IS NULL AND id IN ({})",
            id_placeholders(ids.len())
        );
        let mut values = vec![Value::Text(now.clone()), Value::Text(now)];
        values.extend(ids.iter().map(|id| Value::Integer(*id)));
        Ok(self.tx.execute(&sql, params_from_iter(values))?)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback()?;
        Ok(())
    }
}
