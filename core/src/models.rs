use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cost::parse_quantity;

// --- Ingredients ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deleted_at: Option<String>,
}

impl Ingredient {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewIngredient {
    pub name: String,
    pub kind: String,
}

impl NewIngredient {
    /// Trim both fields and reject blanks.
    pub fn normalized(&self) -> Result<Self> {
        let name = self.name.trim();
        let kind = self.kind.trim();
        if name.is_empty() {
            bail!("Name cannot be empty");
        }
        if kind.is_empty() {
            bail!("Type cannot be empty");
        }
        Ok(Self {
            name: name.to_string(),
            kind: kind.to_string(),
        })
    }
}

// --- Prices ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Price {
    pub id: i64,
    pub ingredient_id: i64,
    pub price: f64,
    pub quantity: i64,
    pub unit: String,
    pub date: NaiveDate,
    pub created_at: String,
    pub updated_at: String,
    // Joined fields for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPrice {
    pub ingredient_id: i64,
    pub price: f64,
    pub quantity: i64,
    pub unit: String,
    /// Defaults to today when absent.
    pub date: Option<NaiveDate>,
}

pub fn validate_price(price: &NewPrice) -> Result<()> {
    if !price.price.is_finite() || price.price < 0.0 {
        bail!("Price must be a non-negative number");
    }
    if price.quantity < 1 {
        bail!("Quantity must be at least 1 (got {})", price.quantity);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceSortColumn {
    Price,
    Quantity,
    #[default]
    Date,
    IngredientName,
    IngredientType,
    Unit,
}

impl PriceSortColumn {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "price" => Ok(Self::Price),
            "quantity" => Ok(Self::Quantity),
            "date" => Ok(Self::Date),
            "ingredient_name" => Ok(Self::IngredientName),
            "ingredient_type" => Ok(Self::IngredientType),
            "unit" => Ok(Self::Unit),
            _ => bail!(
                "Invalid sort column '{s}'. Must be one of: price, quantity, date, ingredient_name, ingredient_type, unit"
            ),
        }
    }

    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Self::Price => "p.price",
            Self::Quantity => "p.quantity",
            Self::Date => "p.date",
            Self::IngredientName => "i.name",
            Self::IngredientType => "i.type",
            Self::Unit => "p.unit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => bail!("Invalid sort direction '{s}'. Must be asc or desc"),
        }
    }

    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PriceFilter {
    pub ingredient_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub sort_column: PriceSortColumn,
    pub sort_direction: SortDirection,
}

// --- Recipes ---

#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredient {
    pub id: i64,
    pub recipe_id: i64,
    pub ingredient_id: i64,
    /// Free text as entered, may use `,` as the decimal separator.
    pub quantity: String,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_price: Option<Price>,
    /// Computed at read time, never stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_cost: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct NewRecipeIngredient {
    pub ingredient_id: i64,
    pub quantity: String,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    pub ingredients: Vec<RecipeIngredient>,
    /// Sum of the lines that could be costed.
    pub total_cost: f64,
}

/// Quantities are stored as typed. Free text such as "a pinch" is kept (it just
/// can't be costed), but text that parses to NaN or infinity is refused.
pub fn validate_quantity_text(quantity: &str) -> Result<String> {
    let quantity = quantity.trim();
    if quantity.is_empty() {
        bail!("Quantity cannot be empty");
    }
    if parse_quantity(quantity).is_ok_and(|value| !value.is_finite()) {
        bail!("Quantity must be a finite number (got '{quantity}')");
    }
    Ok(quantity.to_string())
}

// --- Cooking sessions ---

#[derive(Debug, Clone, Serialize)]
pub struct CookingSession {
    pub id: i64,
    pub recipe_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_name: Option<String>,
    pub date: NaiveDate,
    #[serde(rename = "yield")]
    pub yield_amount: String,
    pub created_at: String,
    pub updated_at: String,
    pub ingredients: Vec<CookingSessionIngredient>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CookingSessionIngredient {
    pub id: i64,
    pub cooking_session_id: i64,
    pub ingredient_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient_name: Option<String>,
    pub quantity: String,
    pub price: f64,
    pub unit: String,
}

#[derive(Debug, Clone)]
pub struct NewCookingSession {
    pub recipe_id: i64,
    pub date: Option<NaiveDate>,
    pub yield_amount: String,
}

#[derive(Debug, Clone)]
pub struct NewSessionIngredient {
    pub ingredient_id: i64,
    pub quantity: String,
    pub unit: String,
    /// When absent the cost is derived from the ingredient's latest price.
    pub price: Option<f64>,
}

// --- Clients ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub telegram: String,
    pub instagram: String,
    pub phone: String,
    pub address: String,
    /// Where the client heard about the kitchen.
    pub source: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub surname: String,
    pub telegram: String,
    pub instagram: String,
    pub phone: String,
    pub address: String,
    pub source: String,
}

impl NewClient {
    /// Trim every field; name and surname are required.
    pub fn normalized(&self) -> Result<Self> {
        let client = Self {
            name: self.name.trim().to_string(),
            surname: self.surname.trim().to_string(),
            telegram: self.telegram.trim().to_string(),
            instagram: self.instagram.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            source: self.source.trim().to_string(),
        };
        if client.name.is_empty() {
            bail!("Client name cannot be empty");
        }
        if client.surname.is_empty() {
            bail!("Client surname cannot be empty");
        }
        Ok(client)
    }
}

// --- Packages and products ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Selling price.
    pub price: f64,
    /// What one unit costs to make; copied onto order items that don't set their own.
    pub cost: f64,
    pub image: String,
    pub package_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    /// Recipes this product can be made from.
    pub recipe_ids: Vec<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub cost: f64,
    /// On update, `None` keeps the current image.
    pub image: Option<String>,
    pub package_id: i64,
    pub recipe_ids: Vec<i64>,
}

pub fn validate_product(product: &NewProduct) -> Result<()> {
    if product.name.trim().is_empty() {
        bail!("Product name cannot be empty");
    }
    if !product.price.is_finite() || product.price < 0.0 {
        bail!("Price must be a non-negative number");
    }
    if !product.cost.is_finite() || product.cost < 0.0 {
        bail!("Cost must be a non-negative number");
    }
    Ok(())
}

// --- Orders ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    New,
    InProgress,
    Ready,
    Finished,
    Canceled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::New,
        OrderStatus::InProgress,
        OrderStatus::Ready,
        OrderStatus::Finished,
        OrderStatus::Canceled,
    ];

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "new" => Ok(Self::New),
            "in_progress" => Ok(Self::InProgress),
            "ready" => Ok(Self::Ready),
            "finished" => Ok(Self::Finished),
            "canceled" => Ok(Self::Canceled),
            _ => bail!(
                "Invalid order status '{s}'. Must be one of: new, in_progress, ready, finished, canceled"
            ),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Ready => "ready",
            Self::Finished => "finished",
            Self::Canceled => "canceled",
        }
    }

    /// Still waiting on the kitchen.
    #[must_use]
    pub fn is_pending(self) -> bool {
        !matches!(self, Self::Finished | Self::Canceled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub quantity: i64,
    /// Unit selling price.
    pub price: f64,
    /// Unit cost at the time of the order.
    pub cost_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: i64,
    pub client_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    pub status: OrderStatus,
    pub comment: String,
    pub created_at: String,
    pub updated_at: String,
    pub items: Vec<OrderItem>,
    /// Sum of `price * quantity` over the items.
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
    pub price: f64,
    /// Falls back to the product's cost.
    pub cost_price: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub client_id: i64,
    /// Defaults to `new` on create; on update `None` keeps the current status.
    pub status: Option<OrderStatus>,
    pub comment: String,
    pub items: Vec<NewOrderItem>,
}

pub fn validate_order(order: &NewOrder) -> Result<()> {
    if order.items.is_empty() {
        bail!("An order needs at least one item");
    }
    for (i, item) in order.items.iter().enumerate() {
        if item.quantity < 1 {
            bail!("items[{i}].quantity must be greater than 0");
        }
        if !item.price.is_finite() || item.price < 0.0 {
            bail!("items[{i}].price must be a non-negative number");
        }
        if item
            .cost_price
            .is_some_and(|cost| !cost.is_finite() || cost < 0.0)
        {
            bail!("items[{i}].cost_price must be a non-negative number");
        }
    }
    Ok(())
}

// --- Duplicate maintenance ---

/// Live ingredients sharing one exact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub name: String,
    pub count: i64,
    /// Ascending.
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateGroup>,
}

impl DuplicateReport {
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedGroup {
    pub name: String,
    pub master_id: i64,
    pub merged_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsolidationReport {
    pub groups: Vec<MergedGroup>,
}

impl ConsolidationReport {
    #[must_use]
    pub fn merged_count(&self) -> usize {
        self.groups.iter().map(|g| g.merged_ids.len()).sum()
    }
}

// --- Dashboard ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountedTable {
    Ingredients,
    Recipes,
    Prices,
    CookingSessions,
    Products,
    Orders,
    /// Orders neither finished nor canceled.
    PendingOrders,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentOrder {
    pub id: i64,
    pub client_name: String,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub order_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Revenue and cost over finished orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfitSummary {
    pub total_revenue: f64,
    pub total_costs: f64,
    pub total_profit: f64,
    pub order_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_recipes: i64,
    pub total_products: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub recent_orders: Vec<RecentOrder>,
    pub order_status_distribution: Vec<StatusCount>,
    pub profit: ProfitSummary,
    pub ingredients: i64,
    pub prices: i64,
    pub cooking_sessions: i64,
    pub duplicate_groups: i64,
}
