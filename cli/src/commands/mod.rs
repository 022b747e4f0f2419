mod client;
mod dashboard;
mod duplicates;
mod helpers;
mod ingredient;
mod order;
mod package;
mod price;
mod product;
mod recipe;
mod session;

pub(crate) use client::{
    cmd_client_add, cmd_client_delete, cmd_client_list, cmd_client_show, cmd_client_update,
};
pub(crate) use dashboard::cmd_dashboard;
pub(crate) use duplicates::{cmd_duplicates_check, cmd_duplicates_merge};
pub(crate) use ingredient::{cmd_ingredient_add, cmd_ingredient_check, cmd_ingredient_list};
pub(crate) use order::{
    OrderArgs, cmd_order_create, cmd_order_delete, cmd_order_list, cmd_order_show,
    cmd_order_status, cmd_order_update,
};
pub(crate) use package::{cmd_package_add, cmd_package_list};
pub(crate) use price::{PriceArgs, cmd_price_add, cmd_price_list};
pub(crate) use product::{
    cmd_product_add, cmd_product_delete, cmd_product_list, cmd_product_show, cmd_product_update,
};
pub(crate) use recipe::{
    cmd_recipe_add_ingredient, cmd_recipe_create, cmd_recipe_delete, cmd_recipe_list,
    cmd_recipe_remove_ingredient, cmd_recipe_show,
};
pub(crate) use session::{cmd_session_add_ingredient, cmd_session_create, cmd_session_list};
