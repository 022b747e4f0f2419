pub mod consolidate;
pub mod cost;
pub mod db;
#[cfg(test)]
pub mod memory_store;
pub mod models;
pub mod store;
