//! Ingredient cost conversion.
//!
//! Purchase prices are recorded per bulk unit (a 2 kg sack, a 1 l bottle) while
//! recipes ask for small quantities in a finer unit. [`compute_cost`] bridges the
//! two for the mass and volume families it knows about and falls back to plain
//! per-unit pricing for everything else.

use thiserror::Error;

pub const KILOGRAM: &str = "kg";
pub const GRAM: &str = "g";
pub const LITER: &str = "l";
pub const MILLILITER: &str = "ml";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CostError {
    #[error("invalid recipe quantity '{0}'")]
    InvalidQuantity(String),
    #[error("purchase quantity must be greater than 0 (got {0})")]
    InvalidPurchaseQuantity(i64),
}

/// How many `needed_unit`s fit into one `purchased_unit`.
///
/// Only `kg -> g` and `l -> ml` scale; any other pair, including unknown units,
/// is priced one-to-one.
#[must_use]
pub fn scale_factor(purchased_unit: &str, needed_unit: &str) -> f64 {
    match (purchased_unit, needed_unit) {
        (KILOGRAM, GRAM) | (LITER, MILLILITER) => 1000.0,
        _ => 1.0,
    }
}

/// Parse a human-entered quantity. Only the first `,` is treated as a decimal
/// separator; no other locale handling is applied.
pub fn parse_quantity(raw: &str) -> Result<f64, CostError> {
    raw.replacen(',', ".", 1)
        .parse::<f64>()
        .map_err(|_| CostError::InvalidQuantity(raw.to_string()))
}

/// Cost of `needed_quantity` `needed_unit`s given a purchase of
/// `purchased_quantity` `purchased_unit`s for `unit_price`.
///
/// The result is not rounded.
#[allow(clippy::cast_precision_loss)]
pub fn compute_cost(
    unit_price: f64,
    purchased_quantity: i64,
    purchased_unit: &str,
    needed_quantity: &str,
    needed_unit: &str,
) -> Result<f64, CostError> {
    let needed = parse_quantity(needed_quantity)?;
    if purchased_quantity <= 0 {
        return Err(CostError::InvalidPurchaseQuantity(purchased_quantity));
    }

    let divisor = purchased_quantity as f64 * scale_factor(purchased_unit, needed_unit);
    Ok(unit_price / divisor * needed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_kilogram_to_gram() {
        let cost = compute_cost(100.0, 1, "kg", "500", "g").unwrap();
        assert!(close(cost, 50.0));
    }

    #[test]
    fn test_liter_to_milliliter() {
        let cost = compute_cost(10.0, 1, "l", "250", "ml").unwrap();
        assert!(close(cost, 2.5));
    }

    #[test]
    fn test_same_unit_gram() {
        let cost = compute_cost(5.0, 2, "g", "10", "g").unwrap();
        assert!(close(cost, 25.0));
    }

    #[test]
    fn test_same_unit_milliliter() {
        let cost = compute_cost(30.0, 300, "ml", "100", "ml").unwrap();
        assert!(close(cost, 10.0));
    }

    #[test]
    fn test_unknown_units_fall_back_to_per_unit() {
        let cost = compute_cost(9.0, 3, "piece", "2", "piece").unwrap();
        assert!(close(cost, 6.0));
    }

    #[test]
    fn test_mismatched_families_are_not_scaled() {
        // kg bought, ml needed: no conversion, priced per purchased unit
        let cost = compute_cost(100.0, 2, "kg", "3", "ml").unwrap();
        assert!(close(cost, 150.0));
        // gram bought, kilogram needed is not a known pair either
        let cost = compute_cost(4.0, 2, "g", "1", "kg").unwrap();
        assert!(close(cost, 2.0));
    }

    #[test]
    fn test_unit_codes_are_case_sensitive() {
        let cost = compute_cost(100.0, 1, "KG", "500", "g").unwrap();
        assert!(close(cost, 50_000.0));
    }

    #[test]
    fn test_comma_decimal_separator() {
        assert!(close(parse_quantity("1,5").unwrap(), 1.5));
        let cost = compute_cost(10.0, 1, "kg", "1,5", "g").unwrap();
        assert!(close(cost, 0.015));
    }

    #[test]
    fn test_only_first_comma_is_replaced() {
        assert_eq!(
            parse_quantity("1,000,5"),
            Err(CostError::InvalidQuantity("1,000,5".to_string()))
        );
    }

    #[test]
    fn test_invalid_quantity() {
        let err = compute_cost(10.0, 1, "kg", "a pinch", "g").unwrap_err();
        assert_eq!(err, CostError::InvalidQuantity("a pinch".to_string()));
        assert!(compute_cost(10.0, 1, "kg", "", "g").is_err());
        assert!(compute_cost(10.0, 1, "kg", " 5", "g").is_err());
    }

    #[test]
    fn test_zero_purchase_quantity_is_rejected() {
        let err = compute_cost(10.0, 0, "kg", "5", "g").unwrap_err();
        assert_eq!(err, CostError::InvalidPurchaseQuantity(0));
        assert!(compute_cost(10.0, -2, "g", "5", "g").is_err());
    }

    #[test]
    fn test_deterministic() {
        let a = compute_cost(12.34, 3, "l", "333,3", "ml").unwrap();
        let b = compute_cost(12.34, 3, "l", "333,3", "ml").unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
        assert!(close(a, 12.34 / 3000.0 * 333.3));
    }

    #[test]
    fn test_scale_factor_table() {
        assert!(close(scale_factor("kg", "g"), 1000.0));
        assert!(close(scale_factor("l", "ml"), 1000.0));
        assert!(close(scale_factor("g", "g"), 1.0));
        assert!(close(scale_factor("ml", "ml"), 1.0));
        assert!(close(scale_factor("g", "kg"), 1.0));
    }
}
