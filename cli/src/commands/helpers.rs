use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use cookhouse_core::models::NewOrderItem;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Like [`parse_date`] but keeps an absent date absent.
pub(crate) fn parse_optional_date(date_str: Option<String>) -> Result<Option<NaiveDate>> {
    date_str.map(|s| parse_date(Some(s))).transpose()
}

/// Parse an order line written as `PRODUCT_ID:QTY:PRICE[:COST]`.
pub(crate) fn parse_order_item(raw: &str) -> Result<NewOrderItem> {
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    let (product_id, quantity, price, cost) = match parts.as_slice() {
        [product_id, quantity, price] => (product_id, quantity, price, None),
        [product_id, quantity, price, cost] => (product_id, quantity, price, Some(cost)),
        _ => bail!("Invalid item '{raw}'. Use PRODUCT_ID:QTY:PRICE or PRODUCT_ID:QTY:PRICE:COST"),
    };
    Ok(NewOrderItem {
        product_id: product_id
            .parse()
            .with_context(|| format!("Invalid product id in item '{raw}'"))?,
        quantity: quantity
            .parse()
            .with_context(|| format!("Invalid quantity in item '{raw}'"))?,
        price: price
            .parse()
            .with_context(|| format!("Invalid price in item '{raw}'"))?,
        cost_price: cost
            .map(|c| c.parse::<f64>())
            .transpose()
            .with_context(|| format!("Invalid cost in item '{raw}'"))?,
    })
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn format_cost(cost: Option<f64>) -> String {
    cost.map_or_else(|| "-".to_string(), |c| format!("{:.2}", no_neg_zero(c)))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_parse_optional_date() {
        assert_eq!(parse_optional_date(None).unwrap(), None);
        assert_eq!(
            parse_optional_date(Some("2024-02-29".to_string())).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert!(parse_optional_date(Some("2023-02-29".to_string())).is_err());
    }

    #[test]
    fn test_parse_order_item() {
        assert_eq!(
            parse_order_item("3:2:12.5").unwrap(),
            NewOrderItem {
                product_id: 3,
                quantity: 2,
                price: 12.5,
                cost_price: None,
            }
        );
        assert_eq!(parse_order_item(" 3 : 1 : 10 : 4 ").unwrap().cost_price, Some(4.0));
        assert!(parse_order_item("3:2").is_err());
        assert!(parse_order_item("3:two:12").is_err());
        assert!(parse_order_item("3:2:12:4:1").is_err());
        assert!(parse_order_item("x:2:12").is_err());
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(Some(50.0)), "50.00");
        assert_eq!(format_cost(Some(-0.0)), "0.00");
        assert_eq!(format_cost(None), "-");
    }

    #[test]
    fn test_json_error() {
        let out = json_error("Recipe 3 not found");
        assert_eq!(out, r#"{"error":"Recipe 3 not found"}"#);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("Müsli", 10), "Müsli");
    }

    #[test]
    fn test_no_neg_zero() {
        assert_eq!(no_neg_zero(-0.0).to_bits(), 0.0_f64.to_bits());
        assert_eq!(no_neg_zero(-3.0), -3.0);
    }
}
