use sea_orm::sea_query::Order;

use crate::core::Params;

const DEFAULT_SORT_ORDER: &str = "ASC";

/// Resolved ordering for a list query
#[derive(Debug, Clone, PartialEq)]
pub struct SortConfig {
    pub column: String,
    pub direction: Order,
}

/// Parse sort column and order from JSON array format
fn parse_json_sort(json: &str) -> Option<(String, Option<String>)> {
    let sort_vec: Vec<String> = serde_json::from_str(json).ok()?;
    let column = sort_vec.first()?.clone();
    Some((column, sort_vec.get(1).cloned()))
}

/// Convert sort order string to Order enum
fn parse_order(sort_order: &str) -> Order {
    if sort_order.eq_ignore_ascii_case("DESC") {
        Order::Desc
    } else {
        Order::Asc
    }
}

/// Parse sorting from the merged params.
///
/// Accepted forms:
/// - `sort=title&order=DESC`
/// - `sort=-title` (descending)
/// - `sort=["title","DESC"]`
///
/// Columns not in `sortable` fall back to `default_column`.
#[must_use]
pub fn parse_sorting(params: &Params, sortable: &[&str], default_column: &str) -> SortConfig {
    let explicit_order = params.get("order").map(String::as_str);

    let (column, order) = match params.get("sort").map(|s| s.trim()) {
        Some(sort) if sort.starts_with('[') => match parse_json_sort(sort) {
            Some((column, order)) => (column, order.or_else(|| explicit_order.map(str::to_string))),
            None => (default_column.to_string(), None),
        },
        Some(sort) if sort.starts_with('-') => (sort[1..].to_string(), Some("DESC".to_string())),
        Some(sort) if !sort.is_empty() => (sort.to_string(), explicit_order.map(str::to_string)),
        _ => (default_column.to_string(), explicit_order.map(str::to_string)),
    };

    let column = if sortable.contains(&column.as_str()) {
        column
    } else {
        tracing::debug!(column = %column, "ignoring unsortable column");
        default_column.to_string()
    };

    SortConfig {
        column,
        direction: parse_order(order.as_deref().unwrap_or(DEFAULT_SORT_ORDER)),
    }
}
