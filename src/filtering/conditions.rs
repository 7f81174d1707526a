use sea_orm::{
    Condition, DatabaseBackend,
    sea_query::{Alias, Expr, SimpleExpr},
};

use super::search::build_like_condition;
use crate::core::Params;
use crate::database::param_to_value;
use crate::errors::ApiError;

// Basic safety limits
const MAX_FIELD_VALUE_LENGTH: usize = 10_000;
const MAX_IN_VALUES: usize = 100;

/// Parameters with a fixed meaning that are never treated as column filters
pub const RESERVED_PARAMS: &[&str] = &[
    "page", "limit", "per_page", "offset", "sort", "order", "q", "include",
];

/// Comparison operators selected by a key suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl FilterOperator {
    const SUFFIXES: [(&'static str, Self); 6] = [
        ("_gte", Self::Gte),
        ("_lte", Self::Lte),
        ("_gt", Self::Gt),
        ("_lt", Self::Lt),
        ("_neq", Self::Neq),
        ("_like", Self::Like),
    ];

    /// Split `priority_gte` into (`priority`, `Gte`). Keys naming a real column
    /// are taken verbatim, so a column called `last_like` still filters by
    /// equality.
    #[must_use]
    pub fn split<'a>(key: &'a str, columns: &[&str]) -> (&'a str, Self) {
        if columns.contains(&key) {
            return (key, Self::Eq);
        }
        for (suffix, op) in Self::SUFFIXES {
            if let Some(base) = key.strip_suffix(suffix) {
                return (base, op);
            }
        }
        (key, Self::Eq)
    }
}

fn build_expr(
    table: &str,
    column: &str,
    op: FilterOperator,
    raw: &str,
    backend: DatabaseBackend,
) -> Result<Option<SimpleExpr>, ApiError> {
    if raw.len() > MAX_FIELD_VALUE_LENGTH {
        tracing::debug!(column, "ignoring oversized filter value");
        return Ok(None);
    }
    let col = Expr::col((Alias::new(table), Alias::new(column)));
    let trimmed = raw.trim();

    let expr = match op {
        FilterOperator::Like => {
            (!trimmed.is_empty()).then(|| build_like_condition(table, column, trimmed))
        }
        FilterOperator::Eq if trimmed.eq_ignore_ascii_case("null") => Some(col.is_null()),
        FilterOperator::Neq if trimmed.eq_ignore_ascii_case("null") => Some(col.is_not_null()),
        FilterOperator::Eq if trimmed.contains(',') => {
            let values: Vec<_> = trimmed
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| param_to_value(v, backend))
                .collect();
            if values.len() > MAX_IN_VALUES {
                return Err(ApiError::bad_request(format!(
                    "'{column}' accepts at most {MAX_IN_VALUES} values, got {}",
                    values.len()
                )));
            }
            (!values.is_empty()).then(|| col.is_in(values))
        }
        FilterOperator::Eq => Some(col.eq(param_to_value(trimmed, backend))),
        FilterOperator::Neq => Some(col.ne(param_to_value(trimmed, backend))),
        FilterOperator::Gt => Some(col.gt(param_to_value(trimmed, backend))),
        FilterOperator::Gte => Some(col.gte(param_to_value(trimmed, backend))),
        FilterOperator::Lt => Some(col.lt(param_to_value(trimmed, backend))),
        FilterOperator::Lte => Some(col.lte(param_to_value(trimmed, backend))),
    };
    Ok(expr)
}

/// Translate column filters in `params` into a condition on `table`.
///
/// Keys in [`RESERVED_PARAMS`], keys in `skip` (scope params) and keys that
/// don't name a filterable column are ignored.
///
/// # Errors
/// Returns 400 for an `IN` list longer than the allowed number of values.
pub fn apply_filters(
    params: &Params,
    table: &str,
    filterable: &[&str],
    skip: &[&str],
    backend: DatabaseBackend,
) -> Result<Condition, ApiError> {
    let mut condition = Condition::all();

    for (key, raw) in params {
        if RESERVED_PARAMS.contains(&key.as_str()) || skip.contains(&key.as_str()) {
            continue;
        }
        let (column, op) = FilterOperator::split(key, filterable);
        if !filterable.contains(&column) {
            continue;
        }
        if let Some(expr) = build_expr(table, column, op, raw, backend)? {
            condition = condition.add(expr);
        }
    }

    Ok(condition)
}
