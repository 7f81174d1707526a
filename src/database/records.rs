use sea_orm::{
    ConnectionTrait, DatabaseConnection, FromQueryResult, JsonValue,
    sea_query::{Alias, Expr, Func, SelectStatement},
};

use crate::errors::ApiError;

/// A row as a JSON object, keyed by column name
pub type Record = serde_json::Map<String, JsonValue>;

const COUNT_ALIAS: &str = "total";

fn into_record(value: JsonValue) -> Result<Record, ApiError> {
    match value {
        JsonValue::Object(map) => Ok(map),
        other => Err(ApiError::internal(
            "Unexpected row shape",
            Some(format!("expected object, got {other}")),
        )),
    }
}

/// Run a SELECT and return every row
///
/// # Errors
/// Returns `ApiError::Database` when the query fails.
pub async fn fetch_all(db: &DatabaseConnection, select: &SelectStatement) -> Result<Vec<Record>, ApiError> {
    let statement = db.get_database_backend().build(select);
    tracing::debug!(sql = %statement, "fetch_all");
    JsonValue::find_by_statement(statement)
        .all(db)
        .await
        .map_err(ApiError::database)?
        .into_iter()
        .map(into_record)
        .collect()
}

/// Run a SELECT and return the first row, if any
///
/// # Errors
/// Returns `ApiError::Database` when the query fails.
pub async fn fetch_one(db: &DatabaseConnection, select: &SelectStatement) -> Result<Option<Record>, ApiError> {
    let statement = db.get_database_backend().build(select);
    tracing::debug!(sql = %statement, "fetch_one");
    JsonValue::find_by_statement(statement)
        .one(db)
        .await
        .map_err(ApiError::database)?
        .map(into_record)
        .transpose()
}

/// Count the rows a SELECT would return, ignoring its projection, order and
/// pagination. `count_column` should be the table-qualified primary key.
///
/// # Errors
/// Returns `ApiError::Database` when the query fails.
pub async fn count(
    db: &DatabaseConnection,
    select: &SelectStatement,
    table: &str,
    count_column: &str,
) -> Result<u64, ApiError> {
    let mut counter = select.clone();
    counter
        .clear_selects()
        .clear_order_by()
        .reset_limit()
        .reset_offset()
        .expr_as(
            Func::count(Expr::col((Alias::new(table), Alias::new(count_column)))),
            Alias::new(COUNT_ALIAS),
        );
    let statement = db.get_database_backend().build(&counter);
    tracing::debug!(sql = %statement, "count");
    let row = db.query_one(statement).await.map_err(ApiError::database)?;
    let total = match row {
        Some(row) => row
            .try_get::<i64>("", COUNT_ALIAS)
            .map_err(ApiError::database)?,
        None => 0,
    };
    Ok(u64::try_from(total).unwrap_or(0))
}
