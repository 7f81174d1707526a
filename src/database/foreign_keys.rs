//! Foreign-key resolution for create/update payloads.
//!
//! Clients refer to related records the same way they do in URLs: by numeric
//! id, uuid or alias. Relation columns store the internal numeric id, so every
//! non-numeric reference is looked up in the related table before the write.
//!
//! ```json
//! { "title": "Hello", "author": "ada" }        // relation name + alias
//! { "title": "Hello", "author_id": "550e..." } // foreign key + uuid
//! { "title": "Hello", "author_id": 7 }         // passes through
//! ```
//!
//! all become `{ "title": "Hello", "author_id": <id> }`.

use sea_orm::{
    ConnectionTrait, DatabaseConnection, JsonValue,
    sea_query::{Alias, Expr, Query},
};

use super::identifiers::Identifier;
use super::records::{Record, fetch_one};
use crate::core::{ModelDef, ModelRegistry, Relation};
use crate::errors::ApiError;

/// Look up the primary key of the `target` row referenced by `identifier`.
///
/// # Errors
/// Returns 400 when the identifier kind is unsupported by `target`,
/// `ApiError::Database` on query failure.
pub async fn lookup_id(
    db: &DatabaseConnection,
    target: &ModelDef,
    identifier: &Identifier,
) -> Result<Option<JsonValue>, ApiError> {
    let (column, value) = identifier.lookup(target, db.get_database_backend())?;
    lookup_by_column(db, target, &column, value).await
}

async fn lookup_by_column(
    db: &DatabaseConnection,
    target: &ModelDef,
    column: &str,
    value: sea_orm::Value,
) -> Result<Option<JsonValue>, ApiError> {
    let table = Alias::new(&target.table);
    let select = Query::select()
        .column((table.clone(), Alias::new(&target.primary_key)))
        .from(table.clone())
        .and_where(Expr::col((table, Alias::new(column))).eq(value))
        .limit(1)
        .to_owned();
    let row = fetch_one(db, &select).await?;
    Ok(row.and_then(|mut row| row.remove(&target.primary_key)))
}

fn unknown_reference(relation: &Relation, raw: &JsonValue) -> String {
    match raw {
        JsonValue::String(s) => format!("{} '{s}' does not exist", relation.name),
        other => format!("{} '{other}' does not exist", relation.name),
    }
}

/// Replace alias/uuid references in `payload` with numeric foreign keys.
///
/// Collects every unresolvable reference before failing so clients see all
/// of them at once.
///
/// # Errors
/// Returns 422 listing unresolvable references, 400 for references that are
/// neither scalar nor null.
pub async fn resolve_foreign_keys(
    db: &DatabaseConnection,
    registry: &ModelRegistry,
    model: &ModelDef,
    payload: &mut Record,
) -> Result<(), ApiError> {
    let mut missing = Vec::new();

    for relation in &model.relations {
        // The relation name only carries a reference when it is not itself a column
        let by_name = if model.has_column(&relation.name) {
            None
        } else {
            payload.remove(&relation.name)
        };
        // Numeric foreign keys pass through untouched
        let raw = match by_name {
            Some(raw) => raw,
            None => match payload.get(&relation.foreign_key) {
                Some(JsonValue::String(s)) if s.trim().parse::<i64>().is_err() => {
                    JsonValue::String(s.clone())
                }
                _ => continue,
            },
        };

        if raw.is_null() {
            payload.insert(relation.foreign_key.clone(), JsonValue::Null);
            continue;
        }

        let identifier = Identifier::from_json(&raw).ok_or_else(|| {
            ApiError::bad_request(format!(
                "{} must be an id, uuid or alias",
                relation.name
            ))
        })?;
        let target = registry.get(&relation.model).map_err(|e| {
            ApiError::internal("Relation target is not registered", Some(e.to_string()))
        })?;

        match lookup_id(db, &target, &identifier).await? {
            Some(id) => {
                tracing::debug!(
                    relation = %relation.name,
                    reference = %identifier,
                    "resolved foreign key"
                );
                payload.insert(relation.foreign_key.clone(), id);
            }
            None => missing.push(unknown_reference(relation, &raw)),
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_failed(missing))
    }
}
