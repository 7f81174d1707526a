//! Relation-based scoping.
//!
//! A resource configured with `scope_models = ["authors"]` and a
//! `belongs_to("author", "authors", "author_id")` relation is narrowed whenever
//! the merged params carry an `author` value, typically from a nested route
//! such as `/authors/{author}/posts`:
//!
//! ```sql
//! SELECT posts.* FROM posts
//! INNER JOIN authors AS author ON author.id = posts.author_id
//! WHERE author.handle = 'ada'
//! ```
//!
//! The value may be the related record's id, uuid or alias.

use sea_orm::{
    DatabaseBackend,
    sea_query::{Alias, Expr, JoinType, SelectStatement, Value},
};
use std::sync::Arc;

use crate::core::{ModelDef, ModelRegistry, Options, Params};
use crate::database::Identifier;
use crate::errors::ApiError;

/// Relation-join filter built for one request
#[derive(Debug, Clone)]
pub struct FilterInclude {
    /// Related model the join targets
    pub model: Arc<ModelDef>,
    /// Join alias, equal to the relation name
    pub alias: String,
    /// Column on the scoped table holding the related id
    pub foreign_key: String,
    /// Identifier supplied by the client
    pub identifier: Identifier,
    /// Column of the related table the identifier is matched against
    pub column: String,
    pub value: Value,
}

impl FilterInclude {
    /// Add the join and its where-clause to `select` on `table`
    pub fn apply(&self, select: &mut SelectStatement, table: &str) {
        let alias = Alias::new(&self.alias);
        select
            .join_as(
                JoinType::InnerJoin,
                Alias::new(&self.model.table),
                alias.clone(),
                Expr::col((alias.clone(), Alias::new(&self.model.primary_key)))
                    .equals((Alias::new(table), Alias::new(&self.foreign_key))),
            )
            .cond_where(Expr::col((alias, Alias::new(&self.column))).eq(self.value.clone()));
    }
}

/// Param keys consumed by scoping, so they are not reused as column filters
#[must_use]
pub fn scope_param_keys<'a>(options: &Options, model: &'a ModelDef) -> Vec<&'a str> {
    options
        .scope_models
        .iter()
        .filter_map(|scope| model.scope_relation(scope))
        .map(|relation| relation.name.as_str())
        .collect()
}

/// Build a filter include for every configured scope present in `params`.
///
/// # Errors
/// Returns 400 when a scope value cannot be matched against the related model
/// (e.g. an alias for a model without an alias column), 500 when the
/// configuration references an unregistered model.
pub fn build_filter_includes(
    params: &Params,
    options: &Options,
    model: &ModelDef,
    registry: &ModelRegistry,
    backend: DatabaseBackend,
) -> Result<Vec<FilterInclude>, ApiError> {
    let mut includes = Vec::new();

    for scope in &options.scope_models {
        let Some(relation) = model.scope_relation(scope) else {
            continue;
        };
        let Some(raw) = params.get(&relation.name) else {
            continue;
        };

        let target = registry
            .get(&relation.model)
            .map_err(|e| ApiError::internal("Scope model is not registered", Some(e.to_string())))?;
        let identifier = Identifier::parse(raw);
        let (column, value) = identifier.lookup(&target, backend)?;

        tracing::debug!(
            model = %model.name,
            scope = %relation.name,
            column = %column,
            "scoping query"
        );
        includes.push(FilterInclude {
            model: target,
            alias: relation.name.clone(),
            foreign_key: relation.foreign_key.clone(),
            identifier,
            column,
            value,
        });
    }

    Ok(includes)
}
