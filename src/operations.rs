//! # REST Query Handler
//!
//! [`RestQuery`] turns merged request parameters and JSON payloads into
//! sea-query statements against one configured model.
//!
//! Reads (`find`, `index`) return raw rows; the public actions (`show`,
//! `create`, `update`, `destroy`) also run [`RestQuery::render`], which loads
//! includes and hides fields outside `allowed_fields`. The controller uses the
//! raw rows for authorization and the rendered ones as response data.
//!
//! ```rust,ignore
//! let posts = RestQuery::new(db, registry, Options::new("posts").scope_models(["authors"]))?;
//!
//! // GET /authors/ada/posts?q=rust&page=2
//! let (rows, page) = posts.index(&params, "/authors/ada/posts", &query).await?;
//! ```

use sea_orm::{
    Condition, ConnectionTrait, DatabaseConnection, FromQueryResult, JsonValue,
    sea_query::{Alias, Expr, Query, SelectStatement},
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{ModelDef, ModelRegistry, Options, Params, Relation};
use crate::database::{
    Identifier, Record, count, fetch_all, fetch_one, json_to_expr, json_to_value, lookup_id,
    param_to_value, resolve_foreign_keys, value_key,
};
use crate::errors::{ApiError, ConfigError};
use crate::filtering::{
    PageInfo, apply_filters, build_filter_includes, build_search_condition, page_info,
    parse_pagination, parse_sorting, scope_param_keys,
};
use crate::validation::{check_integer_ranges, check_restricted_fields, retain_known_fields};

/// CRUD operations for one resource.
#[derive(Debug, Clone)]
pub struct RestQuery {
    db: DatabaseConnection,
    registry: Arc<ModelRegistry>,
    model: Arc<ModelDef>,
    options: Arc<Options>,
}

impl RestQuery {
    /// Validate `options` against `registry` and bind them to a connection.
    ///
    /// # Errors
    /// Returns `ConfigError` when the registry or the options reference
    /// unknown models, columns or relations.
    pub fn new(
        db: DatabaseConnection,
        registry: Arc<ModelRegistry>,
        options: Options,
    ) -> Result<Self, ConfigError> {
        registry.validate()?;
        options.validate(&registry)?;
        let model = registry.get(&options.model)?;
        Ok(Self {
            db,
            registry,
            model,
            options: Arc::new(options),
        })
    }

    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    #[must_use]
    pub fn model(&self) -> &ModelDef {
        &self.model
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    fn table(&self) -> Alias {
        Alias::new(&self.model.table)
    }

    fn column(&self, column: &str) -> Expr {
        Expr::col((self.table(), Alias::new(column)))
    }

    /// `SELECT table.col, ... FROM table`
    fn base_select(&self) -> SelectStatement {
        let table = self.table();
        let mut select = Query::select();
        for column in &self.model.columns {
            select.column((table.clone(), Alias::new(column)));
        }
        select.from(table);
        select
    }

    /// Base select narrowed by every scope present in `params`
    fn scoped_select(&self, params: &Params) -> Result<SelectStatement, ApiError> {
        let mut select = self.base_select();
        let includes = build_filter_includes(
            params,
            &self.options,
            &self.model,
            &self.registry,
            self.db.get_database_backend(),
        )?;
        for include in &includes {
            include.apply(&mut select, &self.model.table);
        }
        Ok(select)
    }

    fn primary_key_condition(&self, record: &Record) -> Result<Condition, ApiError> {
        let pk = &self.model.primary_key;
        let value = record
            .get(pk)
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                ApiError::internal(
                    "Record has no primary key",
                    Some(format!("{} row without '{pk}'", self.model.name)),
                )
            })?;
        let value = json_to_value(value, self.db.get_database_backend());
        Ok(Condition::all().add(self.column(pk).eq(value)))
    }

    async fn refetch(&self, id: &JsonValue) -> Result<Record, ApiError> {
        let mut select = self.base_select();
        select
            .cond_where(self.column(&self.model.primary_key).eq(json_to_value(id, self.db.get_database_backend())))
            .limit(1);
        fetch_one(&self.db, &select).await?.ok_or_else(|| {
            ApiError::internal(
                "Written record could not be read back",
                Some(format!("{} {id}", self.model.name)),
            )
        })
    }

    /// Relations to nest: the configured defaults plus the `include` param.
    ///
    /// # Errors
    /// Returns 400 naming an unknown relation.
    pub fn requested_includes(&self, params: &Params) -> Result<Vec<&Relation>, ApiError> {
        let requested = params
            .get("include")
            .map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()))
            .into_iter()
            .flatten();

        let mut relations: Vec<&Relation> = Vec::new();
        for name in self.options.include.iter().map(String::as_str).chain(requested) {
            let relation = self
                .model
                .relation(name)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown include '{name}'")))?;
            if !relations.iter().any(|r| r.name == relation.name) {
                relations.push(relation);
            }
        }
        Ok(relations)
    }

    /// Nest related rows under each relation name, one query per relation.
    async fn load_includes(&self, relations: &[&Relation], records: &mut [Record]) -> Result<(), ApiError> {
        let backend = self.db.get_database_backend();

        for relation in relations {
            let target = self.registry.get(&relation.model).map_err(|e| {
                ApiError::internal("Include target is not registered", Some(e.to_string()))
            })?;

            let mut keys: HashMap<String, sea_orm::Value> = HashMap::new();
            for record in records.iter() {
                if let Some(value) = record.get(&relation.foreign_key)
                    && let Some(key) = value_key(value)
                {
                    keys.entry(key).or_insert_with(|| json_to_value(value, backend));
                }
            }

            let mut related: HashMap<String, Record> = HashMap::new();
            if !keys.is_empty() {
                let target_table = Alias::new(&target.table);
                let mut select = Query::select();
                for column in &target.columns {
                    select.column((target_table.clone(), Alias::new(column)));
                }
                select.from(target_table.clone()).cond_where(
                    Expr::col((target_table, Alias::new(&target.primary_key))).is_in(keys.into_values()),
                );
                for row in fetch_all(&self.db, &select).await? {
                    if let Some(key) = row.get(&target.primary_key).and_then(value_key) {
                        related.insert(key, row);
                    }
                }
            }

            for record in records.iter_mut() {
                let nested = record
                    .get(&relation.foreign_key)
                    .and_then(value_key)
                    .and_then(|key| related.get(&key))
                    .map_or(JsonValue::Null, |row| JsonValue::Object(row.clone()));
                record.insert(relation.name.clone(), nested);
            }
        }
        Ok(())
    }

    /// Drop fields outside `allowed_fields`, keeping nested includes
    fn present(&self, relations: &[&Relation], record: &mut Record) {
        record.retain(|key, _| {
            self.options.is_visible(key) || relations.iter().any(|r| &r.name == key)
        });
    }

    /// Load includes and apply field visibility to rows about to be returned.
    ///
    /// # Errors
    /// Returns 400 for unknown includes, `ApiError::Database` when loading
    /// them fails.
    pub async fn render(&self, params: &Params, mut records: Vec<Record>) -> Result<Vec<Record>, ApiError> {
        let relations = self.requested_includes(params)?;
        self.load_includes(&relations, &mut records).await?;
        for record in &mut records {
            self.present(&relations, record);
        }
        Ok(records)
    }

    /// Single-record form of [`RestQuery::render`]
    ///
    /// # Errors
    /// See [`RestQuery::render`].
    pub async fn render_one(&self, params: &Params, record: Record) -> Result<Record, ApiError> {
        let mut rendered = self.render(params, vec![record]).await?;
        rendered
            .pop()
            .ok_or_else(|| ApiError::internal("Rendering dropped the record", None))
    }

    /// List rows matching the scope, column filters and search, sorted and
    /// paginated. Rows come back raw; pass them through [`RestQuery::render`].
    ///
    /// `path` and `query` are the request path and original query string,
    /// used for page links.
    ///
    /// # Errors
    /// Returns 400 for bad pagination or scope values, 404 for an unknown
    /// scope parent, `ApiError::Database` on query failure.
    pub async fn index(
        &self,
        params: &Params,
        path: &str,
        query: &Params,
    ) -> Result<(Vec<Record>, PageInfo), ApiError> {
        let pagination = parse_pagination(params, &self.options)?;
        self.resolve_scopes(params).await?;
        let filterable = self.options.filterable_columns(&self.model);
        let skip = scope_param_keys(&self.options, &self.model);

        let mut select = self.scoped_select(params)?;
        let mut condition = apply_filters(
            params,
            &self.model.table,
            &filterable,
            &skip,
            self.db.get_database_backend(),
        )?;
        if let Some(q) = params.get("q") {
            condition = condition.add_option(build_search_condition(
                &self.model.table,
                &self.options.search_fields,
                q,
            ));
        }
        if !condition.is_empty() {
            select.cond_where(condition);
        }

        let total = count(&self.db, &select, &self.model.table, &self.model.primary_key).await?;

        let sort = parse_sorting(params, &filterable, &self.options.id_column);
        select.order_by((self.table(), Alias::new(&sort.column)), sort.direction.clone());
        if sort.column != self.model.primary_key {
            // Stable pages when the sort column has duplicates
            select.order_by(
                (self.table(), Alias::new(&self.model.primary_key)),
                sea_orm::Order::Asc,
            );
        }
        select.limit(pagination.limit).offset(pagination.offset);

        tracing::debug!(
            model = %self.model.name,
            total,
            page = pagination.page,
            limit = pagination.limit,
            sort = %sort.column,
            "index"
        );

        let records = fetch_all(&self.db, &select).await?;
        Ok((records, page_info(total, &pagination, path, query)))
    }

    /// Fetch the raw row addressed by `params["id"]` within the current scope.
    ///
    /// # Errors
    /// Returns 400 when no `id` param is present, 404 when no row matches.
    pub async fn find(&self, params: &Params) -> Result<Record, ApiError> {
        let id = params
            .get("id")
            .ok_or_else(|| ApiError::bad_request("Missing 'id' parameter"))?;
        let mut select = self.scoped_select(params)?;
        select
            .cond_where(
                self.column(&self.options.id_column)
                    .eq(param_to_value(id, self.db.get_database_backend())),
            )
            .limit(1);

        fetch_one(&self.db, &select)
            .await?
            .ok_or_else(|| ApiError::not_found(&self.model.name, Some(id.clone())))
    }

    /// Fetch and render the row addressed by `params["id"]`.
    ///
    /// # Errors
    /// See [`RestQuery::find`] and [`RestQuery::render`].
    pub async fn show(&self, params: &Params) -> Result<Record, ApiError> {
        let record = self.find(params).await?;
        self.render_one(params, record).await
    }

    /// Reject client payloads carrying restricted fields
    ///
    /// # Errors
    /// Returns `ApiError::RestrictedFields` (403).
    pub fn guard(&self, payload: &Record) -> Result<(), ApiError> {
        check_restricted_fields(payload, &self.options, &self.model)
    }

    /// Resolve every scope present in `params` to its parent's primary key.
    ///
    /// # Errors
    /// Returns 404 when a scope parent does not exist.
    async fn resolve_scopes(&self, params: &Params) -> Result<Vec<(&Relation, JsonValue)>, ApiError> {
        let mut resolved = Vec::new();
        for scope in &self.options.scope_models {
            let Some(relation) = self.model.scope_relation(scope) else {
                continue;
            };
            let Some(raw) = params.get(&relation.name) else {
                continue;
            };
            let target = self.registry.get(&relation.model).map_err(|e| {
                ApiError::internal("Scope model is not registered", Some(e.to_string()))
            })?;
            let id = lookup_id(&self.db, &target, &Identifier::parse(raw))
                .await?
                .ok_or_else(|| ApiError::not_found(&target.name, Some(raw.clone())))?;
            resolved.push((relation, id));
        }
        Ok(resolved)
    }

    /// Point the payload at every scope present in `params`, overriding any
    /// reference the payload carries itself.
    async fn apply_scope(&self, params: &Params, payload: &mut Record) -> Result<(), ApiError> {
        for (relation, id) in self.resolve_scopes(params).await? {
            if !self.model.has_column(&relation.name) {
                payload.remove(&relation.name);
            }
            payload.insert(relation.foreign_key.clone(), id);
        }
        Ok(())
    }

    /// Insert `payload` without the restricted-field guard and return the raw
    /// stored row. Used for trusted payloads (e.g. after hooks ran).
    ///
    /// # Errors
    /// Returns 404 for an unknown scope parent, 422 for unresolvable
    /// references, 409 on unique violations.
    pub async fn insert(&self, params: &Params, mut payload: Record) -> Result<Record, ApiError> {
        retain_known_fields(&mut payload, &self.model);
        check_integer_ranges(&payload)?;
        self.apply_scope(params, &mut payload).await?;
        resolve_foreign_keys(&self.db, &self.registry, &self.model, &mut payload).await?;

        let backend = self.db.get_database_backend();
        let pk = &self.model.primary_key;
        let (columns, values): (Vec<_>, Vec<_>) = payload
            .iter()
            .map(|(column, value)| (Alias::new(column), json_to_expr(value, backend)))
            .unzip();

        let mut insert = Query::insert();
        insert.into_table(self.table());
        if columns.is_empty() {
            insert.or_default_values();
        } else {
            insert.columns(columns).values(values).map_err(|e| {
                ApiError::internal("Failed to build insert", Some(e.to_string()))
            })?;
        }

        let supplied = payload.get(pk).filter(|v| !v.is_null()).cloned();
        let id = if self.db.support_returning() {
            insert.returning_col(Alias::new(pk));
            let row = JsonValue::find_by_statement(backend.build(&insert))
                .one(&self.db)
                .await
                .map_err(ApiError::database)?;
            row.and_then(|row| row.get(pk).cloned()).or(supplied)
        } else {
            let result = self
                .db
                .execute(backend.build(&insert))
                .await
                .map_err(ApiError::database)?;
            supplied.or_else(|| Some(JsonValue::from(result.last_insert_id())))
        };
        let id = id.ok_or_else(|| ApiError::internal("Insert returned no primary key", None))?;

        tracing::info!(model = %self.model.name, id = %id, "created record");
        self.refetch(&id).await
    }

    /// Guard, insert and render a client payload.
    ///
    /// # Errors
    /// See [`RestQuery::guard`] and [`RestQuery::insert`].
    pub async fn create(&self, params: &Params, payload: Record) -> Result<Record, ApiError> {
        self.guard(&payload)?;
        let record = self.insert(params, payload).await?;
        self.render_one(params, record).await
    }

    /// Apply `payload` to an already fetched row and return the raw stored
    /// row. An empty payload writes nothing. The primary key is never
    /// rewritten.
    ///
    /// # Errors
    /// Returns 422 for unresolvable references, 409 on unique violations.
    pub async fn update_existing(&self, existing: &Record, mut payload: Record) -> Result<Record, ApiError> {
        retain_known_fields(&mut payload, &self.model);
        check_integer_ranges(&payload)?;
        if payload.remove(&self.model.primary_key).is_some() {
            tracing::debug!(model = %self.model.name, "ignoring primary key in update payload");
        }
        resolve_foreign_keys(&self.db, &self.registry, &self.model, &mut payload).await?;

        if payload.is_empty() {
            tracing::debug!(model = %self.model.name, "empty update, nothing written");
            return Ok(existing.clone());
        }

        let backend = self.db.get_database_backend();
        let mut update = Query::update();
        update
            .table(self.table())
            .values(
                payload
                    .iter()
                    .map(|(column, value)| (Alias::new(column), json_to_expr(value, backend))),
            )
            .cond_where(self.primary_key_condition(existing)?);
        self.db
            .execute(backend.build(&update))
            .await
            .map_err(ApiError::database)?;

        let id = existing
            .get(&self.model.primary_key)
            .cloned()
            .unwrap_or(JsonValue::Null);
        tracing::info!(model = %self.model.name, id = %id, fields = ?payload.keys().collect::<Vec<_>>(), "updated record");
        self.refetch(&id).await
    }

    /// Guard the payload, then update and render the row addressed by
    /// `params["id"]`.
    ///
    /// # Errors
    /// See [`RestQuery::find`], [`RestQuery::guard`] and
    /// [`RestQuery::update_existing`].
    pub async fn update(&self, params: &Params, payload: Record) -> Result<Record, ApiError> {
        let existing = self.find(params).await?;
        self.guard(&payload)?;
        let record = self.update_existing(&existing, payload).await?;
        self.render_one(params, record).await
    }

    /// Delete an already fetched row.
    ///
    /// # Errors
    /// Returns 404 when the row vanished in the meantime.
    pub async fn destroy_existing(&self, existing: &Record) -> Result<(), ApiError> {
        let mut delete = Query::delete();
        delete
            .from_table(self.table())
            .cond_where(self.primary_key_condition(existing)?);
        let result = self
            .db
            .execute(self.db.get_database_backend().build(&delete))
            .await
            .map_err(ApiError::database)?;

        let id = existing
            .get(&self.model.primary_key)
            .and_then(value_key);
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found(&self.model.name, id));
        }
        tracing::info!(model = %self.model.name, id = ?id, "deleted record");
        Ok(())
    }

    /// Delete the row addressed by `params["id"]`, returning it rendered as
    /// it was before deletion.
    ///
    /// # Errors
    /// See [`RestQuery::find`] and [`RestQuery::destroy_existing`].
    pub async fn destroy(&self, params: &Params) -> Result<Record, ApiError> {
        let existing = self.find(params).await?;
        let rendered = self.render_one(params, existing.clone()).await?;
        self.destroy_existing(&existing).await?;
        Ok(rendered)
    }
}
