//! # Controller
//!
//! Wraps a [`RestQuery`] with the request lifecycle:
//!
//! 1. authorization call-out (`record = None`)
//! 2. fetch, for actions addressing one row, then authorization on that row
//! 3. `before_*` hook and `before` event
//! 4. the query itself
//! 5. rendering, `after_*` hook and `after` event
//! 6. result written to `ctx.state` for a presenter
//!
//! Any failing step aborts the action; later steps do not run and no `after`
//! event is emitted.

pub mod authorize;
pub mod events;
pub mod hooks;

pub use authorize::{AllowAll, Authorize};
pub use events::{ControllerEvent, EventEmitter, Phase};
pub use hooks::{ControllerHooks, NoHooks};

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use utoipa::ToSchema;

use crate::core::{ContextState, RequestContext};
use crate::database::Record;
use crate::errors::ApiError;
use crate::operations::RestQuery;

/// The five CRUD actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Index,
    Show,
    Create,
    Update,
    Destroy,
}

impl Action {
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Destroy)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Index => "index",
            Self::Show => "show",
            Self::Create => "create",
            Self::Update => "update",
            Self::Destroy => "destroy",
        };
        f.write_str(name)
    }
}

fn records_to_value(records: Vec<Record>) -> Value {
    Value::Array(records.into_iter().map(Value::Object).collect())
}

/// Request body as a payload record
fn payload(ctx: &RequestContext) -> Result<Record, ApiError> {
    match &ctx.body {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) | None => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}

/// CRUD controller for one resource.
#[derive(Clone)]
pub struct Controller {
    query: RestQuery,
    hooks: Arc<dyn ControllerHooks>,
    authorizer: Arc<dyn Authorize>,
    events: EventEmitter,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("resource", &self.query.model().name)
            .field("subscribers", &self.events.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Controller with no hooks that permits every action
    #[must_use]
    pub fn new(query: RestQuery) -> Self {
        Self {
            query,
            hooks: Arc::new(NoHooks),
            authorizer: Arc::new(AllowAll),
            events: EventEmitter::default(),
        }
    }

    #[must_use]
    pub fn hooks(mut self, hooks: impl ControllerHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    #[must_use]
    pub fn authorize(mut self, authorizer: impl Authorize + 'static) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    /// Publish to an existing emitter, e.g. one shared by several resources
    #[must_use]
    pub fn events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub const fn query(&self) -> &RestQuery {
        &self.query
    }

    #[must_use]
    pub fn resource_name(&self) -> &str {
        &self.query.model().name
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    async fn check(&self, ctx: &RequestContext, action: Action, record: Option<&Record>) -> Result<(), ApiError> {
        if self.authorizer.authorize(ctx, action, record).await? {
            return Ok(());
        }
        tracing::debug!(
            resource = %self.resource_name(),
            action = %action,
            fetched = record.is_some(),
            "authorization denied"
        );
        Err(ApiError::forbidden(format!(
            "Not allowed to {action} {}",
            self.resource_name()
        )))
    }

    /// Build event data only when someone listens
    fn emit(&self, action: Action, phase: Phase, data: impl FnOnce() -> Option<Value>) {
        if self.events.subscriber_count() == 0 {
            return;
        }
        self.events.emit(ControllerEvent {
            resource: self.resource_name().to_string(),
            action,
            phase,
            data: data(),
        });
    }

    /// List rows; sets `state.data` to an array and `state.page`.
    ///
    /// # Errors
    /// Returns 403 when unauthorized, plus any hook or query error.
    pub async fn index(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let db = self.query.db();
        self.check(ctx, Action::Index, None).await?;
        self.hooks.before_index(db, ctx).await?;
        self.emit(Action::Index, Phase::Before, || None);

        let params = ctx.merged_params();
        let (records, page) = self.query.index(&params, &ctx.path, &ctx.query).await?;
        let mut records = self.query.render(&params, records).await?;
        self.hooks.after_index(db, ctx, &mut records).await?;

        let data = records_to_value(records);
        self.emit(Action::Index, Phase::After, || Some(data.clone()));
        ctx.state = ContextState {
            data: Some(data),
            page: Some(page),
            status: Some(StatusCode::OK),
        };
        Ok(())
    }

    /// Fetch one row addressed by the `id` param.
    ///
    /// # Errors
    /// Returns 403 when unauthorized, 404 when absent, plus any hook error.
    pub async fn show(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let db = self.query.db();
        self.check(ctx, Action::Show, None).await?;
        self.hooks.before_show(db, ctx).await?;
        self.emit(Action::Show, Phase::Before, || None);

        let params = ctx.merged_params();
        let record = self.query.find(&params).await?;
        self.check(ctx, Action::Show, Some(&record)).await?;
        let mut record = self.query.render_one(&params, record).await?;
        self.hooks.after_show(db, ctx, &mut record).await?;

        let data = Value::Object(record);
        self.emit(Action::Show, Phase::After, || Some(data.clone()));
        ctx.state = ContextState {
            data: Some(data),
            page: None,
            status: Some(StatusCode::OK),
        };
        Ok(())
    }

    /// Insert the request body; sets `state.status` to 201.
    ///
    /// # Errors
    /// Returns 400 for a non-object body, 403 when unauthorized or when the
    /// body carries restricted fields, plus any hook or write error.
    pub async fn create(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let db = self.query.db();
        self.check(ctx, Action::Create, None).await?;
        let mut payload = payload(ctx)?;
        self.query.guard(&payload)?;
        self.hooks.before_create(db, ctx, &mut payload).await?;
        self.emit(Action::Create, Phase::Before, || Some(Value::Object(payload.clone())));

        let params = ctx.merged_params();
        let record = self.query.insert(&params, payload).await?;
        let mut record = self.query.render_one(&params, record).await?;
        self.hooks.after_create(db, ctx, &mut record).await?;

        let data = Value::Object(record);
        self.emit(Action::Create, Phase::After, || Some(data.clone()));
        ctx.state = ContextState {
            data: Some(data),
            page: None,
            status: Some(StatusCode::CREATED),
        };
        Ok(())
    }

    /// Apply the request body to the row addressed by the `id` param.
    ///
    /// # Errors
    /// Returns 400 for a non-object body, 403 when unauthorized or when the
    /// body carries restricted fields, 404 when absent, plus any hook or write
    /// error.
    pub async fn update(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let db = self.query.db();
        self.check(ctx, Action::Update, None).await?;
        let mut payload = payload(ctx)?;
        self.query.guard(&payload)?;

        let params = ctx.merged_params();
        let existing = self.query.find(&params).await?;
        self.check(ctx, Action::Update, Some(&existing)).await?;
        self.hooks.before_update(db, ctx, &existing, &mut payload).await?;
        self.emit(Action::Update, Phase::Before, || Some(Value::Object(payload.clone())));

        let record = self.query.update_existing(&existing, payload).await?;
        let mut record = self.query.render_one(&params, record).await?;
        self.hooks.after_update(db, ctx, &mut record).await?;

        let data = Value::Object(record);
        self.emit(Action::Update, Phase::After, || Some(data.clone()));
        ctx.state = ContextState {
            data: Some(data),
            page: None,
            status: Some(StatusCode::OK),
        };
        Ok(())
    }

    /// Delete the row addressed by the `id` param; `state.data` holds the
    /// deleted row and `state.status` is 204.
    ///
    /// # Errors
    /// Returns 403 when unauthorized, 404 when absent, plus any hook or write
    /// error.
    pub async fn destroy(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let db = self.query.db();
        self.check(ctx, Action::Destroy, None).await?;

        let params = ctx.merged_params();
        let existing = self.query.find(&params).await?;
        self.check(ctx, Action::Destroy, Some(&existing)).await?;
        self.hooks.before_destroy(db, ctx, &existing).await?;
        self.emit(Action::Destroy, Phase::Before, || None);

        let record = self.query.render_one(&params, existing.clone()).await?;
        self.query.destroy_existing(&existing).await?;
        self.hooks.after_destroy(db, ctx, &record).await?;

        let data = Value::Object(record);
        self.emit(Action::Destroy, Phase::After, || Some(data.clone()));
        ctx.state = ContextState {
            data: Some(data),
            page: None,
            status: Some(StatusCode::NO_CONTENT),
        };
        Ok(())
    }
}
