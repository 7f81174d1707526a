use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::core::RequestContext;
use crate::database::Record;
use crate::errors::ApiError;

/// Lifecycle hooks around every controller action.
///
/// Every method defaults to a no-op, so implementors override only what they
/// need. Returning an error aborts the action with that error; nothing after
/// the failing hook runs.
///
/// - `before_*` hooks run after authorization and before the query.
///   `before_create`/`before_update` receive the payload after the
///   restricted-field guard, so they may set restricted fields themselves.
/// - `after_*` hooks receive the rendered result and may adjust it before it
///   is placed in `ctx.state.data`.
///
/// ```rust,ignore
/// struct Stamp;
///
/// #[async_trait]
/// impl ControllerHooks for Stamp {
///     async fn before_create(&self, _db: &DatabaseConnection, ctx: &RequestContext, payload: &mut Record) -> Result<(), ApiError> {
///         let user = ctx.extensions.get::<CurrentUser>().ok_or_else(|| ApiError::forbidden("Login required"))?;
///         payload.insert("author_id".into(), user.id.into());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
#[allow(unused_variables)]
pub trait ControllerHooks: Send + Sync {
    /// May rewrite `ctx.query`/`ctx.params` to narrow the listing
    async fn before_index(&self, db: &DatabaseConnection, ctx: &mut RequestContext) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_index(
        &self,
        db: &DatabaseConnection,
        ctx: &RequestContext,
        records: &mut Vec<Record>,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn before_show(&self, db: &DatabaseConnection, ctx: &RequestContext) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_show(&self, db: &DatabaseConnection, ctx: &RequestContext, record: &mut Record) -> Result<(), ApiError> {
        Ok(())
    }

    async fn before_create(&self, db: &DatabaseConnection, ctx: &RequestContext, payload: &mut Record) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_create(&self, db: &DatabaseConnection, ctx: &RequestContext, record: &mut Record) -> Result<(), ApiError> {
        Ok(())
    }

    /// `existing` is the raw row as stored before the update
    async fn before_update(
        &self,
        db: &DatabaseConnection,
        ctx: &RequestContext,
        existing: &Record,
        payload: &mut Record,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_update(&self, db: &DatabaseConnection, ctx: &RequestContext, record: &mut Record) -> Result<(), ApiError> {
        Ok(())
    }

    async fn before_destroy(&self, db: &DatabaseConnection, ctx: &RequestContext, existing: &Record) -> Result<(), ApiError> {
        Ok(())
    }

    /// `record` is the rendered row as it was before deletion
    async fn after_destroy(&self, db: &DatabaseConnection, ctx: &RequestContext, record: &Record) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

#[async_trait]
impl ControllerHooks for NoHooks {}
