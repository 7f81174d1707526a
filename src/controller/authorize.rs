use async_trait::async_trait;

use super::Action;
use crate::core::RequestContext;
use crate::database::Record;
use crate::errors::ApiError;

/// Authorization call-out consulted by every controller action.
///
/// Called once before the action with `record = None`, and again with the
/// fetched row for `show`, `update` and `destroy`. Returning `Ok(false)`
/// aborts the action with 403.
///
/// Plain closures work for synchronous checks:
///
/// ```rust,ignore
/// let only_admins_write = |ctx: &RequestContext, action: Action, _: Option<&Record>| {
///     !action.is_write() || ctx.extensions.get::<Principal>().is_some_and(|p| p.admin)
/// };
/// Controller::new(query).authorize(only_admins_write);
/// ```
#[async_trait]
pub trait Authorize: Send + Sync {
    /// # Errors
    /// Implementations may fail with any `ApiError`; it is returned as is.
    async fn authorize(
        &self,
        ctx: &RequestContext,
        action: Action,
        record: Option<&Record>,
    ) -> Result<bool, ApiError>;
}

#[async_trait]
impl<F> Authorize for F
where
    F: Fn(&RequestContext, Action, Option<&Record>) -> bool + Send + Sync,
{
    async fn authorize(
        &self,
        ctx: &RequestContext,
        action: Action,
        record: Option<&Record>,
    ) -> Result<bool, ApiError> {
        Ok(self(ctx, action, record))
    }
}

/// Permits everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorize for AllowAll {
    async fn authorize(&self, _: &RequestContext, _: Action, _: Option<&Record>) -> Result<bool, ApiError> {
        Ok(true)
    }
}
