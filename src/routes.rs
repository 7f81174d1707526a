//! # HTTP Presenter
//!
//! Mounts a [`Controller`] as an axum router and serializes `ctx.state`:
//!
//! | Method        | Path     | Action    | Success                              |
//! |---------------|----------|-----------|--------------------------------------|
//! | GET           | `/`      | `index`   | 200 `{data, pagination}` + `Content-Range` |
//! | POST          | `/`      | `create`  | 201 record                           |
//! | GET           | `/{id}`  | `show`    | 200 record                           |
//! | PUT, PATCH    | `/{id}`  | `update`  | 200 record                           |
//! | DELETE        | `/{id}`  | `destroy` | 204                                  |
//!
//! Route parameters from enclosing routers take part in scoping, so the same
//! controller serves both mounts below:
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .nest("/posts", router(posts.clone()))
//!     .nest("/authors/{author}/posts", router(posts));
//! ```

use axum::{
    Json, Router,
    extract::{FromRequestParts, OriginalUri, RawPathParams, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use url::form_urlencoded;
use utoipa::ToSchema;

use crate::controller::Controller;
use crate::core::{ContextState, Params, RequestContext};
use crate::errors::ApiError;
use crate::filtering::{PageInfo, calculate_content_range};

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Body of a list response
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Value,
    pub pagination: PageInfo,
}

/// Build a [`RequestContext`] from an axum request.
///
/// # Errors
/// Returns 400 when the body is not valid JSON or too large.
pub async fn build_context(request: Request) -> Result<RequestContext, ApiError> {
    let (mut parts, body) = request.into_parts();

    let params: Params = match RawPathParams::from_request_parts(&mut parts, &()).await {
        Ok(raw) => raw
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        Err(_) => Params::new(),
    };

    // Nested routers see a stripped uri; page links need the full path
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path().to_string(), |uri| uri.0.path().to_string());

    let query: Params = parts
        .uri
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::bad_request(format!("Unreadable request body: {e}")))?;
    let body = if bytes.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(
            serde_json::from_slice::<Value>(&bytes)
                .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?,
        )
    };

    Ok(RequestContext {
        path,
        query,
        params,
        body,
        extensions: parts.extensions,
        state: ContextState::default(),
    })
}

fn present_one(ctx: RequestContext) -> Response {
    let status = ctx.state.status.unwrap_or(StatusCode::OK);
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    (status, Json(ctx.state.data.unwrap_or(Value::Null))).into_response()
}

fn present_list(controller: &Controller, ctx: RequestContext) -> Response {
    let data = ctx.state.data.unwrap_or_else(|| Value::Array(Vec::new()));
    let Some(pagination) = ctx.state.page else {
        return Json(data).into_response();
    };
    let headers = calculate_content_range(
        pagination.offset,
        pagination.limit,
        pagination.total,
        controller.resource_name(),
    );
    (headers, Json(ListResponse { data, pagination })).into_response()
}

async fn index(State(controller): State<Arc<Controller>>, request: Request) -> Result<Response, ApiError> {
    let mut ctx = build_context(request).await?;
    controller.index(&mut ctx).await?;
    Ok(present_list(&controller, ctx))
}

async fn show(State(controller): State<Arc<Controller>>, request: Request) -> Result<Response, ApiError> {
    let mut ctx = build_context(request).await?;
    controller.show(&mut ctx).await?;
    Ok(present_one(ctx))
}

async fn create(State(controller): State<Arc<Controller>>, request: Request) -> Result<Response, ApiError> {
    let mut ctx = build_context(request).await?;
    controller.create(&mut ctx).await?;
    Ok(present_one(ctx))
}

async fn update(State(controller): State<Arc<Controller>>, request: Request) -> Result<Response, ApiError> {
    let mut ctx = build_context(request).await?;
    controller.update(&mut ctx).await?;
    Ok(present_one(ctx))
}

async fn destroy(State(controller): State<Arc<Controller>>, request: Request) -> Result<Response, ApiError> {
    let mut ctx = build_context(request).await?;
    controller.destroy(&mut ctx).await?;
    Ok(present_one(ctx))
}

/// CRUD routes for one controller
pub fn router(controller: Arc<Controller>) -> Router {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).put(update).patch(update).delete(destroy))
        .with_state(controller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde_json::json;

    #[tokio::test]
    async fn test_build_context_parses_query_and_body() {
        let request = Request::builder()
            .method("POST")
            .uri("/posts?q=rust+lang&page=2")
            .body(Body::from(r#"{"title": "Hello"}"#))
            .unwrap();
        let ctx = build_context(request).await.unwrap();

        assert_eq!(ctx.path, "/posts");
        assert_eq!(ctx.query.get("q").map(String::as_str), Some("rust lang"));
        assert_eq!(ctx.query.get("page").map(String::as_str), Some("2"));
        assert!(ctx.params.is_empty());
        assert_eq!(ctx.body, Some(json!({"title": "Hello"})));
    }

    #[tokio::test]
    async fn test_build_context_empty_body_is_none() {
        let request = Request::builder().uri("/posts").body(Body::empty()).unwrap();
        let ctx = build_context(request).await.unwrap();
        assert!(ctx.body.is_none());
        assert!(ctx.query.is_empty());
    }

    #[tokio::test]
    async fn test_build_context_rejects_invalid_json() {
        let request = Request::builder()
            .method("POST")
            .uri("/posts")
            .body(Body::from("{not json"))
            .unwrap();
        let err = build_context(request).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
