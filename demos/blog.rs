//! Blog API over an in-memory SQLite database.
//!
//! ```text
//! cargo run --example blog
//!
//! curl -X POST localhost:3000/authors -H 'Authorization: Bearer ada' \
//!      -H 'content-type: application/json' -d '{"handle": "ada", "name": "Ada Lovelace"}'
//! curl -X POST localhost:3000/writers/ada/posts -H 'Authorization: Bearer ada' \
//!      -H 'content-type: application/json' -d '{"title": "Notes on the engine"}'
//! curl 'localhost:3000/posts?q=engine&include=author'
//! ```
//!
//! Reads are public; writes need a bearer token (any handle will do).

use async_trait::async_trait;
use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
};
use restcontroller::{
    Action, ApiError, AppConfig, Controller, ControllerHooks, Options, Phase, Record, RequestContext,
    RestQuery, router,
};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const SCHEMA: &str = "
    CREATE TABLE authors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        handle TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL
    );
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        body TEXT,
        author_id INTEGER REFERENCES authors (id),
        published BOOLEAN NOT NULL DEFAULT FALSE
    );
";

const CONFIG: &str = r#"{
    "models": [
        {"name": "authors", "table": "authors", "columns": ["id", "uuid", "handle", "name"],
         "alias_column": "handle", "uuid_column": "uuid"},
        {"name": "posts", "table": "posts", "columns": ["id", "title", "body", "author_id", "published"],
         "relations": [{"name": "author", "model": "authors", "foreign_key": "author_id"}]}
    ],
    "resources": [
        {"model": "authors", "restricted_fields": ["id", "uuid"], "search_fields": ["handle", "name"]},
        {"model": "posts", "restricted_fields": "id", "scope_models": "authors",
         "search_fields": ["title", "body"], "page_size": 20}
    ]
}"#;

#[derive(Debug, Clone)]
struct Principal {
    handle: String,
}

/// Stand-in for a real auth layer: `Authorization: Bearer <handle>`
async fn principal(mut request: Request, next: Next) -> Response {
    let handle = request
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);
    if let Some(handle) = handle {
        request.extensions_mut().insert(Principal { handle });
    }
    next.run(request).await
}

fn signed_in_writes(ctx: &RequestContext, action: Action, _: Option<&Record>) -> bool {
    !action.is_write() || ctx.extensions.get::<Principal>().is_some()
}

struct AuthorHooks;

#[async_trait]
impl ControllerHooks for AuthorHooks {
    async fn before_create(
        &self,
        _db: &DatabaseConnection,
        ctx: &RequestContext,
        payload: &mut Record,
    ) -> Result<(), ApiError> {
        let Some(principal) = ctx.extensions.get::<Principal>() else {
            return Err(ApiError::forbidden("Sign in to register"));
        };
        if payload.get("handle") != Some(&json!(principal.handle)) {
            return Err(ApiError::forbidden("You can only register yourself"));
        }
        payload.insert("uuid".into(), json!(Uuid::new_v4().to_string()));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,restcontroller=debug")),
        )
        .init();

    let db = Database::connect("sqlite::memory:").await?;
    db.execute_unprepared(SCHEMA).await?;

    let config = AppConfig::from_json_str(CONFIG)?;
    let registry = Arc::new(config.build_registry()?);
    let resource = |name: &str| {
        config
            .resource(name)
            .cloned()
            .unwrap_or_else(|| Options::new(name))
    };

    let authors = Controller::new(RestQuery::new(db.clone(), registry.clone(), resource("authors"))?)
        .hooks(AuthorHooks)
        .authorize(signed_in_writes);
    let posts = Controller::new(RestQuery::new(db, registry, resource("posts"))?).authorize(signed_in_writes);

    let mut events = posts.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event.phase == Phase::After && event.action.is_write() {
                tracing::info!(resource = %event.resource, action = %event.action, "post changed");
            }
        }
    });

    let posts = Arc::new(posts);
    let app = Router::new()
        .nest("/authors", router(Arc::new(authors)))
        .nest("/posts", router(posts.clone()))
        .nest("/writers/{author}/posts", router(posts))
        .layer(middleware::from_fn(principal));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("listening on http://127.0.0.1:3000");
    axum::serve(listener, app).await?;
    Ok(())
}
