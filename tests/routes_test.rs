use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use restcontroller::router;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

mod common;
use common::{posts_controller, setup_seeded_db};

async fn app() -> Router {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let posts = Arc::new(posts_controller(db));
    let api = Router::new()
        .nest("/posts", router(posts.clone()))
        .nest("/authors/{author}/posts", router(posts));
    Router::new().nest("/api/v1", api)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, value)
}

#[tokio::test]
async fn test_index_envelope_and_content_range() {
    let app = app().await;
    let (status, headers, body) = send(&app, "GET", "/api/v1/posts?limit=2&sort=-priority", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-range").unwrap(), "posts 0-1/5");
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["id"], json!(2));
    assert_eq!(body["pagination"]["total"], json!(5));
    assert_eq!(body["pagination"]["pages"], json!(3));
    assert!(body["pagination"]["prevUrl"].is_null());
    assert_eq!(
        body["pagination"]["nextUrl"],
        json!("/api/v1/posts?sort=-priority&page=2&limit=2")
    );
}

#[tokio::test]
async fn test_nested_scope_route() {
    let app = app().await;
    let (status, _, body) = send(&app, "GET", "/api/v1/authors/ada/posts?limit=1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], json!(2));
    assert_eq!(
        body["pagination"]["nextUrl"],
        json!("/api/v1/authors/ada/posts?page=2&limit=1")
    );

    let (status, _, _) = send(&app, "GET", "/api/v1/authors/grace/posts/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_nested_create_uses_route_scope() {
    let app = app().await;
    let (status, _, body) = send(
        &app,
        "POST",
        "/api/v1/authors/grace/posts",
        Some(json!({"title": "Flow-Matic"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["author_id"], json!(2));
}

#[tokio::test]
async fn test_crud_round() {
    let app = app().await;

    let (status, _, created) = send(
        &app,
        "POST",
        "/api/v1/posts",
        Some(json!({"title": "Traits", "author": "ada", "priority": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["author_id"], json!(1));

    let uri = format!("/api/v1/posts/{id}");
    let (status, _, shown) = send(&app, "GET", &format!("{uri}?include=author"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shown["author"]["handle"], json!("ada"));

    let (status, _, updated) = send(&app, "PATCH", &uri, Some(json!({"priority": 8}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["priority"], json!(8));
    assert_eq!(updated["title"], json!("Traits"));

    let (status, _, updated) = send(&app, "PUT", &uri, Some(json!({"title": "Traits, again"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], json!("Traits, again"));

    let (status, _, body) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!(format!("posts with ID '{id}' not found")));
}

#[tokio::test]
async fn test_error_bodies() {
    let app = app().await;

    let (status, _, body) = send(&app, "POST", "/api/v1/posts", Some(json!({"title": "x", "published": true}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"], json!(["published"]));

    let (status, _, body) = send(&app, "POST", "/api/v1/posts", Some(json!({"title": "x", "author": "nobody"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"], json!(["author 'nobody' does not exist"]));

    let (status, _, _) = send(&app, "GET", "/api/v1/posts?page=zero", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, "GET", "/api/v1/posts?include=editor", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_numeric_limits_answer_errors() {
    let app = app().await;

    let (status, _, _) = send(&app, "GET", "/api/v1/posts?page=9223372036854775807", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, "GET", "/api/v1/posts?offset=18446744073709551615", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/v1/posts",
        Some(json!({"title": "Huge", "priority": 18_446_744_073_709_551_615_u64})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"], json!(["priority is out of range"]));

    let (status, _, _) = send(&app, "GET", "/api/v1/authors/nobody/posts", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let app = app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/posts")
        .header("content-type", "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
