//! API integration tests over the in-process store

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bookdesk_server::{
    api,
    config::AppConfig,
    repository::{memory::MemoryStore, Repository},
    services::{fines::LoanPolicy, Services},
    AppState,
};

fn app() -> Router {
    let state = AppState {
        config: Arc::new(AppConfig::default()),
        services: Arc::new(Services::new(
            Repository::memory(MemoryStore::new()),
            LoanPolicy::default(),
        )),
    };
    api::router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(format!("/api/v1{}", uri));
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_book(app: &Router, title: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/books",
        Some(json!({
            "isbn": "9780261103573",
            "title": title,
            "author": "J. R. R. Tolkien",
            "genre": "Fantasy"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn create_user(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/users",
        Some(json!({
            "name": "Bilbo Baggins",
            "contact": "bilbo@bagend.example",
            "membership_date": "2024-01-01",
            "username": username,
            "password": "precious"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn borrow(app: &Router, user_id: &str, book_id: &str, date: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/loans",
        Some(json!({ "user_id": user_id, "book_id": book_id, "borrow_date": date })),
    )
    .await
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_book_registry_crud() {
    let app = app();
    let id = create_book(&app, "The Hobbit").await;
    assert_eq!(id, "B001");

    let (status, body) = send(&app, Method::GET, "/books/B001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/books/B001",
        Some(json!({ "title": "There and Back Again" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "There and Back Again");

    let (status, _) = send(&app, Method::DELETE, "/books/B001", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, "/books/B001", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4);
}

#[tokio::test]
async fn test_invalid_book_is_rejected() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/books",
        Some(json!({ "isbn": "1", "title": "", "author": "Nobody" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_user_password_is_never_returned() {
    let app = app();
    create_user(&app, "bilbo").await;

    let (_, body) = send(&app, Method::GET, "/users/U001", None).await;

    assert_eq!(body["username"], "bilbo");
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_login() {
    let app = app();
    create_user(&app, "bilbo").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({ "username": "bilbo", "password": "precious" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "U001");

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({ "username": "bilbo", "password": "ring" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let app = app();
    create_user(&app, "bilbo").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/users",
        Some(json!({ "name": "Other", "username": "bilbo", "password": "secret" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Duplicate");
}

#[tokio::test]
async fn test_lending_cycle() {
    let app = app();
    let user = create_user(&app, "bilbo").await;
    let book = create_book(&app, "The Hobbit").await;

    let (status, record) = borrow(&app, &user, &book, "2024-01-01").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["id"], "R001");
    assert_eq!(record["return_date"], Value::Null);

    let (_, body) = send(&app, Method::GET, "/books/B001", None).await;
    assert_eq!(body["available"], false);

    let (status, body) = send(&app, Method::GET, "/loans/R001/fine?as_of=2024-01-20", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fine"], "50.00");

    let (status, body) = send(
        &app,
        Method::POST,
        "/loans/R001/return",
        Some(json!({ "return_date": "2024-01-20" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["return_date"], "2024-01-20");
    assert_eq!(body["fine"], "50.00");
    assert_eq!(body["fine_paid"], false);

    let (_, body) = send(&app, Method::GET, "/books/B001", None).await;
    assert_eq!(body["available"], true);

    let (status, body) = send(&app, Method::POST, "/loans/R001/pay-fine", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fine_paid"], true);

    let (_, body) = send(&app, Method::GET, "/users/U001/loans", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_fourth_borrow_is_rejected() {
    let app = app();
    let user = create_user(&app, "bilbo").await;
    for title in ["One", "Two", "Three", "Four"] {
        create_book(&app, title).await;
    }
    for book in ["B001", "B002", "B003"] {
        let (status, _) = borrow(&app, &user, book, "2024-01-01").await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = borrow(&app, &user, "B004", "2024-01-02").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["reason"], "limit_reached");

    let (_, body) = send(&app, Method::GET, "/loans?open=true", None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
    let (_, body) = send(&app, Method::GET, "/books/B004", None).await;
    assert_eq!(body["available"], true);
}

#[tokio::test]
async fn test_unavailable_book_is_rejected() {
    let app = app();
    let first = create_user(&app, "bilbo").await;
    let second = create_user(&app, "frodo").await;
    let book = create_book(&app, "The Hobbit").await;
    borrow(&app, &first, &book, "2024-01-01").await;

    let (status, body) = borrow(&app, &second, &book, "2024-01-02").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "book_unavailable");
}

#[tokio::test]
async fn test_return_and_payment_rejections() {
    let app = app();
    let user = create_user(&app, "bilbo").await;
    let book = create_book(&app, "The Hobbit").await;
    borrow(&app, &user, &book, "2024-01-01").await;
    send(
        &app,
        Method::POST,
        "/loans/R001/return",
        Some(json!({ "return_date": "2024-01-05" })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/loans/R001/return",
        Some(json!({ "return_date": "2024-01-06" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "already_returned");

    let (status, body) = send(&app, Method::POST, "/loans/R001/pay-fine", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "no_fine_due");

    let (status, body) = send(&app, Method::POST, "/loans/R404/pay-fine", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "unknown_loan");
}

#[tokio::test]
async fn test_reports() {
    let app = app();
    let user = create_user(&app, "bilbo").await;
    create_book(&app, "The Hobbit").await;
    create_book(&app, "The Silmarillion").await;
    borrow(&app, &user, "B001", "2024-01-01").await;

    let (_, body) = send(&app, Method::GET, "/reports/available-books", None).await;
    assert_eq!(body[0]["id"], "B002");

    let (_, body) = send(&app, Method::GET, "/reports/borrowed", None).await;
    assert_eq!(body[0]["book_id"], "B001");

    let (_, body) = send(&app, Method::GET, "/reports/overdue?as_of=2024-01-20", None).await;
    assert_eq!(body[0]["id"], "R001");
    assert_eq!(body[0]["days_overdue"], 5);
    assert_eq!(body[0]["current_fine"], "50.00");

    let (_, body) = send(&app, Method::GET, "/reports/summary?as_of=2024-01-20", None).await;
    assert_eq!(body["total_books"], 2);
    assert_eq!(body["available_books"], 1);
    assert_eq!(body["open_loans"], 1);
    assert_eq!(body["overdue_loans"], 1);
}

#[tokio::test]
async fn test_user_with_loans_cannot_be_deleted() {
    let app = app();
    let user = create_user(&app, "bilbo").await;
    let book = create_book(&app, "The Hobbit").await;
    borrow(&app, &user, &book, "2024-01-01").await;

    let (status, _) = send(&app, Method::DELETE, &format!("/users/{}", user), None).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_malformed_return_date_leaves_loan_open() {
    let app = app();
    let user = create_user(&app, "bilbo").await;
    let book = create_book(&app, "The Hobbit").await;
    borrow(&app, &user, &book, "2024-01-01").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/loans/R001/return",
        Some(json!({ "return_date": "2024-01-32" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (_, record) = send(&app, Method::GET, "/loans/R001", None).await;
    assert_eq!(record["return_date"], Value::Null);
    assert_eq!(record["fine"], "0.00");
    let (_, body) = send(&app, Method::GET, "/books/B001", None).await;
    assert_eq!(body["available"], false);
}

#[tokio::test]
async fn test_return_without_body_uses_today() {
    let app = app();
    let user = create_user(&app, "bilbo").await;
    let book = create_book(&app, "The Hobbit").await;
    borrow(&app, &user, &book, "2024-01-01").await;

    let (status, body) = send(&app, Method::POST, "/loans/R001/return", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["return_date"].is_string());
}
