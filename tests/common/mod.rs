//! Shared helpers for live-server API tests
//!
//! These tests run against an already-started server (and its Postgres and
//! Redis). Each test provisions its own users and books with unique data so
//! runs do not interfere with each other.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::{Client, Response};
use serde_json::{json, Value};

pub const BASE_URL: &str = "http://localhost:8080/api/v1";

pub fn unique_email(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{}-{}@test.liber.org", prefix, nanos)
}

pub fn due_date() -> String {
    (chrono::Utc::now() + chrono::Duration::days(14)).to_rfc3339()
}

/// Register a fresh user with the given role and return its token and id
pub async fn register_and_login(client: &Client, role: &str) -> (String, i64) {
    let email = unique_email(role);

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "firstname": "Test",
            "lastname": "User",
            "email": email,
            "password": "password",
            "role": role
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), 201, "registration should succeed");

    let user: Value = response.json().await.expect("Failed to parse user");
    let user_id = user["id"].as_i64().expect("No user id");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "password" }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(response.status(), 200, "login should succeed");

    let body: Value = response.json().await.expect("Failed to parse login response");
    let token = body["token"].as_str().expect("No token in response").to_string();

    (token, user_id)
}

/// Create a book as the given admin and return its JSON representation
pub async fn create_book(client: &Client, admin_token: &str, title: &str, stock: i64) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(admin_token)
        .json(&json!({
            "title": title,
            "author": "Test Author",
            "stock": stock
        }))
        .send()
        .await
        .expect("Failed to send create book request");
    assert_eq!(response.status(), 201, "book creation should succeed");

    response.json().await.expect("Failed to parse book")
}

pub async fn get_book(client: &Client, token: &str, book_id: i64) -> Value {
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send get book request");
    assert_eq!(response.status(), 200, "book lookup should succeed");

    response.json().await.expect("Failed to parse book")
}

pub async fn borrow(client: &Client, token: &str, book_id: i64) -> Response {
    client
        .post(format!("{}/borrow", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "book_id": book_id, "due_date": due_date() }))
        .send()
        .await
        .expect("Failed to send borrow request")
}

pub async fn return_book(client: &Client, token: &str, book_id: i64) -> Response {
    client
        .post(format!("{}/return", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send return request")
}
