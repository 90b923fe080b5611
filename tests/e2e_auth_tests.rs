//! End-to-end tests for authentication endpoints
//!
//! Tests registration, login, logout, session management and authentication
//! requirements.

mod common;

use common::{data, TestClient, TestServer, STUDENT_PASS, STUDENT_USER};
use reqwest::StatusCode;
use serde_json::json;

fn current_year() -> i64 {
    skillwise_server::user::current_year() as i64
}

#[tokio::test]
async fn test_home_reports_uptime_without_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["uptime"].as_str().unwrap().starts_with("0d "));
    assert!(body["sessionToken"].is_null());
}

#[tokio::test]
async fn test_login_with_valid_credentials() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(STUDENT_USER, STUDENT_PASS).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let login = data(response).await;
    assert!(!login["token"].as_str().unwrap().is_empty());
    assert_eq!(login["user"]["handle"], STUDENT_USER);

    // The session cookie is kept by the client
    let response = client.me().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(data(response).await["handle"], STUDENT_USER);
}

#[tokio::test]
async fn test_login_with_invalid_password() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(STUDENT_USER, "wrong_password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_login_with_nonexistent_user() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login("nonexistent_user", "password123").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_header_authenticates_without_cookie() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let token = data(client.login(STUDENT_USER, STUDENT_PASS).await).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = reqwest::Client::new()
        .get(format!("{}/api/users/me", server.base_url))
        .header("Authorization", token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_student(server.base_url.clone()).await;

    assert_eq!(client.me().await.status(), StatusCode::OK);

    let response = client.logout().await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(client.me().await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_authentication() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    assert_eq!(client.me().await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(client.list_courses().await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(client.feed().await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(client.listings().await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(client.notifications().await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_then_login() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .register(json!({
            "handle": "newcomer",
            "password": "newcomerpass",
            "email": "newcomer@example.com",
            "role": "Teacher",
            "birthYear": 1990,
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = data(response).await;
    assert_eq!(user["role"], "Teacher");
    assert_eq!(user["blocked"], json!(false));

    assert_eq!(
        client.login("newcomer", "newcomerpass").await.status(),
        StatusCode::CREATED
    );
    let session = data(client.session().await).await;
    assert!(session["permissions"]
        .as_array()
        .unwrap()
        .contains(&json!("CreateCourses")));
}

#[tokio::test]
async fn test_register_rejects_invalid_fields() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .register(json!({
            "handle": "x",
            "password": "short",
            "role": "Admin",
        }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json().await.unwrap();
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"handle"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"role"));
}

#[tokio::test]
async fn test_register_duplicate_handle() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .register(json!({
            "handle": STUDENT_USER,
            "password": "anotherpass",
            "role": "Student",
        }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_young_account_is_blocked_and_read_only() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .register(json!({
            "handle": "little_one",
            "password": "littleonepass",
            "role": "Child",
            "birthYear": current_year() - 9,
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(data(response).await["blocked"], json!(true));

    // Blocked accounts can still log in and read
    assert_eq!(
        client.login("little_one", "littleonepass").await.status(),
        StatusCode::CREATED
    );
    let session = data(client.session().await).await;
    assert_eq!(session["blocked"], json!(true));
    assert_eq!(session["permissions"], json!(["AccessCourses"]));
    assert_eq!(client.list_courses().await.status(), StatusCode::OK);

    // ...but not write
    let response = client
        .create_post(json!({ "postType": "blog", "content": "hello" }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_young_users_must_register_as_child() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .register(json!({
            "handle": "young_student",
            "password": "youngstudentpass",
            "role": "Student",
            "birthYear": current_year() - 10,
        }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errors"][0]["field"], "birthYear");

    assert_eq!(
        client
            .login("young_student", "youngstudentpass")
            .await
            .status(),
        StatusCode::UNAUTHORIZED
    );
}
