// Not every test binary uses every helper.
#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::Arc;
use taskdesk::{
    AppConfig, AppState, MemoryRepository, RepositoryState, create_router,
};
use tokio::net::TcpListener;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
}

/// Binds the full router (in-memory repository, default config) on an
/// ephemeral port and serves it in the background.
pub async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let config = AppConfig::default();

    let state = AppState { repo, config };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

/// Standard registration payload; the password doubles as the login secret.
pub fn registration_payload(username: &str) -> Value {
    json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": "correct horse battery staple",
        "password_confirm": "correct horse battery staple",
        "age": 30,
        "can_be_contacted": true,
        "can_data_be_shared": true
    })
}

/// Registers a user and returns their id.
pub async fn register(client: &reqwest::Client, address: &str, username: &str) -> Uuid {
    let response = client
        .post(format!("{address}/users"))
        .json(&registration_payload(username))
        .send()
        .await
        .expect("register request failed");
    assert_eq!(response.status(), 201, "registration should succeed");
    let body: Value = response.json().await.unwrap();
    body["id"].as_str().unwrap().parse().unwrap()
}

/// Registers a user and logs them in, returning (id, access token).
pub async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    username: &str,
) -> (Uuid, String) {
    let id = register(client, address, username).await;
    let response = client
        .post(format!("{address}/login"))
        .json(&json!({
            "username": username,
            "password": "correct horse battery staple"
        }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(response.status(), 200, "login should succeed");
    let body: Value = response.json().await.unwrap();
    (id, body["access"].as_str().unwrap().to_string())
}

/// Creates a project as the token's user and returns its JSON view.
pub async fn create_project(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    name: &str,
    contributors: &[Uuid],
) -> Value {
    let response = client
        .post(format!("{address}/projects"))
        .bearer_auth(token)
        .json(&json!({
            "name": name,
            "description": "integration test project",
            "category": "back-end",
            "contributors": contributors
        }))
        .send()
        .await
        .expect("create project request failed");
    assert_eq!(response.status(), 201, "project creation should succeed");
    response.json().await.unwrap()
}

/// Files an issue on a project and returns its JSON.
pub async fn create_issue(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    project_id: &str,
) -> Value {
    let response = client
        .post(format!("{address}/projects/{project_id}/issues"))
        .bearer_auth(token)
        .json(&json!({
            "title": "crash on save",
            "description": "stack trace attached",
            "priority": "high",
            "tag": "bug"
        }))
        .send()
        .await
        .expect("create issue request failed");
    assert_eq!(response.status(), 201, "issue creation should succeed");
    response.json().await.unwrap()
}
