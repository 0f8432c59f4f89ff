mod common;

use common::{register_and_login, registration_payload, spawn_app};
use serde_json::{Value, json};

/// Registers a user with explicit consent flags.
async fn register_with_flags(
    client: &reqwest::Client,
    address: &str,
    username: &str,
    can_be_contacted: bool,
    can_data_be_shared: bool,
) {
    let mut payload = registration_payload(username);
    payload["can_be_contacted"] = json!(can_be_contacted);
    payload["can_data_be_shared"] = json!(can_data_be_shared);
    let response = client
        .post(format!("{address}/users"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
}

/// Fetches the user listing and returns the entry for `username`.
async fn listed_entry(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    username: &str,
) -> Value {
    let users: Vec<Value> = client
        .get(format!("{address}/users"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    users
        .into_iter()
        .find(|u| u["username"] == username)
        .expect("user should be listed")
}

#[tokio::test]
async fn contactable_user_exposes_email_and_age() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &app.address, "viewer").await;
    register_with_flags(&client, &app.address, "open", true, true).await;

    let entry = listed_entry(&client, &app.address, &token, "open").await;
    assert_eq!(entry["email"], "open@example.com");
    assert_eq!(entry["age"], 30);
    assert_eq!(entry["can_be_contacted"], true);
}

#[tokio::test]
async fn non_contactable_user_hides_email_only() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &app.address, "viewer").await;
    register_with_flags(&client, &app.address, "nomail", false, true).await;

    let entry = listed_entry(&client, &app.address, &token, "nomail").await;
    assert!(entry.get("email").is_none());
    assert_eq!(entry["age"], 30);
    assert_eq!(entry["can_be_contacted"], false);
}

#[tokio::test]
async fn fully_private_user_hides_email_age_and_contact_flag() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &app.address, "viewer").await;
    register_with_flags(&client, &app.address, "ghost", true, false).await;

    let entry = listed_entry(&client, &app.address, &token, "ghost").await;
    assert!(entry.get("email").is_none());
    assert!(entry.get("age").is_none());
    assert!(entry.get("can_be_contacted").is_none());
    assert_eq!(entry["username"], "ghost");
    assert_eq!(entry["can_data_be_shared"], false);
}

#[tokio::test]
async fn single_user_view_applies_the_same_rules() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &app.address, "viewer").await;
    register_with_flags(&client, &app.address, "ghost", false, false).await;

    let ghost = listed_entry(&client, &app.address, &token, "ghost").await;
    let entry: Value = client
        .get(format!("{}/users/{}", app.address, ghost["id"].as_str().unwrap()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(entry.get("email").is_none());
    assert!(entry.get("age").is_none());
    assert!(entry.get("can_be_contacted").is_none());
}

#[tokio::test]
async fn account_update_is_self_only() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (alice_id, _) = register_and_login(&client, &app.address, "alice").await;
    let (_, bob_token) = register_and_login(&client, &app.address, "bob").await;

    // bob may not touch alice's account.
    let response = client
        .put(format!("{}/users/{}", app.address, alice_id))
        .bearer_auth(&bob_token)
        .json(&json!({ "username": "stolen" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // alice updates herself; flipping the flags changes her serialization.
    let (_, alice_token) = {
        let response = client
            .post(format!("{}/login", app.address))
            .json(&json!({
                "username": "alice",
                "password": "correct horse battery staple"
            }))
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        (alice_id, body["access"].as_str().unwrap().to_string())
    };

    let response = client
        .put(format!("{}/users/{}", app.address, alice_id))
        .bearer_auth(&alice_token)
        .json(&json!({ "age": 31, "can_data_be_shared": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert!(updated.get("age").is_none(), "now fully private");

    // Underage updates are rejected like underage registrations.
    let response = client
        .put(format!("{}/users/{}", app.address, alice_id))
        .bearer_auth(&alice_token)
        .json(&json!({ "age": 12 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn account_delete_is_self_only_and_cascades() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (alice_id, alice_token) = register_and_login(&client, &app.address, "alice").await;
    let (bob_id, bob_token) = register_and_login(&client, &app.address, "bob").await;

    // alice owns a project; bob may not delete her account.
    let project = common::create_project(&client, &app.address, &alice_token, "tracker", &[bob_id])
        .await;
    let response = client
        .delete(format!("{}/users/{}", app.address, alice_id))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Self-delete succeeds and takes the authored project with it.
    let response = client
        .delete(format!("{}/users/{}", app.address, alice_id))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!(
            "{}/projects/{}",
            app.address,
            project["id"].as_str().unwrap()
        ))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
