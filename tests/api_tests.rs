// tests/api_tests.rs

mod common;

use axum::{body::Body, http::Request};
use commentable::{
    config::{CommentsConfig, Config},
    routes,
    state::AppState,
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "test_secret_for_integration_tests";

struct TestApp {
    address: String,
    pool: sqlx::SqlitePool,
    client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn login(&self, name: &str) -> (i64, String) {
        let id = common::create_user(&self.pool, name).await;
        let token = sign_jwt(id, SECRET, 600).expect("Failed to sign token");
        (id, token)
    }
}

fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        comments: CommentsConfig::default(),
    }
}

async fn app_state() -> AppState {
    let ctx = common::setup().await;
    AppState {
        pool: ctx.pool,
        config: test_config(),
        services: ctx.services,
    }
}

/// Helper function to spawn the app on a random port for testing.
async fn spawn_app() -> TestApp {
    let state = app_state().await;
    let pool = state.pool.clone();
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    }
}

async fn post_comment(app: &TestApp, token: &str, post_id: i64, body: &str) -> Value {
    let response = app
        .client
        .post(app.url(&format!("/api/hosts/post/{}/comments", post_id)))
        .bearer_auth(token)
        .json(&json!({ "body": body }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    response.json().await.expect("Failed to parse json")
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = routes::create_router(app_state().await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/random_path_that_does_not_exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn create_and_list_comments() {
    let app = spawn_app().await;
    let (user_id, token) = app.login("ada").await;
    let post = common::create_post(&app.pool).await;

    let created = post_comment(&app, &token, post.id, "This is a test comment.").await;
    assert_eq!(created["comment"]["body"], "This is a test comment.");
    assert_eq!(created["comment"]["author_id"], user_id);
    assert_eq!(created["comment"]["commentable_type"], "post");
    assert_eq!(created["signals"][0]["event"], "commentAdded");
    assert_eq!(created["signals"][1]["data"], "Comment added successfully!");

    let page: Value = app
        .client
        .get(app.url(&format!("/api/hosts/post/{}/comments", post.id)))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();

    assert_eq!(page["total"], 1);
    assert_eq!(page["page"], 1);
    assert_eq!(page["items"][0]["body"], "This is a test comment.");
    assert_eq!(page["items"][0]["author_name"], "ada");
    assert_eq!(page["items"][0]["replies"], json!([]));

    let count: Value = app
        .client
        .get(app.url(&format!("/api/hosts/post/{}/comments/count", post.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn guests_and_bad_tokens_are_rejected() {
    let app = spawn_app().await;
    let post = common::create_post(&app.pool).await;
    let url = app.url(&format!("/api/hosts/post/{}/comments", post.id));

    let guest = app
        .client
        .post(&url)
        .json(&json!({ "body": "Anonymous words" }))
        .send()
        .await
        .unwrap();
    assert_eq!(guest.status().as_u16(), 401);
    let body: Value = guest.json().await.unwrap();
    assert_eq!(body["error"], "You must be logged in to comment.");

    let forged = app
        .client
        .post(&url)
        .bearer_auth("not-a-jwt")
        .json(&json!({ "body": "Forged words" }))
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status().as_u16(), 401);
}

#[tokio::test]
async fn unknown_hosts_are_404() {
    let app = spawn_app().await;
    let (_, token) = app.login("ada").await;

    let missing_post = app
        .client
        .post(app.url("/api/hosts/post/9999/comments"))
        .bearer_auth(&token)
        .json(&json!({ "body": "Into the void" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_post.status().as_u16(), 404);

    let unknown_kind = app
        .client
        .get(app.url("/api/hosts/video/1/comments"))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_kind.status().as_u16(), 404);
}

#[tokio::test]
async fn short_body_reports_field_error() {
    let app = spawn_app().await;
    let (_, token) = app.login("ada").await;
    let post = common::create_post(&app.pool).await;

    let response = app
        .client
        .post(app.url(&format!("/api/hosts/post/{}/comments", post.id)))
        .bearer_auth(&token)
        .json(&json!({ "body": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["body"].is_array());
}

#[tokio::test]
async fn edit_requires_ownership() {
    let app = spawn_app().await;
    let (_, owner) = app.login("owner").await;
    let (_, stranger) = app.login("stranger").await;
    let post = common::create_post(&app.pool).await;

    let created = post_comment(&app, &owner, post.id, "Original text").await;
    let id = created["comment"]["id"].as_i64().unwrap();
    let url = app.url(&format!("/api/comments/{}", id));

    let denied = app
        .client
        .put(&url)
        .bearer_auth(&stranger)
        .json(&json!({ "body": "Defaced" }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status().as_u16(), 403);

    let updated = app
        .client
        .put(&url)
        .bearer_auth(&owner)
        .json(&json!({ "body": "Revised text" }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status().as_u16(), 200);
    let body: Value = updated.json().await.unwrap();
    assert_eq!(body["comment"]["body"], "Revised text");
    assert_eq!(body["signals"][0]["event"], "commentUpdated");

    let shown: Value = app
        .client
        .get(&url)
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(shown["comment"]["body"], "Revised text");
    assert_eq!(shown["can_edit"], false);
    assert_eq!(shown["author_name"], "owner");
}

#[tokio::test]
async fn replies_and_reactions_flow() {
    let app = spawn_app().await;
    let (_, ada) = app.login("ada").await;
    let (_, bob) = app.login("bob").await;
    let post = common::create_post(&app.pool).await;

    let created = post_comment(&app, &ada, post.id, "Parent comment.").await;
    let parent_id = created["comment"]["id"].as_i64().unwrap();

    let reply = app
        .client
        .post(app.url(&format!("/api/comments/{}/replies", parent_id)))
        .bearer_auth(&bob)
        .json(&json!({ "body": "Reply to parent comment." }))
        .send()
        .await
        .unwrap();
    assert_eq!(reply.status().as_u16(), 201);
    let reply: Value = reply.json().await.unwrap();
    assert_eq!(reply["comment"]["parent_id"], parent_id);

    let reactions_url = app.url(&format!("/api/comments/{}/reactions", parent_id));
    let toggled: Value = app
        .client
        .post(&reactions_url)
        .bearer_auth(&bob)
        .json(&json!({ "emoji": ":like:" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["outcome"], "added");
    assert_eq!(toggled["reactions"][":like:"], 1);
    assert_eq!(toggled["signals"][0]["event"], "reactionToggled");

    let rejected = app
        .client
        .post(&reactions_url)
        .bearer_auth(&bob)
        .json(&json!({ "emoji": ":shrug:" }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status().as_u16(), 400);

    let summary: Value = app.client.get(&reactions_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(summary["reactions"], json!({ ":like:": 1 }));

    let page: Value = app
        .client
        .get(app.url(&format!("/api/hosts/post/{}/comments", post.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["replies"][0]["author_name"], "bob");
}

#[tokio::test]
async fn delete_then_purge() {
    let app = spawn_app().await;
    let (_, ada) = app.login("ada").await;
    let post = common::create_post(&app.pool).await;

    let created = post_comment(&app, &ada, post.id, "Short-lived").await;
    let id = created["comment"]["id"].as_i64().unwrap();

    let deleted: Value = app
        .client
        .delete(app.url(&format!("/api/comments/{}", id)))
        .bearer_auth(&ada)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted["signals"][0], json!({ "event": "commentDeleted", "data": id }));

    let gone = app.client.get(app.url(&format!("/api/comments/{}", id))).send().await.unwrap();
    assert_eq!(gone.status().as_u16(), 404);

    let purged: Value = app
        .client
        .delete(app.url(&format!("/api/comments/{}/purge", id)))
        .bearer_auth(&ada)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(purged["removed"], json!([id]));

    let again = app
        .client
        .delete(app.url(&format!("/api/comments/{}/purge", id)))
        .bearer_auth(&ada)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 404);
}
