use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::{ConnectionTrait, Database, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Engine, SqlStore};
use server::{ServerState, router};

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for user in ["alice", "bob"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![user.into(), "secret".into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder()
        .store(SqlStore::new(db.clone()))
        .build()
        .unwrap();
    router(ServerState {
        engine: Arc::new(engine),
        db,
    })
}

fn basic(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

async fn call(app: &Router, user: &str, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic(user, "secret"));
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn rejects_missing_or_wrong_credentials() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(Request::get("/wallets").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::get("/wallets")
                .header(header::AUTHORIZATION, basic("alice", "wrong"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn transaction_lifecycle_over_http() {
    let app = app().await;

    let (status, wallet) = call(
        &app,
        "alice",
        "POST",
        "/wallets",
        Some(json!({ "name": "Main", "balance_minor": 100_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let wallet_id = wallet["id"].as_str().unwrap().to_string();

    let (status, theme) = call(
        &app,
        "alice",
        "POST",
        &format!("/wallets/{wallet_id}/themes"),
        Some(json!({ "name": "Food", "max_budget_minor": 25_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let theme_id = theme["id"].as_str().unwrap().to_string();

    let (status, created) = call(
        &app,
        "alice",
        "POST",
        "/transactions",
        Some(json!({
            "wallet_id": wallet_id,
            "theme_id": theme_id,
            "description": "groceries",
            "amount_minor": 20_000,
            "kind": "expense",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        created["steps"],
        json!(["insert_transaction", "apply_wallet", "apply_theme"])
    );
    assert_eq!(created["wallets"][0]["amount_minor"], 80_000);
    let tx_id = created["transaction"]["id"].as_str().unwrap().to_string();

    let (status, updated) = call(
        &app,
        "alice",
        "PATCH",
        &format!("/transactions/{tx_id}"),
        Some(json!({ "amount_minor": 30_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["themes"][0]["amount_minor"], 30_000);

    let (_, theme) = call(&app, "alice", "GET", &format!("/themes/{theme_id}"), None).await;
    assert_eq!(theme["current_spent_minor"], 30_000);
    assert_eq!(theme["remaining_minor"], -5_000);
    assert_eq!(theme["over_budget"], true);

    let (status, listed) = call(
        &app,
        "alice",
        "GET",
        &format!("/transactions?wallet_id={wallet_id}&kind=expense"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["transactions"].as_array().unwrap().len(), 1);

    let (status, summary) = call(&app, "alice", "GET", "/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_balance_minor"], 70_000);
    assert_eq!(summary["expense_minor"], 30_000);
    assert_eq!(summary["by_theme"][0]["name"], "Food");

    let (status, deleted) = call(
        &app,
        "alice",
        "DELETE",
        &format!("/transactions/{tx_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["wallets"][0]["amount_minor"], 100_000);
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let app = app().await;
    let (_, wallet) = call(
        &app,
        "alice",
        "POST",
        "/wallets",
        Some(json!({ "name": "Main" })),
    )
    .await;
    let wallet_id = wallet["id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, "bob", "GET", &format!("/wallets/{wallet_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        "alice",
        "POST",
        "/transactions",
        Some(json!({
            "wallet_id": wallet_id,
            "description": "rent",
            "amount_minor": 1_000,
            "kind": "expense",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("theme"));

    let (status, _) = call(
        &app,
        "alice",
        "POST",
        "/transactions",
        Some(json!({
            "wallet_id": wallet_id,
            "description": "refund",
            "amount_minor": -5,
            "kind": "income",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        "alice",
        "PATCH",
        &format!("/wallets/{wallet_id}"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_a_wallet_cascades() {
    let app = app().await;
    let (_, wallet) = call(
        &app,
        "alice",
        "POST",
        "/wallets",
        Some(json!({ "name": "Main", "balance_minor": 500 })),
    )
    .await;
    let wallet_id = wallet["id"].as_str().unwrap().to_string();
    let (_, theme) = call(
        &app,
        "alice",
        "POST",
        &format!("/wallets/{wallet_id}/themes"),
        Some(json!({ "name": "Fun", "max_budget_minor": 100 })),
    )
    .await;
    let theme_id = theme["id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, "alice", "DELETE", &format!("/wallets/{wallet_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, "alice", "GET", &format!("/themes/{theme_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, wallets) = call(&app, "alice", "GET", "/wallets", None).await;
    assert_eq!(wallets, json!([]));
}
