use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use server::{ServerState, router};

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    router(ServerState {
        engine: Arc::new(engine),
    })
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", "alice");
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn new_wallet(app: &Router, name: &str) -> String {
    let (status, body) = call(app, "POST", "/wallets", Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn missing_identity_is_rejected() {
    let app = app().await;
    let request = Request::builder()
        .uri("/wallets")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn income_then_expense_updates_wallet() {
    let app = app().await;
    let wallet_id = new_wallet(&app, "Cash").await;

    let (status, body) = call(
        &app,
        "POST",
        "/transactions",
        Some(json!({ "type": "income", "amount": 20000, "walletId": wallet_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["type"], json!("income"));

    let (status, _) = call(
        &app,
        "POST",
        "/transactions",
        Some(json!({
            "type": "expense",
            "amount": 5000,
            "walletId": wallet_id,
            "category": "food",
            "date": "2024-03-01T12:00:00+02:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(&app, "GET", &format!("/wallets/{wallet_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amount"], json!(15000));
    assert_eq!(body["data"]["totalIncome"], json!(20000));
    assert_eq!(body["data"]["totalExpenses"], json!(5000));

    let (_, body) = call(&app, "GET", "/summary", None).await;
    assert_eq!(body["data"]["amount"], json!(15000));
    assert_eq!(body["data"]["wallets"], json!(1));

    let (_, body) = call(&app, "GET", &format!("/wallets/{wallet_id}/audit"), None).await;
    assert_eq!(body["data"]["consistent"], json!(true));
}

#[tokio::test]
async fn overspending_answers_422_with_envelope() {
    let app = app().await;
    let wallet_id = new_wallet(&app, "Cash").await;

    let (status, body) = call(
        &app,
        "POST",
        "/transactions",
        Some(json!({ "type": "expense", "amount": 100, "walletId": wallet_id, "category": "rent" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], json!(false));
    assert!(body["message"].as_str().unwrap().contains("Insufficient balance"));

    let (_, body) = call(&app, "GET", "/transactions", None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn missing_type_answers_422() {
    let app = app().await;
    let wallet_id = new_wallet(&app, "Cash").await;

    let (status, body) = call(
        &app,
        "POST",
        "/transactions",
        Some(json!({ "amount": 100, "walletId": wallet_id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn delete_transaction_needs_its_wallet() {
    let app = app().await;
    let wallet_id = new_wallet(&app, "Cash").await;

    let (_, body) = call(
        &app,
        "POST",
        "/transactions",
        Some(json!({ "type": "income", "amount": 700, "walletId": wallet_id })),
    )
    .await;
    let tx_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, "DELETE", &format!("/transactions/{tx_id}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "DELETE",
        &format!("/transactions/{tx_id}?walletId={wallet_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!(tx_id));

    let (status, _) = call(&app, "GET", &format!("/transactions/{tx_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, "GET", &format!("/wallets/{wallet_id}"), None).await;
    assert_eq!(body["data"]["amount"], json!(0));
    assert_eq!(body["data"]["totalIncome"], json!(0));
}

#[tokio::test]
async fn deleting_a_wallet_removes_its_transactions() {
    let app = app().await;
    let wallet_id = new_wallet(&app, "Cash").await;
    for amount in [100, 200, 300] {
        call(
            &app,
            "POST",
            "/transactions",
            Some(json!({ "type": "income", "amount": amount, "walletId": wallet_id })),
        )
        .await;
    }

    let (status, body) = call(&app, "DELETE", &format!("/wallets/{wallet_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removedTransactions"], json!(3));

    let (_, body) = call(&app, "GET", "/wallets", None).await;
    assert_eq!(body["data"], json!([]));
    let (_, body) = call(&app, "GET", "/transactions", None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn other_owners_wallets_are_not_found() {
    let app = app().await;
    let wallet_id = new_wallet(&app, "Cash").await;

    let request = Request::builder()
        .uri(format!("/wallets/{wallet_id}"))
        .header("x-user-id", "bob")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
