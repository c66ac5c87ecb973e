mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use cinema_checkout::{controllers, AppState};

use common::{test_config, FakeCinemaApi, USER_ID};

fn state_and_app(api: Arc<FakeCinemaApi>, limit: usize) -> (Arc<AppState>, Router) {
    let mut config = test_config();
    config.checkout.session_limit = limit;
    let state = AppState::with_api(config, api);
    (state.clone(), controllers::app(state))
}

fn app_with(api: Arc<FakeCinemaApi>, limit: usize) -> Router {
    state_and_app(api, limit).1
}

fn app() -> Router {
    app_with(Arc::new(FakeCinemaApi::scenario()), 8)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-user-id", USER_ID)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

async fn open(app: &Router) -> String {
    let (status, body) = send(app, json_request("POST", "/api/checkouts", json!({"showtimeId": 5}))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_root() {
    let app = app();
    let response = app.clone().oneshot(empty_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.oneshot(empty_request("GET", "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn open_returns_the_loaded_checkout() {
    let app = app();
    let (status, body) = send(&app, json_request("POST", "/api/checkouts", json!({"showtimeId": 5}))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["showtimeId"], 5);
    assert_eq!(body["step"], "select_seats");
    assert_eq!(body["stepIndex"], 0);
    assert_eq!(body["error"], Value::Null);
    assert_eq!(body["movie"]["title"], "Mai");
    assert_eq!(body["seatMap"]["columns"], json!([1, 2]));

    let cells = &body["seatMap"]["rows"][0]["cells"];
    assert_eq!(cells[0]["label"], "A1");
    assert_eq!(cells[0]["status"], "available");
    assert_eq!(cells[0]["price"], 70_000);
    assert_eq!(cells[1]["status"], "sold");
    assert_eq!(body["totalDisplay"], "0 ₫");
}

#[tokio::test]
async fn full_checkout_over_http() {
    let app = app();
    let id = open(&app).await;

    let (status, body) = send(
        &app,
        json_request("PATCH", &format!("/api/checkouts/{id}/seats"), json!({"seatId": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "selected");
    assert_eq!(body["checkout"]["total"], 70_000);
    assert_eq!(body["checkout"]["selectedSeats"], json!(["A1"]));

    let (_, body) = send(
        &app,
        json_request("PATCH", &format!("/api/checkouts/{id}/seats"), json!({"seatId": 2})),
    )
    .await;
    assert_eq!(body["outcome"], "unavailable");

    let (status, body) = send(
        &app,
        json_request("PATCH", &format!("/api/checkouts/{id}/payment-method"), json!({"method": "cash"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentMethod"], "cash");

    for expected in ["select_payment", "confirm", "success"] {
        let (status, body) = send(&app, empty_request("POST", &format!("/api/checkouts/{id}/next"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step"], expected);
    }

    let (_, body) = send(&app, empty_request("GET", &format!("/api/checkouts/{id}"))).await;
    assert_eq!(body["step"], "success");
    assert_eq!(body["confirmation"]["booking"]["id"], 100);
    assert_eq!(body["confirmation"]["paymentCompleted"], true);
    assert_eq!(body["confirmation"]["draft"]["paymentMethod"], "cash");
    assert_eq!(body["totalDisplay"], "70.000 ₫");
}

#[tokio::test]
async fn next_without_seats_is_unprocessable() {
    let app = app();
    let id = open(&app).await;

    let (status, body) = send(&app, empty_request("POST", &format!("/api/checkouts/{id}/next"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Please select at least one seat.");
    assert_eq!(body["checkout"]["step"], "select_seats");
    assert_eq!(body["checkout"]["error"]["fatal"], false);
}

#[tokio::test]
async fn booking_failure_is_bad_gateway() {
    let api = Arc::new(FakeCinemaApi::scenario());
    api.fail_with_message(common::Call::CreateBooking, "Seat A1 was just taken");
    let app = app_with(api, 8);
    let id = open(&app).await;

    send(&app, json_request("PATCH", &format!("/api/checkouts/{id}/seats"), json!({"seatId": 1}))).await;
    send(&app, empty_request("POST", &format!("/api/checkouts/{id}/next"))).await;
    send(&app, empty_request("POST", &format!("/api/checkouts/{id}/next"))).await;

    let (status, body) = send(&app, empty_request("POST", &format!("/api/checkouts/{id}/next"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "Seat A1 was just taken");
    assert_eq!(body["checkout"]["step"], "confirm");
    assert_eq!(body["checkout"]["error"]["fatal"], true);
}

#[tokio::test]
async fn back_and_navigate() {
    let app = app();
    let id = open(&app).await;

    send(&app, json_request("PATCH", &format!("/api/checkouts/{id}/seats"), json!({"seatId": 1}))).await;
    send(&app, empty_request("POST", &format!("/api/checkouts/{id}/next"))).await;

    let (_, body) = send(&app, empty_request("POST", &format!("/api/checkouts/{id}/back"))).await;
    assert_eq!(body["step"], "select_seats");

    let (status, body) = send(
        &app,
        json_request("POST", &format!("/api/checkouts/{id}/navigate"), json!({"target": "profile"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"]["path"], "/profile");
    assert_eq!(body["redirect"]["route"]["screen"], "profile");
}

fn anonymous_open() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/checkouts")
        .header("content-type", "application/json")
        .body(Body::from(json!({"showtimeId": 5}).to_string()))
        .unwrap()
}

#[tokio::test]
async fn anonymous_checkout_is_sent_to_login() {
    let api = Arc::new(FakeCinemaApi::scenario());
    let (state, app) = state_and_app(api.clone(), 8);

    let (status, body) = send(&app, anonymous_open()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Please log in to book tickets.");
    assert_eq!(body["checkout"]["error"]["fatal"], true);
    assert_eq!(body["checkout"]["redirect"]["path"], "/login?redirect=/booking/5");
    assert_eq!(body["checkout"].get("id"), None);
    assert!(api.calls().is_empty());
    assert!(state.checkouts.is_empty().await);
}

#[tokio::test]
async fn anonymous_checkouts_do_not_use_up_the_limit() {
    let (state, app) = state_and_app(Arc::new(FakeCinemaApi::scenario()), 2);

    for _ in 0..5 {
        let (status, _) = send(&app, anonymous_open()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    open(&app).await;
    open(&app).await;
    assert_eq!(state.checkouts.len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn idle_checkouts_are_swept_and_free_their_slot() {
    let (state, app) = state_and_app(Arc::new(FakeCinemaApi::scenario()), 1);
    open(&app).await;

    let (status, _) = send(&app, json_request("POST", "/api/checkouts", json!({"showtimeId": 5}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // в тестовом конфиге TTL 60с, очистка раз в 15с
    tokio::time::sleep(Duration::from_secs(90)).await;
    assert!(state.checkouts.is_empty().await);

    open(&app).await;
    assert_eq!(state.checkouts.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn active_checkouts_survive_the_sweeper() {
    let (state, app) = state_and_app(Arc::new(FakeCinemaApi::scenario()), 4);
    let id = open(&app).await;

    for _ in 0..6 {
        tokio::time::sleep(Duration::from_secs(30)).await;
        let (status, _) = send(&app, empty_request("GET", &format!("/api/checkouts/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(state.checkouts.len().await, 1);
}

#[tokio::test]
async fn stale_next_is_a_conflict() {
    let api = Arc::new(FakeCinemaApi::scenario());
    let app = app_with(api.clone(), 8);
    let id = open(&app).await;
    let next = format!("/api/checkouts/{id}/next");

    send(&app, json_request("PATCH", &format!("/api/checkouts/{id}/seats"), json!({"seatId": 1}))).await;
    let (status, _) = send(&app, json_request("POST", &next, json!({"expectedStep": "select_seats"}))).await;
    assert_eq!(status, StatusCode::OK);

    // двойной клик отправляет тот же шаг дважды
    let (status, body) = send(&app, json_request("POST", &next, json!({"expectedStep": "select_payment"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "confirm");

    let (status, body) = send(&app, json_request("POST", &next, json!({"expectedStep": "select_payment"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["checkout"]["step"], "confirm");
    assert!(api.drafts().is_empty());
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let app = app();
    let (status, _) = send(&app, json_request("POST", "/api/checkouts", json!({"showtimeId": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = open(&app).await;
    let (status, _) = send(
        &app,
        json_request("PATCH", &format!("/api/checkouts/{id}/seats"), json!({"seatId": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_and_closed_checkouts_are_not_found() {
    let app = app();
    let (status, body) = send(
        &app,
        empty_request("GET", "/api/checkouts/00000000-0000-0000-0000-000000000000"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Checkout not found");

    let id = open(&app).await;
    let (status, _) = send(&app, empty_request("DELETE", &format!("/api/checkouts/{id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, empty_request("GET", &format!("/api/checkouts/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, empty_request("DELETE", &format!("/api/checkouts/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_limit_is_enforced() {
    let app = app_with(Arc::new(FakeCinemaApi::scenario()), 1);
    open(&app).await;

    let (status, body) = send(&app, json_request("POST", "/api/checkouts", json!({"showtimeId": 5}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}
