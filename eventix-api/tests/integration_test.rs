use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use eventix_api::{
    app,
    middleware::issue_token,
    state::{AppState, AuthConfig, HttpConfig},
};
use eventix_catalog::{BroadcastPublisher, CatalogService};
use eventix_core::identity::{IdentityService, IdentitySettings};
use eventix_core::memory::{InMemoryCodeCache, InMemoryStore, RecordingMailer};
use eventix_core::repository::EventRepository;
use eventix_core::{Role, User};
use eventix_order::{OrderHistory, ReservationEngine};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-secret";

struct Harness {
    router: Router,
    store: Arc<InMemoryStore>,
    mailer: Arc<RecordingMailer>,
    state: AppState,
}

fn harness() -> Harness {
    harness_with(HttpConfig::default())
}

fn harness_with(http: HttpConfig) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let catalog_stream = BroadcastPublisher::new(16);

    let identity = IdentityService::new(
        store.clone(),
        Some(Arc::new(InMemoryCodeCache::new())),
        mailer.clone(),
        IdentitySettings { code_ttl_seconds: 900, admin_emails: vec!["boss@example.com".to_string()] },
    );

    let state = AppState {
        identity: Arc::new(identity),
        catalog: Arc::new(CatalogService::new(store.clone(), store.clone(), Arc::new(catalog_stream.clone()))),
        reservations: Arc::new(ReservationEngine::new(store.clone(), store.clone(), store.clone())),
        history: Arc::new(OrderHistory::new(store.clone(), store.clone(), store.clone())),
        catalog_stream,
        auth: AuthConfig { secret: SECRET.to_string(), expiration: 3600 },
        rate_limit: None,
        http,
    };

    Harness { router: app(state.clone()), store, mailer, state }
}

fn token_for(role: Role) -> (Uuid, String) {
    let user = User {
        id: Uuid::new_v4(),
        name: "Test".to_string(),
        email: format!("{}@example.com", role),
        password_hash: String::new(),
        role,
        is_verified: true,
        verify_code: None,
        verify_expires_at: None,
        created_at: Utc::now(),
    };
    let auth = AuthConfig { secret: SECRET.to_string(), expiration: 3600 };
    (user.id, issue_token(&auth, &user).unwrap())
}

async fn send(router: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, value)
}

fn event_body(name: &str, total: i32, price: f64) -> Value {
    json!({
        "name": name,
        "description": "Live on stage",
        "location": "Arena",
        "date": (Utc::now() + Duration::days(30)).to_rfc3339(),
        "total_tickets": total,
        "ticket_price": price
    })
}

const BOUNDARY: &str = "eventix-form-boundary";

/// Text fields plus an optional `image` part as (file name, bytes).
fn multipart_body(fields: &[(&str, String)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n", BOUNDARY, name, value).as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn send_form(router: &Router, method: &str, uri: &str, token: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn form_fields(name: &str, date: String) -> Vec<(&'static str, String)> {
    vec![
        ("name", name.to_string()),
        ("description", "Doors at seven".to_string()),
        ("location", "Hall B".to_string()),
        ("date", date),
        ("total_tickets", "40".to_string()),
        ("ticket_price", "12.5".to_string()),
    ]
}

fn uploads_in(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir.join("uploads")).map(|entries| entries.count()).unwrap_or(0)
}

async fn create_event(h: &Harness, name: &str, total: i32, price: f64) -> Uuid {
    let (_, admin) = token_for(Role::Admin);
    let (status, body) = send(&h.router, "POST", "/api/events", Some(&admin), Some(event_body(name, total, price))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    Uuid::parse_str(body["event"]["id"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let h = harness();
    let (status, body) = send(&h.router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_verify_login() {
    let h = harness();
    let credentials = json!({ "email": "fan@example.com", "password": "s3cret!" });

    let (status, _) = send(&h.router, "POST", "/api/register", None, Some(json!({
        "name": "Fan", "email": "fan@example.com", "password": "s3cret!"
    }))).await;
    assert_eq!(status, StatusCode::CREATED);

    // Unverified accounts cannot log in
    let (status, body) = send(&h.router, "POST", "/api/login", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, _) = send(&h.router, "POST", "/api/verify-email", None, Some(json!({
        "email": "fan@example.com", "code": "000000x"
    }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, code) = h.mailer.sent().pop().unwrap();
    let (status, _) = send(&h.router, "POST", "/api/verify-email", None, Some(json!({
        "email": "fan@example.com", "code": code
    }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&h.router, "POST", "/api/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&h.router, "GET", "/api/orders/my", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = send(&h.router, "POST", "/api/login", None, Some(json!({
        "email": "fan@example.com", "password": "wrong"
    }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");
}

#[tokio::test]
async fn test_duplicate_verified_registration_conflicts() {
    let h = harness();
    let registration = json!({ "name": "Boss", "email": "boss@example.com", "password": "pw" });

    send(&h.router, "POST", "/api/register", None, Some(registration.clone())).await;
    let (_, code) = h.mailer.sent().pop().unwrap();
    send(&h.router, "POST", "/api/verify-email", None, Some(json!({ "email": "boss@example.com", "code": code }))).await;

    let (status, body) = send(&h.router, "POST", "/api/register", None, Some(registration)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn test_catalog_requires_admin() {
    let h = harness();
    let (_, user) = token_for(Role::User);

    let (status, _) = send(&h.router, "POST", "/api/events", None, Some(event_body("Gig", 10, 5.0))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&h.router, "POST", "/api/events", Some(&user), Some(event_body("Gig", 10, 5.0))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, _) = send(&h.router, "POST", "/api/events", Some("not-a-jwt"), Some(event_body("Gig", 10, 5.0))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_catalog_crud_and_search() {
    let h = harness();
    let (_, admin) = token_for(Role::Admin);
    let mut changes = h.state.catalog_stream.subscribe();

    let id = create_event(&h, "Jazz Evening", 50, 20.0).await;
    create_event(&h, "Rock Night", 50, 30.0).await;
    assert_eq!(changes.recv().await.unwrap().name(), "event_created");

    let (status, body) = send(&h.router, "GET", "/api/events?search=jazz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(&h.router, "GET", &format!("/api/events/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_tickets"], 50);

    let (status, body) = send(&h.router, "PUT", &format!("/api/events/{}", id), Some(&admin), Some(json!({
        "name": "Jazz Evening II",
        "location": "Club",
        "date": (Utc::now() + Duration::days(40)).to_rfc3339(),
        "ticket_price": 25.0,
        "available_tickets": 1000
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["name"], "Jazz Evening II");
    assert_eq!(body["event"]["available_tickets"], 50);

    let (status, _) = send(&h.router, "DELETE", &format!("/api/events/{}", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&h.router, "GET", &format!("/api/events/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = send(&h.router, "GET", "/api/events/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reservation_scenario_over_http() {
    let h = harness();
    let id = create_event(&h, "Summer Fest", 10, 50.0).await;
    let (_, user_a) = token_for(Role::User);
    let (_, user_b) = token_for(Role::User);

    let (status, body) = send(&h.router, "POST", "/api/tickets/order", Some(&user_a), Some(json!({
        "event_id": id.to_string(), "quantity": 3
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_price"], 150.0);
    assert_eq!(body["quantity"], 3);
    assert_eq!(body["event_name"], "Summer Fest");
    assert_eq!(body["ticket_price"], 50.0);

    let (status, body) = send(&h.router, "POST", "/api/tickets/order", Some(&user_b), Some(json!({
        "event_id": id.to_string(), "quantity": 8
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "insufficient_inventory");
    assert_eq!(h.store.find_event(id).await.unwrap().unwrap().available_tickets, 7);

    let (status, _) = send(&h.router, "POST", "/api/tickets/order", Some(&user_b), Some(json!({
        "event_id": id.to_string(), "quantity": 7
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.store.find_event(id).await.unwrap().unwrap().available_tickets, 0);

    let (status, body) = send(&h.router, "GET", "/api/orders/my", Some(&user_a), None).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["event_name"], "Summer Fest");
    assert_eq!(orders[0]["status"], "pending");
    assert_eq!(orders[0]["total_price"], 150.0);
}

#[tokio::test]
async fn test_reservation_rejections() {
    let h = harness();
    let id = create_event(&h, "Small Room", 5, 10.0).await;
    let (_, user) = token_for(Role::User);

    let (status, _) = send(&h.router, "POST", "/api/tickets/order", None, Some(json!({
        "event_id": id.to_string(), "quantity": 1
    }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for quantity in [0, -2] {
        let (status, body) = send(&h.router, "POST", "/api/tickets/order", Some(&user), Some(json!({
            "event_id": id.to_string(), "quantity": quantity
        }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
    }

    let (status, body) = send(&h.router, "POST", "/api/tickets/order", Some(&user), Some(json!({
        "event_id": "garbage", "quantity": 1
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");

    let (status, _) = send(&h.router, "POST", "/api/tickets/order", Some(&user), Some(json!({
        "event_id": Uuid::new_v4().to_string(), "quantity": 1
    }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&h.router, "POST", "/api/tickets/order", Some(&user), Some(json!({
        "quantity": 1
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");

    assert_eq!(h.store.find_event(id).await.unwrap().unwrap().available_tickets, 5);
    assert_eq!(h.store.ticket_count(), 0);
}

#[tokio::test]
async fn test_delete_blocked_after_sale() {
    let h = harness();
    let (_, admin) = token_for(Role::Admin);
    let (_, user) = token_for(Role::User);
    let id = create_event(&h, "Sold Show", 5, 10.0).await;

    send(&h.router, "POST", "/api/tickets/order", Some(&user), Some(json!({
        "event_id": id.to_string(), "quantity": 1
    }))).await;

    let (status, body) = send(&h.router, "DELETE", &format!("/api/events/{}", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_http_orders_never_oversell() {
    let h = harness();
    let id = create_event(&h, "Tiny Venue", 5, 8.0).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let router = h.router.clone();
            let (_, token) = token_for(Role::User);
            tokio::spawn(async move {
                send(&router, "POST", "/api/tickets/order", Some(&token), Some(json!({
                    "event_id": id.to_string(), "quantity": 1
                })))
                .await
                .0
            })
        })
        .collect();

    let mut ok = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::BAD_REQUEST => rejected += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(ok, 5);
    assert_eq!(rejected, 15);
    assert_eq!(h.store.find_event(id).await.unwrap().unwrap().available_tickets, 0);
    assert_eq!(h.store.order_count(), 5);
}

#[tokio::test]
async fn test_catalog_stream_is_event_stream() {
    let h = harness();
    let response = h
        .router
        .clone()
        .oneshot(Request::builder().uri("/api/events/stream").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
}

#[tokio::test]
async fn test_event_image_upload() {
    let dir = std::env::temp_dir().join(format!("eventix-static-{}", Uuid::new_v4()));
    let h = harness_with(HttpConfig {
        allowed_origins: Vec::new(),
        static_dir: Some(dir.to_string_lossy().to_string()),
    });
    let (_, admin) = token_for(Role::Admin);
    let future = (Utc::now() + Duration::days(20)).to_rfc3339();
    let poster: &[u8] = b"\x89PNG fake poster";

    let body = multipart_body(&form_fields("Poster Night", future.clone()), Some(("my poster.png", poster)));
    let (status, body) = send_form(&h.router, "POST", "/api/events", &admin, body).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["event"]["total_tickets"], 40);
    assert_eq!(body["event"]["ticket_price"], 12.5);
    let image_url = body["event"]["image_url"].as_str().unwrap().to_string();
    assert!(image_url.starts_with("/static/uploads/"));
    assert!(image_url.ends_with("_my_poster.png"));
    let id = body["event"]["id"].as_str().unwrap().to_string();

    // Served back from the static directory
    let response = h.router.clone()
        .oneshot(Request::builder().uri(&image_url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&served[..], poster);

    // A replacement image on update; inventory stays put
    let mut fields = form_fields("Poster Night", future.clone());
    fields.push(("available_tickets", "1".to_string()));
    let body = multipart_body(&fields, Some(("new.jpg", &b"jpeg bytes"[..])));
    let (status, body) = send_form(&h.router, "PUT", &format!("/api/events/{}", id), &admin, body).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["event"]["image_url"].as_str().unwrap().ends_with("_new.jpg"));
    assert_eq!(body["event"]["available_tickets"], 40);
    assert_eq!(uploads_in(&dir), 2);

    // Rejected drafts leave no file behind
    let past = (Utc::now() - Duration::days(1)).to_rfc3339();
    let body = multipart_body(&form_fields("Too Late", past), Some(("late.png", poster)));
    let (status, body) = send_form(&h.router, "POST", "/api/events", &admin, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");
    assert_eq!(uploads_in(&dir), 2);

    let body = multipart_body(&form_fields("Script", future), Some(("run.sh", &b"#!/bin/sh"[..])));
    let (status, _) = send_form(&h.router, "POST", "/api/events", &admin, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_multipart_without_image_or_static_dir() {
    let h = harness();
    let (_, admin) = token_for(Role::Admin);
    let future = (Utc::now() + Duration::days(20)).to_rfc3339();

    let body = multipart_body(&form_fields("Plain Form", future.clone()), None);
    let (status, body) = send_form(&h.router, "POST", "/api/events", &admin, body).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["event"]["image_url"], Value::Null);

    let body = multipart_body(&form_fields("With Poster", future), Some(("p.png", &b"png"[..])));
    let (status, body) = send_form(&h.router, "POST", "/api/events", &admin, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");
    assert_eq!(h.store.list_events(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_openapi_document() {
    let h = harness();
    let (status, body) = send(&h.router, "GET", "/api-docs/openapi.json", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Eventix API");
    assert!(body["paths"]["/api/tickets/order"]["post"].is_object());
    assert!(body["paths"]["/api/events/{id}"]["delete"].is_object());
    assert!(body["components"]["schemas"]["ErrorBody"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer"].is_object());
}
