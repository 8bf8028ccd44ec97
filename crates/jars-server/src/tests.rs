//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use jars_core::test_utils::MockGateway;
use jars_core::{Database, User};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn seeded_store() -> Store {
    Store::in_memory(Database::seed().unwrap())
}

fn open_config() -> ServerConfig {
    ServerConfig {
        require_auth: false,
        jwt_secret: Some("test-secret".into()),
        ..Default::default()
    }
}

fn setup_test_app() -> Router {
    create_router_with_gateway(seeded_store(), None, open_config(), None)
}

fn setup_gateway_app(gateway: &MockGateway) -> Router {
    create_router_with_gateway(
        seeded_store(),
        None,
        open_config(),
        Some(GatewayClient::new(&gateway.url())),
    )
}

fn setup_secure_app() -> Router {
    let config = ServerConfig {
        require_auth: true,
        ..open_config()
    };
    create_router_with_gateway(seeded_store(), None, config, None)
}

async fn get_body_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn with_token(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    request
}

// ========== Basic API Tests ==========

#[tokio::test]
async fn test_api_test_route() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/test")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["message"], "API is working!");
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/test")).await.unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert!(response.headers().contains_key("content-security-policy"));
}

// ========== Record CRUD Tests ==========

#[tokio::test]
async fn test_list_transactions() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/transactions")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let txs = json.as_array().unwrap();
    assert_eq!(txs.len(), 6);
    assert_eq!(txs[0]["transaction_id"], "tx-001");
}

#[tokio::test]
async fn test_get_record_and_not_found() {
    let app = setup_test_app();

    let response = app.clone().oneshot(get("/api/goals/goal-001")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["name"], "Du lịch Đà Nẵng");

    let response = app.oneshot(get("/api/goals/goal-missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Not found");
}

#[tokio::test]
async fn test_create_transaction_generates_id() {
    let app = setup_test_app();

    let body = json!({
        "transaction_id": "client-chosen",
        "user_id": "user-001",
        "amount": 50000,
        "msg_content": "Grab taxi",
        "tranx_type": "expense"
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/transactions", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    let id = json["transaction_id"].as_str().unwrap().to_string();
    assert!(id.starts_with("tx-"));
    assert_ne!(id, "client-chosen");
    assert_eq!(json["msg_content"], "Grab taxi");
    assert!(json["created_at"].is_string());

    let response = app
        .oneshot(get(&format!("/api/transactions/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_merges_fields() {
    let app = setup_test_app();

    let body = json!({ "current_amount": 3500000, "goal_id": "renamed" });
    let response = app
        .clone()
        .oneshot(json_request("PUT", "/api/goals/goal-001", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["goal_id"], "goal-001");
    assert_eq!(json["current_amount"], 3500000.0);
    assert_eq!(json["target_amount"], 10000000.0);
    assert_eq!(json["name"], "Du lịch Đà Nẵng");

    let response = app
        .oneshot(json_request("PUT", "/api/goals/goal-missing", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_returns_removed_record() {
    let app = setup_test_app();

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/notifications/noti-tx-001")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["notification_id"], "noti-tx-001");

    let response = app
        .oneshot(get("/api/notifications/noti-tx-001"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_json_rejected() {
    let app = setup_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/goals")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Invalid JSON");
}

#[tokio::test]
async fn test_changes_persist_to_data_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("db.json");
    let store = Store::open(&path).unwrap();
    let app = create_router_with_gateway(store, None, open_config(), None);

    let body = json!({ "name": "Laptop", "target_amount": 20000000 });
    let response = app
        .oneshot(json_request("POST", "/api/goals", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let reopened = Store::open(&path).unwrap();
    let goals: Vec<Goal> = reopened.list().unwrap();
    assert_eq!(goals.len(), 2);
    assert!(goals.iter().any(|g| g.name == "Laptop"));
}

// ========== User Tests ==========

#[tokio::test]
async fn test_create_user_hashes_password() {
    let app = setup_test_app();

    let body = json!({ "email": "new@example.com", "full_name": "New", "password": "pw" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/users", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    assert!(json["user_id"].as_str().unwrap().starts_with("user-"));
    assert!(json.get("password").is_none());
    assert!(json.get("password_hash").is_none());

    let response = app
        .oneshot(json_request("POST", "/api/users", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Domain Route Tests ==========

#[tokio::test]
async fn test_classify_transaction_override() {
    let app = setup_test_app();

    let body = json!({ "category_label": "PLY" });
    let response = app
        .clone()
        .oneshot(json_request("PATCH", "/api/transactions/tx-003/classify", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["category_label"], "PLY");
    assert_eq!(json["is_manual_override"], true);

    let body = json!({ "category_label": "XYZ" });
    let response = app
        .clone()
        .oneshot(json_request("PATCH", "/api/transactions/tx-003/classify", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json!({ "category_label": "NEC" });
    let response = app
        .oneshot(json_request("PATCH", "/api/transactions/tx-999/classify", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_classify_description() {
    let app = setup_test_app();

    let body = json!({ "description": "Movie party" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/classify", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["jar"], "PLY");
    assert_eq!(json["name"], "Play");

    let body = json!({ "description": "zzz" });
    let response = app
        .oneshot(json_request("POST", "/api/classify", &body))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["jar"], "NEC");
}

#[tokio::test]
async fn test_update_notification_status() {
    let app = setup_test_app();

    let body = json!({ "status": 1 });
    let response = app
        .clone()
        .oneshot(json_request("PATCH", "/api/notifications/noti-goal-001/status", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], 1);

    let body = json!({ "status": 7 });
    let response = app
        .oneshot(json_request("PATCH", "/api/notifications/noti-goal-001/status", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_jar_summary_for_month() {
    let app = setup_test_app();

    let response = app
        .oneshot(get("/api/jars/summary?month=2024-06"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["month"], "2024-06");
    assert_eq!(json["total_expense"], 6550000.0);
    assert_eq!(json["total_income"], 4000000.0);

    let jars = json["jars"].as_array().unwrap();
    assert_eq!(jars.len(), 6);
    let ply = jars.iter().find(|j| j["jar"] == "PLY").unwrap();
    assert_eq!(ply["spent"], 5000000.0);
    assert_eq!(ply["allowed"], 655000.0);
    assert_eq!(ply["exceeded"], 4345000.0);
    let nec = jars.iter().find(|j| j["jar"] == "NEC").unwrap();
    assert_eq!(nec["spent"], 1350000.0);
    assert_eq!(nec["set_percent"], 55.0);
}

#[tokio::test]
async fn test_jar_summary_empty_month_and_bad_month() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(get("/api/jars/summary?month=2024-07"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total_expense"], 0.0);
    for jar in json["jars"].as_array().unwrap() {
        assert_eq!(jar["actual_percent"], 0.0);
    }

    let response = app
        .oneshot(get("/api/jars/summary?month=june"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_goal_progress() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/goals/progress")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let goals = json.as_array().unwrap();
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0]["percent"], 20.0);
}

// ========== Auth Tests ==========

#[tokio::test]
async fn test_secure_app_requires_token() {
    let app = setup_secure_app();

    let response = app.clone().oneshot(get("/api/transactions")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Authentication required");

    let response = app
        .clone()
        .oneshot(with_token(get("/api/transactions"), "forged"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Public routes stay open
    let response = app.oneshot(get("/api/test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = setup_secure_app();

    let body = json!({ "email": "lan@example.com", "password": "hunter2", "name": "Lan" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/register", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    assert_eq!(json["user"]["full_name"], "Lan");
    assert!(json["user"].get("password_hash").is_none());

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/register", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "User already exists");

    let login = json!({ "email": "lan@example.com", "password": "hunter2" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/login", &login))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let token = json["token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(with_token(get("/api/auth/me"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["email"], "lan@example.com");

    let response = app
        .oneshot(with_token(get("/api/transactions"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_register_creates_one_user() {
    let store = seeded_store();
    let app = create_router_with_gateway(store.clone(), None, open_config(), None);
    let body = json!({ "email": "race@example.com", "password": "pw" });

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let app = app.clone();
            let body = body.clone();
            tokio::spawn(async move {
                app.oneshot(json_request("POST", "/api/auth/register", &body))
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }
    statuses.sort();

    assert_eq!(
        statuses,
        vec![
            StatusCode::CREATED,
            StatusCode::BAD_REQUEST,
            StatusCode::BAD_REQUEST,
            StatusCode::BAD_REQUEST
        ]
    );
    let users = store.list::<User>().unwrap();
    assert_eq!(
        users.iter().filter(|u| u.email == "race@example.com").count(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_user_create_keeps_email_unique() {
    let store = seeded_store();
    let app = create_router_with_gateway(store.clone(), None, open_config(), None);
    let body = json!({ "email": "dup@example.com", "password": "pw" });

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let app = app.clone();
            let body = body.clone();
            tokio::spawn(async move {
                app.oneshot(json_request("POST", "/api/users", &body))
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap() == StatusCode::CREATED {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    let users = store.list::<User>().unwrap();
    assert_eq!(users.iter().filter(|u| u.email == "dup@example.com").count(), 1);
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let app = setup_test_app();

    let login = json!({ "email": "test@example.com", "password": "anything" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/login", &login))
        .await
        .unwrap();
    // Seeded user has no password
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let login = json!({ "email": "nobody@example.com", "password": "x" });
    let response = app
        .oneshot(json_request("POST", "/api/auth/login", &login))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_logout_and_me_without_token() {
    let app = setup_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);

    let response = app.oneshot(get("/api/auth/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ========== Gateway Relay Tests ==========

#[tokio::test]
async fn test_relay_without_gateway_is_unavailable() {
    let app = setup_test_app();

    let response = app
        .oneshot(json_request("POST", "/api/v1/ai/jar/coaching", &json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_relay_injects_user_and_forwards_token() {
    let gateway = MockGateway::start().await;
    let app = setup_gateway_app(&gateway);

    let user = User {
        user_id: "user-042".into(),
        ..Default::default()
    };
    let token = auth::issue_token(&user, "gateway-signed").unwrap();

    let body = json!({
        "pagination": { "page_size": 10, "current": 1 },
        "filters": { "status": 0 },
        "extra": "dropped"
    });
    let request = with_token(
        json_request("POST", "/api/v1/notification/search", &body),
        &token,
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["path"], "/notification/search");
    assert_eq!(json["authorization"], format!("Bearer {}", token));
    assert_eq!(json["body"]["user_id"], "user-042");
    assert_eq!(json["body"]["pagination"]["page_size"], 10);
    assert!(json["body"].get("extra").is_none());
}

#[tokio::test]
async fn test_relay_search_rejects_bad_pagination() {
    let gateway = MockGateway::start().await;
    let app = setup_gateway_app(&gateway);

    let body = json!({ "pagination": { "page_size": "ten", "current": 1 } });
    let response = app
        .oneshot(json_request("POST", "/api/v1/goal/search", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(gateway.requests().is_empty());
}

#[tokio::test]
async fn test_relay_search_requires_pagination() {
    let gateway = MockGateway::start().await;
    let app = setup_gateway_app(&gateway);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/notification/search", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json!({ "filters": "x" });
    let response = app
        .oneshot(json_request("POST", "/api/v1/transaction/search", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "filters must be an object");

    assert!(gateway.requests().is_empty());
}

#[tokio::test]
async fn test_relay_search_accepts_numeric_strings() {
    let gateway = MockGateway::start().await;
    let app = setup_gateway_app(&gateway);

    let body = json!({ "pagination": { "page_size": "10", "current": "1" } });
    let response = app
        .oneshot(json_request("POST", "/api/v1/goal/search", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["body"]["pagination"]["page_size"], "10");
}

#[tokio::test]
async fn test_relay_ids_cannot_escape_their_route() {
    let gateway = MockGateway::start().await;
    let app = setup_gateway_app(&gateway);

    let response = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            "/api/v1/goal/..%2F..%2Fadmin%2Fusers",
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["path"], "/goal/..%2F..%2Fadmin%2Fusers");
    assert_eq!(json["body"]["id"], "../../admin/users");

    let response = app.oneshot(get("/api/v1/auth/..")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests.iter().all(|r| !r.path.starts_with("/admin")));
}

#[tokio::test]
async fn test_relay_passes_upstream_status_through() {
    let gateway = MockGateway::start().await;
    gateway.respond_to("/goal/goal-9", 404, json!({ "detail": "no such goal" }));
    let app = setup_gateway_app(&gateway);

    let response = app
        .oneshot(json_request("PUT", "/api/v1/goal/goal-9", &json!({ "name": "x" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = get_body_json(response).await;
    assert_eq!(json["detail"], "no such goal");

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].body["id"], "goal-9");
    assert_eq!(requests[0].body["name"], "x");
    assert!(requests[0].body["user_id"].is_null());
}

#[tokio::test]
async fn test_relay_jar_get_builds_query() {
    let gateway = MockGateway::start().await;
    let app = setup_gateway_app(&gateway);

    let response = app
        .oneshot(get("/api/v1/jar/NEC?year_month=2024-06"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["method"], "GET");
    assert_eq!(json["path"], "/jar/NEC");
    assert_eq!(json["query"]["year_month"], "2024-06");
}

#[tokio::test]
async fn test_relay_transaction_classify_validates_jar() {
    let gateway = MockGateway::start().await;
    let app = setup_gateway_app(&gateway);

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/api/v1/transaction/tx-1/classify",
            &json!({ "category_label": "ply" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["body"]["category_label"], "PLY");
    assert_eq!(json["body"]["id"], "tx-1");

    let response = app
        .oneshot(json_request(
            "PATCH",
            "/api/v1/transaction/tx-1/classify",
            &json!({ "category_label": "XYZ" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_relay_not_blocked_by_local_auth() {
    let gateway = MockGateway::start().await;
    let config = ServerConfig {
        require_auth: true,
        ..open_config()
    };
    let app = create_router_with_gateway(
        seeded_store(),
        None,
        config,
        Some(GatewayClient::new(&gateway.url())),
    );

    let body = json!({ "username": "a", "password": "b", "by": "email" });
    let response = app
        .oneshot(json_request("POST", "/api/v1/auth/login", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["body"]["username"], "a");
    assert_eq!(json["body"]["by"], "email");
}

#[tokio::test]
async fn test_relay_unreachable_gateway_is_bad_gateway() {
    let app = create_router_with_gateway(
        seeded_store(),
        None,
        open_config(),
        Some(GatewayClient::new("http://127.0.0.1:1")),
    );

    let response = app
        .oneshot(json_request("POST", "/api/v1/qna/session", &json!({ "prompt": "hi" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "API Gateway unavailable");
}
