//! REST 接口测试
//!
//! 通过 `tower::ServiceExt::oneshot` 直接驱动路由，不启动真实监听端口。

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use rule_engine::api::{self, AppState};
use rule_engine::{EngineSettings, RuleService, RuleStore};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn create_app() -> Router {
    let service = RuleService::new(Arc::new(RuleStore::new()));
    api::router(AppState::new(Arc::new(service)))
}

fn create_traced_app() -> Router {
    let settings = EngineSettings {
        trace_enabled: true,
        ..Default::default()
    };
    let service = RuleService::with_settings(Arc::new(RuleStore::new()), settings);
    api::router(AppState::new(Arc::new(service)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

async fn create(app: &Router, rule: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/rules/create",
        Some(json!({"rule_string": rule})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {}", body);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = create_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_create_rule() {
    let app = create_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/create",
        Some(json!({"rule_string": "age > 30 AND department = 'Sales'"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["rule_string"], "age > 30 AND department = 'Sales'");
    assert_eq!(body["data"]["ast"]["type"], "operator");
    assert_eq!(body["data"]["ast"]["operator"], "AND");
    assert_eq!(body["data"]["ast"]["right"]["value"], "Sales");
}

#[tokio::test]
async fn test_create_rule_validation() {
    let app = create_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/create",
        Some(json!({"rule_string": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/create",
        Some(json!({"rule_string": "age >"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "SYNTAX_ERROR");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_combine_rules() {
    let app = create_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/combine",
        Some(json!({"rule_strings": ["age > 30", "department = HR", "salary > 50000"]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ast = &body["data"];
    assert_eq!(ast["operator"], "AND");
    assert_eq!(ast["left"]["attribute"], "age");
    assert_eq!(ast["right"]["operator"], "AND");
    assert_eq!(ast["right"]["right"]["attribute"], "salary");
}

#[tokio::test]
async fn test_combine_empty_list() {
    let app = create_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/combine",
        Some(json!({"rule_strings": []})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALUE_ERROR");
}

#[tokio::test]
async fn test_evaluate_rule() {
    let app = create_app();
    let id = create(&app, "age > 30 AND department = 'Sales'").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/evaluate",
        Some(json!({"rule_id": id, "data": {"age": 35, "department": "Sales"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"], true);

    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/evaluate",
        Some(json!({"rule_id": id, "data": {"age": 20, "department": "Sales"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"], false);
}

#[tokio::test]
async fn test_evaluate_missing_rule_and_field() {
    let app = create_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/evaluate",
        Some(json!({"rule_id": "does-not-exist", "data": {"age": 35}})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "RULE_NOT_FOUND");

    let id = create(&app, "bonus > 100").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/evaluate",
        Some(json!({"rule_id": id, "data": {"age": 35}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "EVALUATION_ERROR");
}

#[tokio::test]
async fn test_evaluate_rejects_non_object_data() {
    let app = create_app();
    let id = create(&app, "age > 30").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/evaluate",
        Some(json!({"rule_id": id, "data": [1, 2, 3]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_evaluate_combined_ast() {
    let app = create_app();
    let (_, body) = send(
        &app,
        "POST",
        "/api/rules/combine",
        Some(json!({"rule_strings": [
            "age > 30 AND department = 'Sales'",
            "age < 25 AND department = 'Marketing'"
        ]})),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/evaluate-ast",
        Some(json!({"ast": body["data"], "data": {"age": 35, "department": "Sales"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"], false);
}

#[tokio::test]
async fn test_evaluate_ast_unsupported_operator() {
    let app = create_app();
    let ast = json!({"type": "operand", "attribute": "age", "operator": "<>", "value": 30});

    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/evaluate-ast",
        Some(json!({"ast": ast, "data": {"age": 35}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "EVALUATION_ERROR");
}

#[tokio::test]
async fn test_evaluate_ast_malformed_tree() {
    let app = create_app();
    let ast = json!({"type": "operator", "operator": "AND", "left": {}});

    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/evaluate-ast",
        Some(json!({"ast": ast, "data": {"age": 35}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "SERIALIZATION_ERROR");
}

#[tokio::test]
async fn test_evaluate_with_trace() {
    let app = create_traced_app();
    let id = create(&app, "age > 30 OR department = HR").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/evaluate",
        Some(json!({"rule_id": id, "data": {"age": 35, "department": "Sales"}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"], true);
    assert_eq!(body["data"]["matched_conditions"], json!(["age > 30"]));
    assert_eq!(body["data"]["evaluation_trace"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_list_get_delete() {
    let app = create_app();
    let id = create(&app, "age > 30").await;
    create(&app, "department = HR").await;

    let (status, body) = send(&app, "GET", "/api/rules", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", &format!("/api/rules/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rule_string"], "age > 30");

    let (status, _) = send(&app, "DELETE", &format!("/api/rules/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", &format!("/api/rules/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "RULE_NOT_FOUND");

    let (status, _) = send(&app, "DELETE", &format!("/api/rules/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_rules_are_rejected() {
    let app = create_app();

    let rule = "a = 1 AND ".repeat(200_000) + "a = 1";
    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/create",
        Some(json!({"rule_string": rule})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "SYNTAX_ERROR");

    let rules = vec!["a = 1"; 200_000];
    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/combine",
        Some(json!({"rule_strings": rules})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "SYNTAX_ERROR");

    // 之后的请求不受影响
    let id = create(&app, "a = 1").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/rules/evaluate",
        Some(json!({"rule_id": id, "data": {"a": 1}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"], true);
}
