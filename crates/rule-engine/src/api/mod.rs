//! REST API
//!
//! 规则接口挂载在 `/api/rules` 下，另提供 `/health` 健康检查。

pub mod dto;
pub mod error;
pub mod handlers;

use crate::service::RuleService;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use rule_shared::observability::middleware::{http_tracing, request_id};
use std::sync::Arc;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RuleService>,
}

impl AppState {
    pub fn new(service: Arc<RuleService>) -> Self {
        Self { service }
    }
}

/// 规则路由
pub fn rule_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_rules))
        .route("/create", post(handlers::create_rule))
        .route("/combine", post(handlers::combine_rules))
        .route("/evaluate", post(handlers::evaluate_rule))
        .route("/evaluate-ast", post(handlers::evaluate_ast))
        .route(
            "/{id}",
            get(handlers::get_rule).delete(handlers::delete_rule),
        )
}

/// 构建完整路由（不含 CORS，由启动入口按配置添加）
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/rules", rule_routes())
        .layer(middleware::from_fn(http_tracing))
        .layer(middleware::from_fn(request_id))
        .with_state(state)
}
