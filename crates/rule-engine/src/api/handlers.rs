//! 规则 API 处理器

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;
use validator::Validate;

use super::AppState;
use super::dto::{
    ApiResponse, CombineRulesRequest, CreateRuleRequest, EvaluateAstRequest, EvaluateResponse,
    EvaluateRuleRequest, RuleDto,
};
use super::error::Result;
use crate::ast::Node;

/// 创建规则
///
/// POST /api/rules/create
#[tracing::instrument(skip(state, req))]
pub async fn create_rule(
    State(state): State<AppState>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<Json<ApiResponse<RuleDto>>> {
    req.validate()?;

    let record = state.service.create_rule(&req.rule_string).await?;
    info!(rule_id = %record.id, "创建规则成功");

    Ok(Json(ApiResponse::success(record.into())))
}

/// 组合规则
///
/// POST /api/rules/combine
#[tracing::instrument(skip(state, req))]
pub async fn combine_rules(
    State(state): State<AppState>,
    Json(req): Json<CombineRulesRequest>,
) -> Result<Json<ApiResponse<Node>>> {
    let combined = state.service.combine_rules(&req.rule_strings)?;
    Ok(Json(ApiResponse::success(combined)))
}

/// 按 ID 评估规则
///
/// POST /api/rules/evaluate
#[tracing::instrument(skip(state, req))]
pub async fn evaluate_rule(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRuleRequest>,
) -> Result<Json<ApiResponse<EvaluateResponse>>> {
    req.validate()?;

    let result = state.service.evaluate_rule(&req.rule_id, req.data).await?;
    Ok(Json(ApiResponse::success(result.into())))
}

/// 评估请求中携带的 AST
///
/// POST /api/rules/evaluate-ast
#[tracing::instrument(skip(state, req))]
pub async fn evaluate_ast(
    State(state): State<AppState>,
    Json(req): Json<EvaluateAstRequest>,
) -> Result<Json<ApiResponse<EvaluateResponse>>> {
    req.validate()?;

    let result = state.service.evaluate_ast(req.ast, req.data)?;
    Ok(Json(ApiResponse::success(result.into())))
}

/// 规则列表
///
/// GET /api/rules
pub async fn list_rules(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<RuleDto>>>> {
    let rules = state.service.list_rules().await?;
    Ok(Json(ApiResponse::success(
        rules.into_iter().map(RuleDto::from).collect(),
    )))
}

/// 规则详情
///
/// GET /api/rules/{id}
pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RuleDto>>> {
    let record = state.service.get_rule(&id).await?;
    Ok(Json(ApiResponse::success(record.into())))
}

/// 删除规则
///
/// DELETE /api/rules/{id}
#[tracing::instrument(skip(state))]
pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    state.service.delete_rule(&id).await?;
    info!(rule_id = %id, "删除规则成功");

    Ok(Json(ApiResponse::success_empty()))
}

/// 健康检查
///
/// GET /health
pub async fn health() -> &'static str {
    "OK"
}
