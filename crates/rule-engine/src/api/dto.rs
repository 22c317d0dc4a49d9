//! HTTP 请求与响应 DTO

use crate::ast::Node;
use crate::models::{EvaluationResult, RuleRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

/// 创建规则请求
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRuleRequest {
    #[validate(length(min = 1, message = "规则字符串不能为空"))]
    pub rule_string: String,
}

/// 组合规则请求
///
/// 空列表交给组合器报告，不在此处校验。
#[derive(Debug, Deserialize)]
pub struct CombineRulesRequest {
    pub rule_strings: Vec<String>,
}

/// 按 ID 评估规则请求
#[derive(Debug, Deserialize, Validate)]
pub struct EvaluateRuleRequest {
    #[validate(length(min = 1, message = "规则 ID 不能为空"))]
    pub rule_id: String,
    #[validate(custom(function = "validate_data_object"))]
    pub data: Value,
}

/// 评估序列化 AST 请求
#[derive(Debug, Deserialize, Validate)]
pub struct EvaluateAstRequest {
    pub ast: Value,
    #[validate(custom(function = "validate_data_object"))]
    pub data: Value,
}

fn validate_data_object(data: &Value) -> Result<(), ValidationError> {
    if data.is_object() {
        Ok(())
    } else {
        let mut err = ValidationError::new("data_not_object");
        err.message = Some("data 必须是 JSON 对象".into());
        Err(err)
    }
}

/// 规则详情
#[derive(Debug, Serialize)]
pub struct RuleDto {
    pub id: String,
    pub rule_string: String,
    pub ast: Node,
    pub created_at: DateTime<Utc>,
}

impl From<RuleRecord> for RuleDto {
    fn from(record: RuleRecord) -> Self {
        Self {
            id: record.id,
            rule_string: record.rule_string,
            ast: record.ast,
            created_at: record.created_at,
        }
    }
}

/// 评估响应
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_conditions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evaluation_trace: Vec<String>,
    pub evaluation_time_us: u64,
}

impl From<EvaluationResult> for EvaluateResponse {
    fn from(result: EvaluationResult) -> Self {
        Self {
            result: result.matched,
            matched_conditions: result.matched_conditions,
            evaluation_trace: result.evaluation_trace,
            evaluation_time_us: result.evaluation_time_us,
        }
    }
}

/// API 统一响应
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// 创建成功响应（无数据）
    pub fn success_empty() -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: None,
        }
    }
}
