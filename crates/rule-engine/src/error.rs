//! 规则引擎错误类型
//!
//! 错误分为三类：语法错误（规则字符串无法解析）、输入错误（组合参数或配置值非法）、
//! 评估错误（遍历 AST 时遇到不支持的操作符或缺失字段）。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则不能为空")]
    EmptyRule,

    #[error("条件子句格式错误: '{clause}'，应为 <字段> <操作符> <值>")]
    MalformedClause { clause: String },

    #[error("逻辑操作符 {connective} 缺少{side}侧表达式")]
    DanglingConnective {
        connective: String,
        side: &'static str,
    },

    #[error("无效的比较操作符: {0}")]
    InvalidComparison(String),

    #[error("括号不匹配: {0}")]
    UnbalancedParentheses(String),

    #[error("规则嵌套过深: 深度 {depth} 超过上限 {max}")]
    DepthExceeded { depth: usize, max: usize },

    #[error("无效的输入: {0}")]
    InvalidInput(String),

    #[error("不支持的操作符: {0}")]
    UnsupportedOperator(String),

    #[error("字段不存在: {0}")]
    FieldNotFound(String),

    #[error("规则未找到: {0}")]
    RuleNotFound(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Value,
    Evaluation,
    NotFound,
    Serialization,
}

impl RuleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyRule
            | Self::MalformedClause { .. }
            | Self::DanglingConnective { .. }
            | Self::InvalidComparison(_)
            | Self::UnbalancedParentheses(_)
            | Self::DepthExceeded { .. } => ErrorKind::Syntax,
            Self::InvalidInput(_) => ErrorKind::Value,
            Self::UnsupportedOperator(_) | Self::FieldNotFound(_) => ErrorKind::Evaluation,
            Self::RuleNotFound(_) => ErrorKind::NotFound,
            Self::JsonError(_) => ErrorKind::Serialization,
        }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Syntax => "SYNTAX_ERROR",
            ErrorKind::Value => "VALUE_ERROR",
            ErrorKind::Evaluation => "EVALUATION_ERROR",
            ErrorKind::NotFound => "RULE_NOT_FOUND",
            ErrorKind::Serialization => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
