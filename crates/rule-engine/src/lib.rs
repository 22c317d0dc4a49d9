//! 规则表达式引擎
//!
//! 提供规则字符串到 AST 的解析、多规则组合与数据记录评估能力：
//! - 规则解析（首个连接词拆分 / 优先级解析两种模式）
//! - 多规则右倾折叠组合
//! - 类型严格的条件评估，可选评估追踪
//! - 规则存储、服务层与 REST 接口

pub mod api;
pub mod ast;
pub mod combiner;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod models;
pub mod operators;
pub mod parser;
pub mod service;
pub mod store;

pub use ast::{Condition, Literal, LogicalNode, Node};
pub use combiner::{CombineStrategy, RuleCombiner};
pub use error::{ErrorKind, Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use executor::RuleExecutor;
pub use models::{EvaluationContext, EvaluationResult, RuleRecord};
pub use operators::{ComparisonOp, LogicalOperator};
pub use parser::{ParserMode, RuleParser};
pub use service::{EngineSettings, RuleService};
pub use store::{RuleRepository, RuleStore};

use serde_json::Value;

/// 使用默认解析模式解析单条规则
pub fn create_rule(rule: &str) -> Result<Node> {
    RuleParser::new().parse(rule)
}

/// 使用默认策略组合多条规则
pub fn combine_rules<S: AsRef<str>>(rules: &[S]) -> Result<Node> {
    RuleCombiner::new().combine(rules)
}

/// 对一条数据记录评估 AST
pub fn evaluate_rule(ast: &Node, data: &Value) -> Result<bool> {
    let context = EvaluationContext::new(data.clone());
    RuleExecutor::new().evaluate(ast, &context)
}
