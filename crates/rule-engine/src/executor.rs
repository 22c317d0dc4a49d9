//! 规则执行器
//!
//! 后序遍历 AST：逻辑节点总是先完整评估左右两棵子树再合并结果，不做短路，
//! 因此任一子树中的缺失字段都会被报告出来。可选记录评估追踪信息。

use crate::ast::{Condition, LogicalNode, Node};
use crate::error::Result;
use crate::evaluator::ConditionEvaluator;
use crate::models::{EvaluationContext, EvaluationResult};
use std::time::Instant;

/// 规则执行器
#[derive(Debug, Clone, Default)]
pub struct RuleExecutor {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 只返回布尔结果
    pub fn evaluate(&self, ast: &Node, context: &EvaluationContext) -> Result<bool> {
        self.execute(ast, None, context).map(|r| r.matched)
    }

    /// 执行规则评估
    pub fn execute(
        &self,
        ast: &Node,
        rule_id: Option<&str>,
        context: &EvaluationContext,
    ) -> Result<EvaluationResult> {
        let start = Instant::now();

        let mut result = EvaluationResult::new(rule_id.map(str::to_string));
        result.matched = self.evaluate_node(ast, context, &mut result, "root")?;
        result.evaluation_time_us = start.elapsed().as_micros() as u64;

        Ok(result)
    }

    fn evaluate_node(
        &self,
        node: &Node,
        context: &EvaluationContext,
        result: &mut EvaluationResult,
        path: &str,
    ) -> Result<bool> {
        match node {
            Node::Operand(cond) => self.evaluate_condition(cond, context, result, path),
            Node::Operator(logical) => self.evaluate_logical(logical, context, result, path),
        }
    }

    fn evaluate_condition(
        &self,
        cond: &Condition,
        context: &EvaluationContext,
        result: &mut EvaluationResult,
        path: &str,
    ) -> Result<bool> {
        let field_value = context.get_field(&cond.attribute);
        let matched = ConditionEvaluator::evaluate(cond, field_value)?;

        if self.trace_enabled {
            result.evaluation_trace.push(format!(
                "{}: {} => {}",
                path,
                cond,
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            ));
        }

        if matched {
            result.matched_conditions.push(cond.to_string());
        }

        Ok(matched)
    }

    fn evaluate_logical(
        &self,
        logical: &LogicalNode,
        context: &EvaluationContext,
        result: &mut EvaluationResult,
        path: &str,
    ) -> Result<bool> {
        // 追踪关闭时不拼接路径
        let (left_path, right_path) = if self.trace_enabled {
            (format!("{}.left", path), format!("{}.right", path))
        } else {
            (String::new(), String::new())
        };

        let left = self.evaluate_node(&logical.left, context, result, &left_path)?;
        let right = self.evaluate_node(&logical.right, context, result, &right_path)?;
        let matched = logical.connective.apply(left, right);

        if self.trace_enabled {
            result.evaluation_trace.push(format!(
                "{}: {} {} {} => {}",
                path, left, logical.connective, right, matched
            ));
        }

        Ok(matched)
    }
}
