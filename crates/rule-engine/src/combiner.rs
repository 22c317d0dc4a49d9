//! 规则组合器
//!
//! 将多条规则从前往后折叠为一棵右倾的二叉树：
//! `combine([r1, r2, r3]) = OP(r1, OP(r2, r3))`，单条规则原样返回。
//! 连接词 `OP` 由组合策略决定。

use crate::ast::Node;
use crate::error::{Result, RuleError};
use crate::operators::LogicalOperator;
use crate::parser::RuleParser;
use serde::{Deserialize, Serialize};

/// 组合策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineStrategy {
    /// 始终使用 AND
    #[default]
    FixedAnd,
    /// 统计所有输入规则中 AND / OR 的出现次数，取较多者；持平时使用 AND
    MostFrequent,
}

/// 规则组合器
#[derive(Debug, Clone, Default)]
pub struct RuleCombiner {
    parser: RuleParser,
    strategy: CombineStrategy,
}

impl RuleCombiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser(mut self, parser: RuleParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_strategy(mut self, strategy: CombineStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> CombineStrategy {
        self.strategy
    }

    /// 解析并组合多条规则字符串
    pub fn combine<S: AsRef<str>>(&self, rules: &[S]) -> Result<Node> {
        if rules.is_empty() {
            return Err(RuleError::InvalidInput("至少需要一条规则".to_string()));
        }

        // n 条规则折叠后深度至少为 n，先于逐条解析拒绝
        let max = self.parser.max_depth();
        if rules.len() > max {
            return Err(RuleError::DepthExceeded {
                depth: rules.len(),
                max,
            });
        }

        let nodes = rules
            .iter()
            .map(|rule| self.parser.parse(rule.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        self.combine_nodes(nodes)
    }

    /// 组合已解析的 AST
    pub fn combine_nodes(&self, nodes: Vec<Node>) -> Result<Node> {
        let depth = combined_depth(&nodes);
        let max = self.parser.max_depth();
        if depth > max {
            return Err(RuleError::DepthExceeded { depth, max });
        }

        let connective = self.select_connective(&nodes);

        nodes
            .into_iter()
            .rev()
            .reduce(|acc, node| Node::operator(connective, node, acc))
            .ok_or_else(|| RuleError::InvalidInput("至少需要一条规则".to_string()))
    }

    fn select_connective(&self, nodes: &[Node]) -> LogicalOperator {
        match self.strategy {
            CombineStrategy::FixedAnd => LogicalOperator::And,
            CombineStrategy::MostFrequent => {
                let (and, or) = nodes
                    .iter()
                    .map(Node::connective_counts)
                    .fold((0, 0), |(a, o), (na, no)| (a + na, o + no));

                if or > and {
                    LogicalOperator::Or
                } else {
                    LogicalOperator::And
                }
            }
        }
    }
}

/// 右倾折叠后的树深度：第 i 棵子树位于第 i + 1 层，最后一棵与倒数第二棵同层
fn combined_depth(nodes: &[Node]) -> usize {
    let last = nodes.len().saturating_sub(1);
    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (i + 1).min(last) + node.depth())
        .max()
        .unwrap_or(0)
}
