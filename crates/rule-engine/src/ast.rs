//! 规则抽象语法树
//!
//! 树由两类节点组成：叶子条件 [`Node::Operand`] 和二元逻辑节点 [`Node::Operator`]。
//! 序列化格式使用 `type` 字段区分节点类型，操作符以字符串形式持久化，
//! 反序列化时再校验，因此加载到未知操作符会得到评估错误而不是静默忽略。

use crate::error::{Result, RuleError};
use crate::operators::{ComparisonOp, LogicalOperator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

const QUOTES: &[char] = &['\'', '"'];

/// 默认允许的最大树深度（单个叶子为 1）
///
/// 持久化的规则记录和接口响应会在 AST 外再包几层对象，需低于 serde_json 的嵌套上限 128。
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// 条件中的字面量，解析时确定类型，之后不再变化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    /// 将值 token 转换为字面量
    ///
    /// 能按十进制解析为有限数值的 token 存为数值，否则剥掉一层成对的首尾引号存为字符串。
    /// 溢出为无穷大的数值（如 `1e400`）与 `inf`、`NaN` 一样按字符串保存。
    pub fn coerce(token: &str) -> Self {
        if let Ok(n) = token.parse::<f64>()
            && n.is_finite()
        {
            return Self::Number(n);
        }

        let text = match token.chars().next() {
            Some(quote) if QUOTES.contains(&quote) && token.len() >= 2 && token.ends_with(quote) => {
                &token[1..token.len() - 1]
            }
            _ => token,
        };
        Self::Text(text.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// 叶子条件：`<attribute> <operator> <value>`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: String,
    pub operator: ComparisonOp,
    pub value: Literal,
}

impl Condition {
    pub fn new(
        attribute: impl Into<String>,
        operator: ComparisonOp,
        value: impl Into<Literal>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.operator, self.value)
    }
}

/// 二元逻辑节点
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalNode {
    pub connective: LogicalOperator,
    pub left: Box<Node>,
    pub right: Box<Node>,
}

/// AST 节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub enum Node {
    Operand(Condition),
    Operator(LogicalNode),
}

impl Node {
    pub fn operand(
        attribute: impl Into<String>,
        operator: ComparisonOp,
        value: impl Into<Literal>,
    ) -> Self {
        Self::Operand(Condition::new(attribute, operator, value))
    }

    pub fn operator(connective: LogicalOperator, left: Node, right: Node) -> Self {
        Self::Operator(LogicalNode {
            connective,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn and(left: Node, right: Node) -> Self {
        Self::operator(LogicalOperator::And, left, right)
    }

    pub fn or(left: Node, right: Node) -> Self {
        Self::operator(LogicalOperator::Or, left, right)
    }

    /// 从持久化的 JSON 还原 AST
    ///
    /// 结构错误返回 JSON 错误；结构完整但操作符不受支持时返回 `UnsupportedOperator`。
    pub fn from_value(value: Value) -> Result<Self> {
        Self::from_value_with_max_depth(value, DEFAULT_MAX_DEPTH)
    }

    /// 同 [`Node::from_value`]，深度超过 `max_depth` 时在反序列化之前拒绝
    pub fn from_value_with_max_depth(value: Value, max_depth: usize) -> Result<Self> {
        let depth = value_depth(&value);
        if depth > max_depth {
            return Err(RuleError::DepthExceeded {
                depth,
                max: max_depth,
            });
        }

        let raw: RawNode = serde_json::from_value(value)?;
        Self::try_from(raw)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// 树的深度（单个叶子为 1）
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1)];

        while let Some((node, depth)) = stack.pop() {
            max = max.max(depth);
            if let Self::Operator(logical) = node {
                stack.push((&*logical.left, depth + 1));
                stack.push((&*logical.right, depth + 1));
            }
        }

        max
    }

    /// 叶子条件数量
    pub fn leaf_count(&self) -> usize {
        self.nodes()
            .filter(|node| matches!(node, Self::Operand(_)))
            .count()
    }

    /// 树中引用的所有字段
    pub fn attributes(&self) -> BTreeSet<String> {
        self.nodes()
            .filter_map(|node| match node {
                Self::Operand(cond) => Some(cond.attribute.clone()),
                Self::Operator(_) => None,
            })
            .collect()
    }

    /// 统计树中 AND / OR 节点的数量，返回 (and, or)
    pub fn connective_counts(&self) -> (usize, usize) {
        self.nodes().fold((0, 0), |(and, or), node| match node {
            Self::Operator(logical) if logical.connective == LogicalOperator::And => (and + 1, or),
            Self::Operator(_) => (and, or + 1),
            Self::Operand(_) => (and, or),
        })
    }

    /// 先序遍历所有节点，使用显式栈
    fn nodes(&self) -> impl Iterator<Item = &Node> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            if let Self::Operator(logical) = node {
                stack.push(&*logical.right);
                stack.push(&*logical.left);
            }
            Some(node)
        })
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operand(cond) => write!(f, "{}", cond),
            Self::Operator(node) => {
                write!(f, "({} {} {})", node.left, node.connective, node.right)
            }
        }
    }
}

/// 沿 `left` / `right` 统计 JSON 树的深度，使用显式栈避免递归
fn value_depth(value: &Value) -> usize {
    let mut max = 0;
    let mut stack = vec![(value, 1)];

    while let Some((node, depth)) = stack.pop() {
        max = max.max(depth);
        for key in ["left", "right"] {
            if let Some(child) = node.get(key) {
                stack.push((child, depth + 1));
            }
        }
    }

    max
}

/// 持久化格式，操作符保持为原始字符串
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum RawNode {
    Operand {
        attribute: String,
        operator: String,
        value: Literal,
    },
    Operator {
        operator: String,
        left: Box<RawNode>,
        right: Box<RawNode>,
    },
}

impl TryFrom<RawNode> for Node {
    type Error = RuleError;

    fn try_from(raw: RawNode) -> Result<Self> {
        match raw {
            RawNode::Operand {
                attribute,
                operator,
                value,
            } => Ok(Node::Operand(Condition {
                attribute,
                operator: operator.parse()?,
                value,
            })),
            RawNode::Operator {
                operator,
                left,
                right,
            } => Ok(Node::operator(
                operator.parse()?,
                Node::try_from(*left)?,
                Node::try_from(*right)?,
            )),
        }
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        match node {
            Node::Operand(cond) => RawNode::Operand {
                attribute: cond.attribute,
                operator: cond.operator.as_str().to_string(),
                value: cond.value,
            },
            Node::Operator(node) => RawNode::Operator {
                operator: node.connective.to_string(),
                left: Box::new(RawNode::from(*node.left)),
                right: Box::new(RawNode::from(*node.right)),
            },
        }
    }
}
