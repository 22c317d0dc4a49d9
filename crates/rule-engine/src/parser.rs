//! 规则解析器
//!
//! 将规则字符串解析为 AST。支持两种模式：
//!
//! - [`ParserMode::FirstMatch`]（默认）：按空白切分 token，在第一个 `AND`/`OR` 处
//!   拆分，右侧继续按同样规则拆分，不识别括号。括号字符会原样保留在字段名或值中。
//! - [`ParserMode::Precedence`]：识别括号分组，`AND` 优先级高于 `OR`，同级左结合。
//!
//! 两种模式对不含括号、只含单一连接词的规则结果一致；混用 `AND`/`OR`
//! 或含括号时结果不同，切换模式属于行为变更。
//!
//! 两种模式在解析前都会按 `max_depth` 检查树深度的上界，超限时返回语法错误。

use crate::ast::{DEFAULT_MAX_DEPTH, Literal, Node};
use crate::error::{Result, RuleError};
use crate::operators::{ComparisonOp, LogicalOperator};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 解析模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserMode {
    #[default]
    FirstMatch,
    Precedence,
}

/// 规则解析器
#[derive(Debug, Clone)]
pub struct RuleParser {
    mode: ParserMode,
    /// 允许的最大树深度，解析前按连接词数量和括号层数检查
    max_depth: usize,
}

impl Default for RuleParser {
    fn default() -> Self {
        Self {
            mode: ParserMode::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RuleParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: ParserMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn mode(&self) -> ParserMode {
        self.mode
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// 解析规则字符串
    pub fn parse(&self, rule: &str) -> Result<Node> {
        if rule.trim().is_empty() {
            return Err(RuleError::EmptyRule);
        }

        match self.mode {
            ParserMode::FirstMatch => {
                let tokens: Vec<&str> = rule.split_whitespace().collect();
                let connectives = tokens
                    .iter()
                    .filter(|t| LogicalOperator::from_token(t).is_some())
                    .count();
                self.check_depth(connectives + 1)?;
                parse_first_match(&tokens)
            }
            ParserMode::Precedence => {
                let tokens = tokenize(rule);
                self.check_depth(precedence_depth_bound(&tokens))?;
                PrecedenceParser::new(tokens).parse()
            }
        }
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(RuleError::DepthExceeded {
                depth,
                max: self.max_depth,
            });
        }
        Ok(())
    }
}

/// 在第一个连接词处拆分
///
/// 左侧切片不含连接词，只会是叶子条件，因此循环向右推进，最后自右向左折叠成右倾树。
fn parse_first_match(tokens: &[&str]) -> Result<Node> {
    let mut pending = Vec::new();
    let mut rest = tokens;

    while let Some((index, connective)) = rest
        .iter()
        .enumerate()
        .find_map(|(i, t)| LogicalOperator::from_token(t).map(|c| (i, c)))
    {
        let (left, right) = (&rest[..index], &rest[index + 1..]);
        if left.is_empty() {
            return Err(RuleError::DanglingConnective {
                connective: connective.to_string(),
                side: "左",
            });
        }
        if right.is_empty() {
            return Err(RuleError::DanglingConnective {
                connective: connective.to_string(),
                side: "右",
            });
        }

        pending.push((parse_clause(left)?, connective));
        rest = right;
    }

    let tail = parse_clause(rest)?;
    Ok(pending
        .into_iter()
        .rev()
        .fold(tail, |acc, (left, connective)| {
            Node::operator(connective, left, acc)
        }))
}

/// 优先级模式下树深度的上界：连接词数量 + 1 与括号最大嵌套层数取较大者
fn precedence_depth_bound(tokens: &[Token<'_>]) -> usize {
    let mut connectives = 0;
    let mut nesting = 0usize;
    let mut max_nesting = 0;

    for token in tokens {
        match token {
            Token::LParen => {
                nesting += 1;
                max_nesting = max_nesting.max(nesting);
            }
            Token::RParen => nesting = nesting.saturating_sub(1),
            Token::Connective(_) => connectives += 1,
            Token::Word(_) => {}
        }
    }

    (connectives + 1).max(max_nesting)
}

/// 解析叶子条件，必须恰好是三个 token
fn parse_clause(tokens: &[&str]) -> Result<Node> {
    let [attribute, operator, value] = tokens else {
        return Err(RuleError::MalformedClause {
            clause: tokens.join(" "),
        });
    };

    let operator: ComparisonOp = operator
        .parse()
        .map_err(|_| RuleError::InvalidComparison(operator.to_string()))?;

    Ok(Node::operand(*attribute, operator, Literal::coerce(value)))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'a> {
    LParen,
    RParen,
    Connective(LogicalOperator),
    Word(&'a str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::Connective(c) => write!(f, "{}", c),
            Self::Word(w) => write!(f, "{}", w),
        }
    }
}

/// 按空白切分后，再把词首的 `(` 和词尾的 `)` 拆成独立 token
fn tokenize(rule: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();

    for word in rule.split_whitespace() {
        let trimmed = word.trim_start_matches('(');
        let opening = word.len() - trimmed.len();
        let core = trimmed.trim_end_matches(')');
        let closing = trimmed.len() - core.len();

        tokens.extend(std::iter::repeat_n(Token::LParen, opening));
        if !core.is_empty() {
            tokens.push(
                LogicalOperator::from_token(core).map_or(Token::Word(core), Token::Connective),
            );
        }
        tokens.extend(std::iter::repeat_n(Token::RParen, closing));
    }

    tokens
}

/// 递归下降解析器
///
/// ```text
/// expr    := and_expr ("OR" and_expr)*
/// and_expr:= primary ("AND" primary)*
/// primary := "(" expr ")" | WORD WORD WORD
/// ```
struct PrecedenceParser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    depth: usize,
}

impl<'a> PrecedenceParser<'a> {
    fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn parse(mut self) -> Result<Node> {
        let node = self.parse_or()?;

        match self.peek() {
            None => Ok(node),
            Some(Token::RParen) => Err(RuleError::UnbalancedParentheses(
                "多余的右括号".to_string(),
            )),
            Some(_) => Err(RuleError::MalformedClause {
                clause: self.remaining(),
            }),
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn remaining(&self) -> String {
        self.tokens[self.pos..]
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn eat_connective(&mut self, connective: LogicalOperator) -> bool {
        if self.peek() == Some(Token::Connective(connective)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Node> {
        let mut left = self.parse_and()?;
        while self.eat_connective(LogicalOperator::Or) {
            let right = self.parse_and_after(Some(LogicalOperator::Or))?;
            left = Node::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Node> {
        self.parse_and_after(None)
    }

    fn parse_and_after(&mut self, after: Option<LogicalOperator>) -> Result<Node> {
        let mut left = self.parse_primary(after)?;
        while self.eat_connective(LogicalOperator::And) {
            let right = self.parse_primary(Some(LogicalOperator::And))?;
            left = Node::and(left, right);
        }
        Ok(left)
    }

    /// `after` 为刚消费的连接词，用于在右侧缺失时给出准确的错误
    fn parse_primary(&mut self, after: Option<LogicalOperator>) -> Result<Node> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                self.depth += 1;
                let node = self.parse_or()?;
                if self.peek() != Some(Token::RParen) {
                    return Err(RuleError::UnbalancedParentheses(
                        "缺少右括号".to_string(),
                    ));
                }
                self.pos += 1;
                self.depth -= 1;
                Ok(node)
            }
            Some(Token::Word(_)) => self.parse_words(),
            _ if after.is_some() => Err(RuleError::DanglingConnective {
                connective: after.map(|c| c.to_string()).unwrap_or_default(),
                side: "右",
            }),
            Some(Token::Connective(c)) => Err(RuleError::DanglingConnective {
                connective: c.to_string(),
                side: "左",
            }),
            Some(Token::RParen) => Err(RuleError::MalformedClause {
                clause: "()".to_string(),
            }),
            None if self.depth > 0 => Err(RuleError::UnbalancedParentheses(
                "缺少右括号".to_string(),
            )),
            None => Err(RuleError::EmptyRule),
        }
    }

    fn parse_words(&mut self) -> Result<Node> {
        let mut words = Vec::with_capacity(3);
        while let Some(Token::Word(w)) = self.peek() {
            words.push(w);
            self.pos += 1;
        }
        parse_clause(&words)
    }
}
