//! 规则引擎领域模型

use crate::ast::Node;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 规则记录：原始规则字符串与解析得到的 AST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: String,
    pub rule_string: String,
    pub ast: Node,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl RuleRecord {
    pub fn new(rule_string: impl Into<String>, ast: Node) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            rule_string: rule_string.into(),
            ast,
            created_at: Utc::now(),
        }
    }
}

/// 评估上下文 - 提供给规则引擎的数据记录
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    data: Value,
}

impl EvaluationContext {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// 获取字段值
    ///
    /// 先按完整字段名查找，找不到时再按点号分隔的路径查找（如 "user.profile.age"）。
    pub fn get_field(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.data.get(path) {
            return Some(value);
        }

        let mut current = &self.data;
        for part in path.split('.') {
            match current {
                Value::Object(map) => {
                    current = map.get(part)?;
                }
                Value::Array(arr) => {
                    let index: usize = part.parse().ok()?;
                    current = arr.get(index)?;
                }
                _ => return None,
            }
        }

        Some(current)
    }
}

/// 评估结果
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub matched: bool,
    pub rule_id: Option<String>,
    pub matched_conditions: Vec<String>,
    pub evaluation_trace: Vec<String>,
    pub evaluation_time_us: u64,
}

impl EvaluationResult {
    pub fn new(rule_id: Option<String>) -> Self {
        Self {
            matched: false,
            rule_id,
            matched_conditions: Vec::new(),
            evaluation_trace: Vec::new(),
            evaluation_time_us: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::ComparisonOp;
    use serde_json::json;

    #[test]
    fn test_record_serialization() {
        let record = RuleRecord::new("age > 30", Node::operand("age", ComparisonOp::Gt, 30));

        let json = serde_json::to_string_pretty(&record).unwrap();
        let parsed: RuleRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, record);
        assert!(Uuid::parse_str(&parsed.id).is_ok());
    }

    #[test]
    fn test_record_deserialization_without_timestamp() {
        let json = r#"
        {
            "id": "rule-001",
            "rule_string": "department = 'Sales'",
            "ast": {
                "type": "operand",
                "attribute": "department",
                "operator": "=",
                "value": "Sales"
            }
        }
        "#;

        let record: RuleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "rule-001");
        assert_eq!(
            record.ast,
            Node::operand("department", ComparisonOp::Eq, "Sales")
        );
    }

    #[test]
    fn test_evaluation_context() {
        let ctx = EvaluationContext::new(json!({
            "age": 35,
            "department": "Sales",
            "user.level": "gold",
            "profile": {
                "salary": 60000,
                "skills": ["rust", "sql"]
            }
        }));

        assert_eq!(ctx.get_field("age"), Some(&json!(35)));
        assert_eq!(ctx.get_field("user.level"), Some(&json!("gold")));
        assert_eq!(ctx.get_field("profile.salary"), Some(&json!(60000)));
        assert_eq!(ctx.get_field("profile.skills.1"), Some(&json!("sql")));
        assert_eq!(ctx.get_field("experience"), None);
    }
}
