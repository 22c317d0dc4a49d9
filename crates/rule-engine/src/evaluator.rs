//! 条件评估器
//!
//! 比较语义严格区分类型：数值只与数值比较，字符串只与字符串比较，
//! 类型不一致时比较结果为 false。

use crate::ast::{Condition, Literal};
use crate::error::{Result, RuleError};
use crate::operators::ComparisonOp;
use serde_json::Value;
use std::cmp::Ordering;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估叶子条件
    ///
    /// # Arguments
    /// * `cond` - 叶子条件
    /// * `field_value` - 从数据记录中取到的字段值，字段不存在时为 `None`
    pub fn evaluate(cond: &Condition, field_value: Option<&Value>) -> Result<bool> {
        let field_value =
            field_value.ok_or_else(|| RuleError::FieldNotFound(cond.attribute.clone()))?;

        Ok(Self::compare_values(field_value, cond.operator, &cond.value))
    }

    /// 按操作符比较字段值和字面量
    pub fn compare_values(field: &Value, operator: ComparisonOp, expected: &Literal) -> bool {
        match operator {
            ComparisonOp::Gt => Self::ordering(field, expected) == Some(Ordering::Greater),
            ComparisonOp::Lt => Self::ordering(field, expected) == Some(Ordering::Less),
            ComparisonOp::Eq => Self::eq(field, expected),
        }
    }

    /// 严格相等
    fn eq(field: &Value, expected: &Literal) -> bool {
        match (field, expected) {
            (Value::Number(n), Literal::Number(e)) => n.as_f64() == Some(*e),
            (Value::String(s), Literal::Text(e)) => s == e,
            _ => false,
        }
    }

    /// 数值按大小、字符串按字典序；其他组合不可比较
    fn ordering(field: &Value, expected: &Literal) -> Option<Ordering> {
        match (field, expected) {
            (Value::Number(n), Literal::Number(e)) => n.as_f64()?.partial_cmp(e),
            (Value::String(s), Literal::Text(e)) => Some(s.as_str().cmp(e.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(field: Value, operator: ComparisonOp, expected: impl Into<Literal>) -> bool {
        ConditionEvaluator::compare_values(&field, operator, &expected.into())
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(check(json!(35), ComparisonOp::Gt, 30));
        assert!(!check(json!(20), ComparisonOp::Gt, 30));
        assert!(!check(json!(30), ComparisonOp::Gt, 30));
        assert!(check(json!(20), ComparisonOp::Lt, 25));
        assert!(check(json!(24.5), ComparisonOp::Lt, 25));
    }

    #[test]
    fn test_eq_numbers() {
        assert!(check(json!(100), ComparisonOp::Eq, 100));
        assert!(check(json!(100.0), ComparisonOp::Eq, 100));
        assert!(!check(json!(100.5), ComparisonOp::Eq, 100));
    }

    #[test]
    fn test_eq_strings() {
        assert!(check(json!("Sales"), ComparisonOp::Eq, "Sales"));
        assert!(!check(json!("sales"), ComparisonOp::Eq, "Sales"));
    }

    #[test]
    fn test_string_ordering() {
        assert!(check(json!("b"), ComparisonOp::Gt, "a"));
        assert!(check(json!("apple"), ComparisonOp::Lt, "banana"));
    }

    #[test]
    fn test_mixed_types_never_match() {
        assert!(!check(json!("35"), ComparisonOp::Eq, 35));
        assert!(!check(json!(35), ComparisonOp::Eq, "35"));
        assert!(!check(json!("35"), ComparisonOp::Gt, 30));
        assert!(!check(json!(true), ComparisonOp::Eq, "true"));
        assert!(!check(json!(null), ComparisonOp::Lt, 1));
        assert!(!check(json!([1, 2]), ComparisonOp::Gt, 0));
    }

    #[test]
    fn test_missing_field() {
        let cond = Condition::new("age", ComparisonOp::Gt, 30);
        let err = ConditionEvaluator::evaluate(&cond, None).unwrap_err();
        assert!(matches!(err, RuleError::FieldNotFound(ref f) if f == "age"));
    }

    #[test]
    fn test_present_field() {
        let cond = Condition::new("age", ComparisonOp::Gt, 30);
        assert!(ConditionEvaluator::evaluate(&cond, Some(&json!(31))).unwrap());
    }
}
