//! 规则服务
//!
//! 组合解析器、组合器、执行器和规则仓储，提供创建、组合、评估规则的业务入口。

use crate::ast::{DEFAULT_MAX_DEPTH, Node};
use crate::combiner::{CombineStrategy, RuleCombiner};
use crate::error::{Result, RuleError};
use crate::executor::RuleExecutor;
use crate::models::{EvaluationContext, EvaluationResult, RuleRecord};
use crate::parser::{ParserMode, RuleParser};
use crate::store::RuleRepository;
use rule_shared::config::EngineConfig;
use rule_shared::observability::metrics;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

impl FromStr for ParserMode {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first_match" => Ok(Self::FirstMatch),
            "precedence" => Ok(Self::Precedence),
            other => Err(RuleError::InvalidInput(format!("未知的解析模式: {}", other))),
        }
    }
}

impl FromStr for CombineStrategy {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed_and" => Ok(Self::FixedAnd),
            "most_frequent" => Ok(Self::MostFrequent),
            other => Err(RuleError::InvalidInput(format!("未知的组合策略: {}", other))),
        }
    }
}

/// 引擎设置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub parser_mode: ParserMode,
    pub combine_strategy: CombineStrategy,
    pub trace_enabled: bool,
    pub max_depth: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            parser_mode: ParserMode::default(),
            combine_strategy: CombineStrategy::default(),
            trace_enabled: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineSettings {
    /// 从配置文件中的 engine 段构建
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        if config.max_depth == 0 {
            return Err(RuleError::InvalidInput("max_depth 必须大于 0".to_string()));
        }

        Ok(Self {
            parser_mode: config.parser_mode.parse()?,
            combine_strategy: config.combine_strategy.parse()?,
            trace_enabled: config.trace_enabled,
            max_depth: config.max_depth,
        })
    }
}

/// 规则服务
pub struct RuleService {
    repository: Arc<dyn RuleRepository>,
    parser: RuleParser,
    combiner: RuleCombiner,
    executor: RuleExecutor,
}

impl RuleService {
    pub fn new(repository: Arc<dyn RuleRepository>) -> Self {
        Self::with_settings(repository, EngineSettings::default())
    }

    pub fn with_settings(repository: Arc<dyn RuleRepository>, settings: EngineSettings) -> Self {
        let parser =
            RuleParser::with_mode(settings.parser_mode).with_max_depth(settings.max_depth);
        let combiner = RuleCombiner::new()
            .with_parser(parser.clone())
            .with_strategy(settings.combine_strategy);
        let executor = if settings.trace_enabled {
            RuleExecutor::new().with_trace()
        } else {
            RuleExecutor::new()
        };

        Self {
            repository,
            parser,
            combiner,
            executor,
        }
    }

    /// 解析并保存规则
    #[instrument(skip(self))]
    pub async fn create_rule(&self, rule_string: &str) -> Result<RuleRecord> {
        let ast = self.parser.parse(rule_string).inspect_err(|e| {
            metrics::record_rule_parse("error");
            warn!(error = %e, "规则解析失败");
        })?;
        metrics::record_rule_parse("ok");

        let record = RuleRecord::new(rule_string, ast);
        self.repository.save(record.clone()).await?;
        metrics::set_rules_stored(self.repository.count().await?);

        info!(rule_id = %record.id, depth = record.ast.depth(), "规则已创建");
        Ok(record)
    }

    /// 组合多条规则，结果不落库
    #[instrument(skip(self, rule_strings), fields(count = rule_strings.len()))]
    pub fn combine_rules<S: AsRef<str>>(&self, rule_strings: &[S]) -> Result<Node> {
        let combined = self.combiner.combine(rule_strings);
        metrics::record_rule_combination(
            rule_strings.len(),
            if combined.is_ok() { "ok" } else { "error" },
        );

        let combined = combined.inspect_err(|e| warn!(error = %e, "规则组合失败"))?;
        debug!(depth = combined.depth(), "规则组合完成");
        Ok(combined)
    }

    /// 按 ID 评估已保存的规则
    #[instrument(skip(self, data))]
    pub async fn evaluate_rule(&self, rule_id: &str, data: Value) -> Result<EvaluationResult> {
        let record = self
            .repository
            .get(rule_id)
            .await?
            .ok_or_else(|| RuleError::RuleNotFound(rule_id.to_string()))?;

        self.run(&record.ast, Some(rule_id), data)
    }

    /// 评估调用方直接提交的序列化 AST
    #[instrument(skip(self, ast, data))]
    pub fn evaluate_ast(&self, ast: Value, data: Value) -> Result<EvaluationResult> {
        let ast = Node::from_value_with_max_depth(ast, self.parser.max_depth())?;
        self.run(&ast, None, data)
    }

    fn run(&self, ast: &Node, rule_id: Option<&str>, data: Value) -> Result<EvaluationResult> {
        let start = Instant::now();
        let context = EvaluationContext::new(data);

        let result = self.executor.execute(ast, rule_id, &context);
        let status = match &result {
            Ok(r) if r.matched => "matched",
            Ok(_) => "not_matched",
            Err(_) => "error",
        };
        metrics::record_rule_evaluation(status, start.elapsed().as_secs_f64());

        let result = result.inspect_err(|e| warn!(error = %e, "规则评估失败"))?;
        debug!(matched = result.matched, "规则评估完成");
        Ok(result)
    }

    pub async fn get_rule(&self, rule_id: &str) -> Result<RuleRecord> {
        self.repository
            .get(rule_id)
            .await?
            .ok_or_else(|| RuleError::RuleNotFound(rule_id.to_string()))
    }

    pub async fn list_rules(&self) -> Result<Vec<RuleRecord>> {
        self.repository.list().await
    }

    #[instrument(skip(self))]
    pub async fn delete_rule(&self, rule_id: &str) -> Result<()> {
        self.repository.delete(rule_id).await?;
        metrics::set_rules_stored(self.repository.count().await?);
        Ok(())
    }
}
