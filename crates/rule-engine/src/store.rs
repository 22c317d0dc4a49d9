//! 规则存储管理
//!
//! [`RuleRepository`] 是规则记录的持久化边界，服务层只依赖该 trait。
//! [`RuleStore`] 是基于 DashMap 的内存实现，线程安全，可克隆共享。

use crate::error::{Result, RuleError};
use crate::models::RuleRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 规则仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn save(&self, record: RuleRecord) -> Result<()>;
    async fn get(&self, rule_id: &str) -> Result<Option<RuleRecord>>;
    async fn list(&self) -> Result<Vec<RuleRecord>>;
    async fn delete(&self, rule_id: &str) -> Result<()>;
    async fn count(&self) -> Result<usize>;
}

/// 内存规则存储
#[derive(Clone, Default)]
pub struct RuleStore {
    rules: Arc<DashMap<String, RuleRecord>>,
}

impl RuleStore {
    /// 创建新的规则存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前存储的规则数量
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 检查存储是否为空
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 检查规则是否存在
    pub fn contains(&self, rule_id: &str) -> bool {
        self.rules.contains_key(rule_id)
    }
}

#[async_trait]
impl RuleRepository for RuleStore {
    #[instrument(skip(self, record), fields(rule_id = %record.id))]
    async fn save(&self, record: RuleRecord) -> Result<()> {
        let rule_id = record.id.clone();
        self.rules.insert(rule_id.clone(), record);

        info!("规则已保存: {}", rule_id);
        Ok(())
    }

    async fn get(&self, rule_id: &str) -> Result<Option<RuleRecord>> {
        Ok(self.rules.get(rule_id).map(|r| r.clone()))
    }

    async fn list(&self) -> Result<Vec<RuleRecord>> {
        let mut records: Vec<RuleRecord> = self.rules.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn delete(&self, rule_id: &str) -> Result<()> {
        if self.rules.remove(rule_id).is_some() {
            info!("规则已删除: {}", rule_id);
            Ok(())
        } else {
            warn!("删除不存在的规则: {}", rule_id);
            Err(RuleError::RuleNotFound(rule_id.to_string()))
        }
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.rules.len())
    }
}
