use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sea_orm::DatabaseConnection;
use tracing::debug;

use super::expression::{build_expression, RuleExpressionGroup};
use super::facts::Facts;
use crate::errors::ServiceError;

/// Compiled rule sets, cached by root id.
///
/// A child set is compiled into every parent that references it, so any
/// rule mutation clears the whole cache. The generation counter keeps a
/// compile that raced with a mutation from caching its stale result.
#[derive(Clone)]
pub struct RuleEngine {
    cache: Cache<i32, Arc<RuleExpressionGroup>>,
    generation: Arc<AtomicU64>,
}

impl Default for RuleEngine {
    fn default() -> Self { Self::new(1_000) }
}

impl RuleEngine {
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).time_to_idle(Duration::from_secs(30 * 60)).build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn expression(&self, db: &DatabaseConnection, rule_set_id: i32) -> Result<Arc<RuleExpressionGroup>, ServiceError> {
        if let Some(hit) = self.cache.get(&rule_set_id).await {
            return Ok(hit);
        }
        let generation = self.generation.load(Ordering::Acquire);
        let compiled = Arc::new(build_expression(db, rule_set_id).await?);
        debug!(rule_set_id, rules = compiled.rule_count(), "compiled rule set");
        self.store(rule_set_id, generation, compiled.clone()).await;
        Ok(compiled)
    }

    /// Caches `compiled` unless the cache was invalidated after `generation` was read.
    async fn store(&self, rule_set_id: i32, generation: u64, compiled: Arc<RuleExpressionGroup>) {
        if self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        self.cache.insert(rule_set_id, compiled).await;
        // an invalidation between the check and the insert may have missed this entry
        if self.generation.load(Ordering::Acquire) != generation {
            self.cache.invalidate(&rule_set_id).await;
        }
    }

    pub async fn matches(&self, db: &DatabaseConnection, rule_set_id: i32, facts: &dyn Facts) -> Result<bool, ServiceError> {
        Ok(self.expression(db, rule_set_id).await?.evaluate(facts))
    }

    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::rule_set::{LogicalOperator, RuleScope};

    fn compiled(id: i32) -> Arc<RuleExpressionGroup> {
        Arc::new(RuleExpressionGroup {
            rule_set_id: id,
            scope: RuleScope::Cart,
            is_active: true,
            logical_operator: LogicalOperator::And,
            expressions: Vec::new(),
        })
    }

    #[tokio::test]
    async fn compile_racing_an_invalidation_is_not_cached() {
        let engine = RuleEngine::default();
        let generation = engine.generation.load(Ordering::Acquire);
        engine.clone().invalidate();
        engine.store(7, generation, compiled(7)).await;
        assert!(engine.cache.get(&7).await.is_none());

        let generation = engine.generation.load(Ordering::Acquire);
        engine.store(7, generation, compiled(7)).await;
        assert_eq!(engine.cache.get(&7).await.map(|g| g.rule_set_id), Some(7));

        engine.invalidate();
        assert!(engine.cache.get(&7).await.is_none());
    }
}
