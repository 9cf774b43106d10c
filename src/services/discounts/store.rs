use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::ServiceError;
use crate::models::discount::DiscountRule;

/// Persistence for discount rules.
#[async_trait]
pub trait DiscountStore: Send + Sync {
    /// All rules ordered by `sort_order`, then id.
    async fn all(&self) -> Result<Vec<DiscountRule>, ServiceError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<DiscountRule>, ServiceError>;

    /// Inserts a rule without id, updates one with an id. Returns the id.
    async fn save(&self, rule: DiscountRule) -> Result<i64, ServiceError>;

    /// Returns whether a rule was removed.
    async fn delete(&self, id: i64) -> Result<bool, ServiceError>;

    /// Rewrites `sort_order` to follow `ids`. Returns `false` and leaves the
    /// order untouched when any id is unknown.
    async fn reorder(&self, ids: &[i64]) -> Result<bool, ServiceError>;

    /// Forgets every recorded coupon use of the rule.
    async fn clear_usage_history(&self, id: i64) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct StoreState {
    rules: BTreeMap<i64, DiscountRule>,
    last_id: i64,
}

impl StoreState {
    /// Position after the last rule. Fails once the last rule already sits
    /// at `i32::MAX`.
    fn next_sort_order(&self) -> Result<i32, ServiceError> {
        self.rules
            .values()
            .filter_map(|rule| rule.sort_order)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| {
                ServiceError::BadRequest(
                    "No sort position left after the last discount; reorder the discounts first"
                        .to_string(),
                )
            })
    }

    fn code_taken_by_other(&self, rule: &DiscountRule) -> bool {
        let Some(code) = rule.code.as_deref() else {
            return false;
        };
        self.rules
            .values()
            .any(|other| other.id != rule.id && other.has_code(code))
    }
}

/// Process-local store. Each operation holds the lock for its whole duration.
#[derive(Debug, Default)]
pub struct InMemoryDiscountStore {
    state: RwLock<StoreState>,
}

impl InMemoryDiscountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one coupon redemption. Returns the new total.
    #[cfg(test)]
    pub(crate) async fn record_usage(&self, id: i64) -> Result<u32, ServiceError> {
        let mut state = self.state.write().await;
        let rule = state
            .rules
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Discount {} not found", id)))?;
        rule.total_uses = rule.total_uses.saturating_add(1);
        Ok(rule.total_uses)
    }
}

#[async_trait]
impl DiscountStore for InMemoryDiscountStore {
    async fn all(&self) -> Result<Vec<DiscountRule>, ServiceError> {
        let state = self.state.read().await;
        let mut rules: Vec<DiscountRule> = state.rules.values().cloned().collect();
        rules.sort_by_key(|rule| (rule.sort_order.unwrap_or(i32::MAX), rule.id));
        Ok(rules)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<DiscountRule>, ServiceError> {
        Ok(self.state.read().await.rules.get(&id).cloned())
    }

    async fn save(&self, mut rule: DiscountRule) -> Result<i64, ServiceError> {
        let mut state = self.state.write().await;

        if state.code_taken_by_other(&rule) {
            warn!(code = ?rule.code, "Coupon code already in use");
            return Err(ServiceError::Conflict(format!(
                "Coupon code {} is already used by another discount",
                rule.code.as_deref().unwrap_or_default()
            )));
        }

        let id = match rule.id {
            Some(id) => {
                let existing = state
                    .rules
                    .get(&id)
                    .ok_or_else(|| ServiceError::NotFound(format!("Discount {} not found", id)))?;
                rule.total_uses = existing.total_uses;
                if rule.sort_order.is_none() {
                    rule.sort_order = existing.sort_order;
                }
                id
            }
            None => {
                if rule.sort_order.is_none() {
                    rule.sort_order = Some(state.next_sort_order()?);
                }
                state.last_id += 1;
                rule.id = Some(state.last_id);
                rule.total_uses = 0;
                state.last_id
            }
        };

        debug!(discount_id = id, "Storing discount");
        state.rules.insert(id, rule);
        Ok(id)
    }

    async fn delete(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.state.write().await.rules.remove(&id).is_some())
    }

    async fn reorder(&self, ids: &[i64]) -> Result<bool, ServiceError> {
        let mut state = self.state.write().await;
        if let Some(unknown) = ids.iter().find(|id| !state.rules.contains_key(*id)) {
            warn!(discount_id = unknown, "Cannot reorder unknown discount");
            return Ok(false);
        }

        for (position, id) in ids.iter().enumerate() {
            let sort_order = i32::try_from(position + 1)
                .map_err(|_| ServiceError::BadRequest("Too many discounts to reorder".into()))?;
            if let Some(rule) = state.rules.get_mut(id) {
                rule.sort_order = Some(sort_order);
            }
        }
        Ok(true)
    }

    async fn clear_usage_history(&self, id: i64) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        let rule = state
            .rules
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Discount {} not found", id)))?;
        rule.total_uses = 0;
        Ok(())
    }
}
