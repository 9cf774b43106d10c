//! Discount administration: the actions behind the admin discount screens.

pub mod input;
pub mod normalizer;
pub mod store;

pub use input::{RawInput, RawValue};
pub use normalizer::DiscountRuleNormalizer;
pub use store::{DiscountStore, InMemoryDiscountStore};

use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::errors::ServiceError;
use crate::models::discount::DiscountRule;
use crate::services::catalog::{CatalogEntry, ProductCatalog, ProductTypeCatalog, UserGroupCatalog};
use crate::views::{View, DISCOUNT_EDIT, DISCOUNT_INDEX};

pub const SAVED_NOTICE: &str = "Discount saved.";
pub const SAVE_FAILED: &str = "Couldn’t save discount.";
pub const REORDER_FAILED: &str = "Couldn’t reorder discounts.";
pub const NEW_DISCOUNT_TITLE: &str = "Create a Discount";

/// Separator of the `productIds` query parameter on the new-discount form.
const PRODUCT_ID_SEPARATOR: char = '|';

/// Behavior switches for [`DiscountService`].
#[derive(Debug, Clone)]
pub struct DiscountSettings {
    pub percent_symbol: String,
    /// User groups only exist on editions that have them.
    pub user_groups_enabled: bool,
}

impl Default for DiscountSettings {
    fn default() -> Self {
        Self {
            percent_symbol: normalizer::DEFAULT_PERCENT_SYMBOL.to_string(),
            user_groups_enabled: true,
        }
    }
}

#[derive(Clone)]
pub struct DiscountService {
    store: Arc<dyn DiscountStore>,
    products: Arc<dyn ProductCatalog>,
    product_types: Arc<dyn ProductTypeCatalog>,
    user_groups: Arc<dyn UserGroupCatalog>,
    normalizer: DiscountRuleNormalizer,
    user_groups_enabled: bool,
}

impl DiscountService {
    pub fn new(
        store: Arc<dyn DiscountStore>,
        products: Arc<dyn ProductCatalog>,
        product_types: Arc<dyn ProductTypeCatalog>,
        user_groups: Arc<dyn UserGroupCatalog>,
        settings: DiscountSettings,
    ) -> Self {
        Self {
            store,
            products,
            product_types,
            user_groups,
            normalizer: DiscountRuleNormalizer::new(settings.percent_symbol),
            user_groups_enabled: settings.user_groups_enabled,
        }
    }

    /// Lists every discount in priority order.
    #[instrument(skip(self))]
    pub async fn index(&self) -> Result<View, ServiceError> {
        let discounts = self.store.all().await?;
        Ok(View::new(DISCOUNT_INDEX, json!({ "discounts": discounts })))
    }

    /// Builds the edit form for an existing discount, or a blank one when
    /// `id` is `None`. For a new discount, `product_ids_param` may preselect
    /// products as a `|`-separated id list.
    #[instrument(skip(self))]
    pub async fn edit(
        &self,
        id: Option<i64>,
        product_ids_param: Option<&str>,
    ) -> Result<View, ServiceError> {
        let discount = match id {
            Some(id) => self.get_discount(id).await?,
            None => DiscountRule::default(),
        };

        let title = if discount.is_new() {
            NEW_DISCOUNT_TITLE.to_string()
        } else {
            discount.name.clone()
        };

        let groups = if self.user_groups_enabled {
            id_name_map(self.user_groups.list_all().await?)
        } else {
            BTreeMap::new()
        };
        let types = id_name_map(self.product_types.list_all().await?);

        let product_ids: Vec<i64> = if discount.is_new() {
            parse_product_ids_param(product_ids_param.unwrap_or_default())
        } else {
            discount.product_ids.iter().copied().collect()
        };
        let mut products = Vec::with_capacity(product_ids.len());
        for product_id in product_ids {
            if let Some(product) = self.products.get_by_id(product_id).await? {
                products.push(product);
            }
        }

        Ok(View::new(
            DISCOUNT_EDIT,
            json!({
                "id": id,
                "title": title,
                "discount": discount,
                "groups": groups,
                "types": types,
                "products": products,
                "percentSymbol": self.normalizer.percent_symbol(),
            }),
        ))
    }

    /// Normalizes and stores a submitted discount, returning it with its id.
    #[instrument(skip(self, input))]
    pub async fn save(&self, input: &RawInput) -> Result<DiscountRule, ServiceError> {
        let mut discount = self.normalizer.normalize(input).map_err(|errors| {
            warn!("{} {}", SAVE_FAILED, errors);
            ServiceError::ValidationError(errors)
        })?;

        let id = self.store.save(discount.clone()).await?;
        discount.id = Some(id);
        info!(discount_id = id, "{}", SAVED_NOTICE);

        // The store owns usage counters and default positions.
        Ok(self.store.get_by_id(id).await?.unwrap_or(discount))
    }

    #[instrument(skip(self))]
    pub async fn reorder(&self, ids: &[i64]) -> Result<bool, ServiceError> {
        let reordered = self.store.reorder(ids).await?;
        if !reordered {
            warn!("{}", REORDER_FAILED);
        }
        Ok(reordered)
    }

    /// Deleting an unknown id is not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        if self.store.delete(id).await? {
            info!(discount_id = id, "Discount deleted");
        } else {
            warn!(discount_id = id, "Discount to delete was not found");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn clear_coupon_usage_history(&self, id: i64) -> Result<(), ServiceError> {
        self.store.clear_usage_history(id).await?;
        info!(discount_id = id, "Coupon usage history cleared");
        Ok(())
    }

    async fn get_discount(&self, id: i64) -> Result<DiscountRule, ServiceError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Discount {} not found", id)))
    }
}

fn id_name_map(entries: Vec<CatalogEntry>) -> BTreeMap<i64, String> {
    entries
        .into_iter()
        .map(|entry| (entry.id, entry.name))
        .collect()
}

/// Unreadable ids are skipped, like ids the catalog does not know.
fn parse_product_ids_param(param: &str) -> Vec<i64> {
    param
        .split(PRODUCT_ID_SEPARATOR)
        .filter_map(|id| id.trim().parse::<i64>().ok())
        .collect()
}
