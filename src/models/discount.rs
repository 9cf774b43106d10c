use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Canonical discount rule as persisted by a [`DiscountStore`].
///
/// Amounts and the percent fraction are stored as reductions: `base_discount`,
/// `per_item_discount` and `percent_discount` are always `<= 0`, and
/// `percent_discount` never goes below `-1`.
///
/// [`DiscountStore`]: crate::services::discounts::DiscountStore
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRule {
    /// `None` until the store assigns one.
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    /// Suppress lower-priority rules once this one applies.
    pub stop_processing: bool,
    pub sort_order: Option<i32>,
    pub purchase_total: Decimal,
    pub purchase_qty: u32,
    pub max_purchase_qty: u32,
    pub free_shipping: bool,
    pub exclude_on_sale: bool,
    /// Coupon code a purchaser has to supply.
    pub code: Option<String>,
    pub per_user_limit: u32,
    pub per_email_limit: u32,
    pub total_use_limit: u32,
    /// Times the coupon has been redeemed. Owned by the store.
    #[serde(default)]
    pub total_uses: u32,
    pub base_discount: Decimal,
    pub per_item_discount: Decimal,
    pub percent_discount: Decimal,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub product_ids: BTreeSet<i64>,
    pub product_type_ids: BTreeSet<i64>,
    pub user_group_ids: BTreeSet<i64>,
}

impl DiscountRule {
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Coupon codes compare case-insensitively.
    pub fn has_code(&self, code: &str) -> bool {
        self.code
            .as_deref()
            .map_or(false, |own| own.eq_ignore_ascii_case(code.trim()))
    }
}
