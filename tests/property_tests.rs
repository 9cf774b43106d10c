//! Property-based tests for discount input normalization.
//!
//! These tests use proptest to check the numeric conventions of stored
//! discounts across a wide range of user-entered values.

use discount_admin::errors::{DiscountValidationError, ValidationErrors};
use discount_admin::models::DiscountRule;
use discount_admin::services::discounts::{DiscountRuleNormalizer, RawInput};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

// Strategies for generating test data
fn amount_strategy() -> impl Strategy<Value = String> {
    (0u64..1_000_000, 0u8..100).prop_map(|(units, cents)| format!("{}.{:02}", units, cents))
}

fn percentage_strategy() -> impl Strategy<Value = String> {
    (1u32..=100, 0u8..100).prop_map(|(whole, frac)| {
        if whole == 100 {
            "100".to_string()
        } else {
            format!("{}.{:02}", whole, frac)
        }
    })
}

fn fraction_strategy() -> impl Strategy<Value = String> {
    (0u32..10_000).prop_map(|n| format!("0.{:04}", n))
}

fn normalize(input: RawInput) -> Result<DiscountRule, ValidationErrors> {
    DiscountRuleNormalizer::default().normalize(&input)
}

fn dec(text: &str) -> Decimal {
    Decimal::from_str(text).unwrap()
}

// Property: entered magnitudes are stored negated
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn amounts_are_stored_negated(base in amount_strategy(), per_item in amount_strategy()) {
        let rule = normalize(
            RawInput::new()
                .with("baseDiscount", base.as_str())
                .with("perItemDiscount", per_item.as_str()),
        )
        .unwrap();

        prop_assert_eq!(rule.base_discount, -dec(&base));
        prop_assert_eq!(rule.per_item_discount, -dec(&per_item));
        prop_assert!(rule.base_discount <= Decimal::ZERO);
    }

    #[test]
    fn stored_amounts_are_not_accepted_back(amount in 1u64..1_000_000) {
        let result = normalize(RawInput::new().with("baseDiscount", format!("-{}", amount)));
        let errors = result.unwrap_err();
        prop_assert!(errors.contains(&DiscountValidationError::InvalidAmount("baseDiscount")));
    }
}

// Property: percent discounts always land in [-1, 0]
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn percentages_at_or_above_one_are_divided(p in percentage_strategy()) {
        let rule = normalize(RawInput::new().with("percentDiscount", p.as_str())).unwrap();
        prop_assert_eq!(rule.percent_discount, -(dec(&p) / Decimal::ONE_HUNDRED));
    }

    #[test]
    fn fractions_below_one_are_kept(p in fraction_strategy()) {
        let rule = normalize(RawInput::new().with("percentDiscount", p.as_str())).unwrap();
        prop_assert_eq!(rule.percent_discount, -dec(&p));
    }

    #[test]
    fn percent_symbol_always_divides(p in fraction_strategy()) {
        let rule = normalize(RawInput::new().with("percentDiscount", format!("{}%", p))).unwrap();
        prop_assert_eq!(rule.percent_discount, -(dec(&p) / Decimal::ONE_HUNDRED));
    }

    #[test]
    fn stored_percent_stays_in_range(p in 0u32..100_000) {
        let value = Decimal::new(i64::from(p), 2);
        match normalize(RawInput::new().with("percentDiscount", value.to_string())) {
            Ok(rule) => {
                prop_assert!(rule.percent_discount >= Decimal::NEGATIVE_ONE);
                prop_assert!(rule.percent_discount <= Decimal::ZERO);
            }
            Err(errors) => {
                prop_assert!(value > Decimal::ONE_HUNDRED);
                prop_assert!(errors.contains(&DiscountValidationError::PercentOutOfRange));
            }
        }
    }
}

// Property: id sets ignore order and duplicates
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn product_ids_become_a_set(ids in proptest::collection::vec(1i64..10_000, 0..20)) {
        let raw: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let rule = normalize(RawInput::new().with("products", raw)).unwrap();

        let expected: std::collections::BTreeSet<i64> = ids.into_iter().collect();
        prop_assert_eq!(rule.product_ids, expected);
    }
}

#[test]
fn exactly_one_means_one_percent() {
    let rule = normalize(RawInput::new().with("percentDiscount", "1")).unwrap();
    assert_eq!(rule.percent_discount, dec("-0.01"));
}

#[test]
fn blank_input_yields_an_empty_rule() {
    let rule = normalize(
        RawInput::new()
            .with("dateFrom", "")
            .with("products", "")
            .with("groups", Vec::<String>::new()),
    )
    .unwrap();

    assert!(rule.date_from.is_none());
    assert!(rule.product_ids.is_empty());
    assert!(rule.user_group_ids.is_empty());
    assert_eq!(rule.percent_discount, Decimal::ZERO);
}
