//! Turns a raw admin form submission into a canonical [`DiscountRule`].
//!
//! Users enter discounts as positive magnitudes ("5 off", "10%"); the stored
//! rule carries them as negative reductions. Normalization is only defined on
//! that user-facing form: stored values fed back in are rejected, never
//! negated a second time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;
use tracing::debug;

use super::input::{RawInput, RawValue};
use crate::errors::{DiscountValidationError, ValidationErrors};
use crate::models::discount::DiscountRule;

pub const DEFAULT_PERCENT_SYMBOL: &str = "%";

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// The raw value could not be read as the field's type.
#[derive(Debug)]
struct Uncoercible;

type Apply = fn(&mut DiscountRule, Option<&RawValue>) -> Result<(), Uncoercible>;

/// Maps a raw parameter onto a rule field.
struct FieldSpec {
    key: &'static str,
    apply: Apply,
}

macro_rules! field {
    ($key:literal, |$rule:ident, $raw:ident| $assign:expr) => {
        FieldSpec {
            key: $key,
            apply: |$rule, $raw| {
                $assign;
                Ok(())
            },
        }
    };
}

/// Fields copied onto the rule with plain type coercion.
const DIRECT_FIELDS: &[FieldSpec] = &[
    field!("id", |r, v| r.id = record_id(v)?),
    field!("name", |r, v| r.name = text(v)?),
    field!("description", |r, v| r.description = text(v)?),
    field!("enabled", |r, v| r.enabled = boolean(v)?),
    field!("stopProcessing", |r, v| r.stop_processing = boolean(v)?),
    field!("sortOrder", |r, v| r.sort_order = optional_int(v)?),
    field!("purchaseTotal", |r, v| r.purchase_total = decimal(v)?.unwrap_or_default()),
    field!("purchaseQty", |r, v| r.purchase_qty = count(v)?),
    field!("maxPurchaseQty", |r, v| r.max_purchase_qty = count(v)?),
    field!("freeShipping", |r, v| r.free_shipping = boolean(v)?),
    field!("excludeOnSale", |r, v| r.exclude_on_sale = boolean(v)?),
    field!("code", |r, v| r.code = Some(text(v)?).filter(|c| !c.is_empty())),
    field!("perUserLimit", |r, v| r.per_user_limit = count(v)?),
    field!("perEmailLimit", |r, v| r.per_email_limit = count(v)?),
    field!("totalUseLimit", |r, v| r.total_use_limit = count(v)?),
];

/// Magnitudes entered as positive amounts and stored negated.
const AMOUNT_FIELDS: &[FieldSpec] = &[
    field!("baseDiscount", |r, v| r.base_discount = discount_amount(v)?),
    field!("perItemDiscount", |r, v| r.per_item_discount = discount_amount(v)?),
];

const DATE_FIELDS: &[FieldSpec] = &[
    field!("dateFrom", |r, v| r.date_from = date(v)?),
    field!("dateTo", |r, v| r.date_to = date(v)?),
];

/// Related-record id sets; the keys are the form parameter names.
const RELATION_FIELDS: &[FieldSpec] = &[
    field!("products", |r, v| r.product_ids = id_set(v)?),
    field!("productTypes", |r, v| r.product_type_ids = id_set(v)?),
    field!("groups", |r, v| r.user_group_ids = id_set(v)?),
];

const PERCENT_FIELD: &str = "percentDiscount";

#[derive(Debug, Clone)]
pub struct DiscountRuleNormalizer {
    percent_symbol: String,
}

impl Default for DiscountRuleNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_PERCENT_SYMBOL)
    }
}

impl DiscountRuleNormalizer {
    pub fn new(percent_symbol: impl Into<String>) -> Self {
        Self {
            percent_symbol: percent_symbol.into(),
        }
    }

    pub fn percent_symbol(&self) -> &str {
        &self.percent_symbol
    }

    /// Normalizes one submission, collecting every field error before failing.
    pub fn normalize(&self, input: &RawInput) -> Result<DiscountRule, ValidationErrors> {
        let mut rule = DiscountRule::default();
        let mut errors = ValidationErrors::new();

        apply_fields(
            &mut rule,
            input,
            DIRECT_FIELDS,
            &mut errors,
            DiscountValidationError::InvalidField,
        );
        apply_fields(
            &mut rule,
            input,
            AMOUNT_FIELDS,
            &mut errors,
            DiscountValidationError::InvalidAmount,
        );
        apply_fields(
            &mut rule,
            input,
            DATE_FIELDS,
            &mut errors,
            DiscountValidationError::InvalidDate,
        );

        match self.percent_discount(input.get(PERCENT_FIELD)) {
            Ok(percent) => rule.percent_discount = percent,
            Err(err) => errors.push(err),
        }

        apply_fields(
            &mut rule,
            input,
            RELATION_FIELDS,
            &mut errors,
            DiscountValidationError::InvalidField,
        );

        if let (Some(from), Some(to)) = (rule.date_from, rule.date_to) {
            if from > to {
                errors.push(DiscountValidationError::InvalidDateRange);
            }
        }

        if !errors.is_empty() {
            debug!(error_count = errors.len(), "Discount input rejected: {}", errors);
        }
        errors.into_result(rule)
    }

    /// Reads the percent field as a stored fraction in `[-1, 0]`.
    ///
    /// Input carrying the percent symbol, or any value `>= 1`, is a
    /// percentage and gets divided by 100. Smaller values are taken as
    /// fractions already. So a bare `1` means 1%, not 100%; existing data
    /// depends on that reading.
    fn percent_discount(
        &self,
        raw: Option<&RawValue>,
    ) -> Result<Decimal, DiscountValidationError> {
        let invalid = DiscountValidationError::InvalidField(PERCENT_FIELD);

        let (has_symbol, value) = match raw {
            None | Some(RawValue::Null) => return Ok(Decimal::ZERO),
            Some(RawValue::Text(text)) => {
                let has_symbol = !self.percent_symbol.is_empty()
                    && text.contains(self.percent_symbol.as_str());
                let digits = if has_symbol {
                    text.replace(self.percent_symbol.as_str(), "")
                } else {
                    text.clone()
                };
                let digits = digits.trim();
                match parse_decimal(digits) {
                    Ok(Some(value)) => (has_symbol, value),
                    Ok(None) => return Ok(Decimal::ZERO),
                    Err(Uncoercible) if beyond_decimal(digits.parse().ok()) => {
                        return Err(DiscountValidationError::PercentOutOfRange)
                    }
                    Err(Uncoercible) => return Err(invalid),
                }
            }
            Some(RawValue::Number(n)) => match Decimal::from_f64(*n) {
                Some(value) => (false, value),
                None if beyond_decimal(Some(*n)) => {
                    return Err(DiscountValidationError::PercentOutOfRange)
                }
                None => return Err(invalid),
            },
            Some(RawValue::Bool(_) | RawValue::List(_)) => return Err(invalid),
        };

        let stored = if has_symbol || value >= Decimal::ONE {
            negate(value / dec!(100))
        } else {
            negate(value)
        };

        if stored < Decimal::NEGATIVE_ONE || stored > Decimal::ZERO {
            return Err(DiscountValidationError::PercentOutOfRange);
        }
        Ok(stored)
    }
}

/// A finite number too large for `Decimal`, which no percent can be.
fn beyond_decimal(number: Option<f64>) -> bool {
    number.map_or(false, f64::is_finite)
}

fn apply_fields(
    rule: &mut DiscountRule,
    input: &RawInput,
    fields: &[FieldSpec],
    errors: &mut ValidationErrors,
    on_error: fn(&'static str) -> DiscountValidationError,
) {
    for field in fields {
        if (field.apply)(rule, input.get(field.key)).is_err() {
            errors.push(on_error(field.key));
        }
    }
}

/// `-0` never reaches a stored rule.
fn negate(value: Decimal) -> Decimal {
    if value.is_zero() {
        Decimal::ZERO
    } else {
        -value
    }
}

fn parse_decimal(text: &str) -> Result<Option<Decimal>, Uncoercible> {
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(text))
        .map(Some)
        .map_err(|_| Uncoercible)
}

/// `None` for anything blank.
fn decimal(raw: Option<&RawValue>) -> Result<Option<Decimal>, Uncoercible> {
    match raw {
        None | Some(RawValue::Null) => Ok(None),
        Some(RawValue::Text(text)) => parse_decimal(text.trim()),
        Some(RawValue::Number(n)) => Decimal::from_f64(*n).map(Some).ok_or(Uncoercible),
        Some(RawValue::Bool(_) | RawValue::List(_)) => Err(Uncoercible),
    }
}

fn integral(raw: Option<&RawValue>) -> Result<Option<Decimal>, Uncoercible> {
    match decimal(raw)? {
        Some(value) if !value.fract().is_zero() => Err(Uncoercible),
        other => Ok(other),
    }
}

fn optional_int(raw: Option<&RawValue>) -> Result<Option<i32>, Uncoercible> {
    integral(raw)?
        .map(|value| value.to_i32().ok_or(Uncoercible))
        .transpose()
}

fn count(raw: Option<&RawValue>) -> Result<u32, Uncoercible> {
    match integral(raw)? {
        Some(value) => value.to_u32().ok_or(Uncoercible),
        None => Ok(0),
    }
}

fn record_id(raw: Option<&RawValue>) -> Result<Option<i64>, Uncoercible> {
    match integral(raw)? {
        Some(value) => match value.to_i64() {
            Some(id) if id > 0 => Ok(Some(id)),
            _ => Err(Uncoercible),
        },
        None => Ok(None),
    }
}

fn text(raw: Option<&RawValue>) -> Result<String, Uncoercible> {
    match raw {
        None | Some(RawValue::Null) => Ok(String::new()),
        Some(RawValue::Text(text)) => Ok(text.trim().to_string()),
        Some(RawValue::Number(n)) => Ok(n.to_string()),
        Some(RawValue::Bool(_) | RawValue::List(_)) => Err(Uncoercible),
    }
}

fn boolean(raw: Option<&RawValue>) -> Result<bool, Uncoercible> {
    match raw {
        None | Some(RawValue::Null) => Ok(false),
        Some(RawValue::Bool(b)) => Ok(*b),
        Some(RawValue::Number(n)) => Ok(*n != 0.0),
        Some(RawValue::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(true),
            "" | "0" | "false" | "off" | "no" => Ok(false),
            _ => Err(Uncoercible),
        },
        Some(RawValue::List(_)) => Err(Uncoercible),
    }
}

fn discount_amount(raw: Option<&RawValue>) -> Result<Decimal, Uncoercible> {
    match decimal(raw)? {
        Some(value) if value.is_sign_negative() && !value.is_zero() => Err(Uncoercible),
        Some(value) => Ok(negate(value)),
        None => Ok(Decimal::ZERO),
    }
}

fn date(raw: Option<&RawValue>) -> Result<Option<DateTime<Utc>>, Uncoercible> {
    match raw {
        None | Some(RawValue::Null) => Ok(None),
        Some(RawValue::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawValue::Text(text)) => parse_datetime(text.trim()).map(Some).ok_or(Uncoercible),
        Some(RawValue::Number(n)) if n.is_finite() && n.fract() == 0.0 => {
            DateTime::from_timestamp(*n as i64, 0).map(Some).ok_or(Uncoercible)
        }
        Some(_) => Err(Uncoercible),
    }
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed.and_utc());
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0).map(|midnight| midnight.and_utc());
    }
    text.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn related_id(raw: &RawValue) -> Result<i64, Uncoercible> {
    record_id(Some(raw))?.ok_or(Uncoercible)
}

fn id_set(raw: Option<&RawValue>) -> Result<BTreeSet<i64>, Uncoercible> {
    match raw {
        None => Ok(BTreeSet::new()),
        Some(value) if value.is_blank() => Ok(BTreeSet::new()),
        Some(RawValue::List(items)) => items
            .iter()
            .filter(|item| !item.is_blank())
            .map(related_id)
            .collect(),
        Some(single) => related_id(single).map(|id| BTreeSet::from([id])),
    }
}
