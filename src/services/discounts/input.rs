use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A loosely typed request parameter.
///
/// Absence is not a variant: a key missing from [`RawInput`] is absent, while
/// `Null` and empty `Text` are explicit "no value" submissions.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<RawValue>),
}

impl RawValue {
    /// `Null`, whitespace-only text and empty lists carry no value.
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(text) => text.trim().is_empty(),
            RawValue::List(items) => items.iter().all(RawValue::is_blank),
            RawValue::Bool(_) | RawValue::Number(_) => false,
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => n.as_f64().map_or(RawValue::Null, RawValue::Number),
            Value::String(s) => RawValue::Text(s),
            Value::Array(items) => RawValue::List(items.into_iter().map(RawValue::from).collect()),
            // Nested objects are not part of the form contract; keep them as
            // text so field coercion reports them as invalid.
            other @ Value::Object(_) => RawValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(items: Vec<T>) -> Self {
        RawValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Raw discount form submission keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "serde_json::Map<String, Value>")]
pub struct RawInput {
    fields: BTreeMap<String, RawValue>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }

    /// Builds input from url-encoded pairs. `key[]` pairs accumulate into a
    /// list under `key`; a repeated plain key keeps the last value.
    pub fn from_form_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut input = Self::new();
        for (key, value) in pairs {
            let value = RawValue::Text(value.into());
            match key.as_ref().strip_suffix("[]") {
                Some(list_key) => {
                    let entry = input
                        .fields
                        .entry(list_key.to_string())
                        .or_insert_with(|| RawValue::List(Vec::new()));
                    match entry {
                        RawValue::List(items) => items.push(value),
                        scalar => {
                            let previous = std::mem::replace(scalar, RawValue::Null);
                            *scalar = RawValue::List(vec![previous, value]);
                        }
                    }
                }
                None => {
                    input.fields.insert(key.as_ref().to_string(), value);
                }
            }
        }
        input
    }
}

impl From<serde_json::Map<String, Value>> for RawInput {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self {
            fields: map.into_iter().map(|(k, v)| (k, RawValue::from(v))).collect(),
        }
    }
}
