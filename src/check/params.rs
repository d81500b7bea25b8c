//! Keyword parameters supplied to a check.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CheckError, Result};

/// Default value declared on a check spec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Str(&'static str),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Literal {
    pub fn to_value(self) -> Value {
        match self {
            Literal::Str(s) => Value::String(s.to_string()),
            Literal::Int(i) => Value::from(i),
            Literal::Float(f) => Value::from(f),
            Literal::Bool(b) => Value::Bool(b),
        }
    }
}

/// Name to value mapping of check parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Merge declared defaults with caller overrides. Overrides win.
    pub fn merged(defaults: &[(&'static str, Literal)], overrides: &Parameters) -> Self {
        let mut params = Parameters::new();
        for (key, literal) in defaults {
            params.insert(key, literal.to_value());
        }
        for (key, value) in &overrides.0 {
            params.0.insert(key.clone(), value.clone());
        }
        params
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The keys from `required` that are absent, in declaration order.
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|key| !self.contains(key))
            .collect()
    }

    /// Render a parameter as text, the way it appears in messages.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(display_value)
    }

    /// Like [`Parameters::text`] but a missing key is a parameter error.
    pub fn require_text(&self, key: &str) -> Result<String> {
        self.text(key)
            .ok_or_else(|| CheckError::Parameter(format!("missing parameter '{}'", key)))
    }

    /// Read a numeric parameter. Numeric strings are accepted.
    pub fn require_f64(&self, key: &str) -> Result<f64> {
        let value = self
            .get(key)
            .ok_or_else(|| CheckError::Parameter(format!("missing parameter '{}'", key)))?;
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            CheckError::Parameter(format!("parameter '{}' is not a number: {}", key, value))
        })
    }

    /// Read a boolean parameter, falling back to `default` when absent.
    pub fn flag(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(CheckError::Parameter(format!(
                    "parameter '{}' is not a boolean: {}",
                    key, s
                ))),
            },
            Some(other) => Err(CheckError::Parameter(format!(
                "parameter '{}' is not a boolean: {}",
                key, other
            ))),
        }
    }

    /// Read a list parameter given either as an array or a `separator`-joined string.
    pub fn list(&self, key: &str, separator: char) -> Vec<String> {
        match self.get(key) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(display_value).collect(),
            Some(Value::String(s)) if s.is_empty() => Vec::new(),
            Some(Value::String(s)) => s.split(separator).map(str::to_string).collect(),
            Some(other) => vec![display_value(other)],
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Parameters(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Strings render bare; everything else renders as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_overrides_win() {
        let defaults = [
            ("threshold", Literal::Int(2)),
            ("strictness", Literal::Str("hard")),
        ];
        let overrides = Parameters::new().with("strictness", "soft");
        let params = Parameters::merged(&defaults, &overrides);

        assert_eq!(params.text("threshold").as_deref(), Some("2"));
        assert_eq!(params.text("strictness").as_deref(), Some("soft"));
    }

    #[test]
    fn test_missing_reports_all_keys() {
        let params = Parameters::new().with("delimiter", "_");
        assert_eq!(
            params.missing(&["delimiter", "extension", "order"]),
            vec!["extension", "order"]
        );
    }

    #[test]
    fn test_require_f64_accepts_numeric_strings() {
        let params = Parameters::new().with("minimum", "200").with("maximum", 330.5);
        assert_eq!(params.require_f64("minimum").unwrap(), 200.0);
        assert_eq!(params.require_f64("maximum").unwrap(), 330.5);

        let bad = Parameters::new().with("minimum", "cold");
        assert!(matches!(
            bad.require_f64("minimum"),
            Err(CheckError::Parameter(_))
        ));
    }

    #[test]
    fn test_list_from_string_or_array() {
        let params = Parameters::new()
            .with("order", "institution_id~realm~frequency")
            .with("ignore", serde_json::json!(["realm"]));
        assert_eq!(
            params.list("order", '~'),
            vec!["institution_id", "realm", "frequency"]
        );
        assert_eq!(params.list("ignore", '~'), vec!["realm"]);
        assert!(params.list("absent", '~').is_empty());
    }

    #[test]
    fn test_flag_parsing() {
        let params = Parameters::new()
            .with("a", true)
            .with("b", "false")
            .with("c", "maybe");
        assert!(params.flag("a", false).unwrap());
        assert!(!params.flag("b", true).unwrap());
        assert!(params.flag("missing", true).unwrap());
        assert!(params.flag("c", true).is_err());
    }
}
