//! Parsed record instances.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ParseError, Result};

/// Record instances produced by a parse, keyed by destination.
///
/// # Examples
///
/// ```
/// use schema_args::ParsedArgs;
/// use serde_json::json;
///
/// let parsed = ParsedArgs::from_iter([("train".to_string(), json!({"lr": 0.1}))]);
/// assert_eq!(parsed.get_value("train"), Some(&json!({"lr": 0.1})));
/// assert!(parsed.get::<serde_json::Value>("valid").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    values: IndexMap<String, Value>,
}

impl ParsedArgs {
    /// The instance at `dest`, as a JSON value.
    pub fn get_value(&self, dest: &str) -> Option<&Value> {
        self.values.get(dest)
    }

    /// The instance at `dest`, deserialized into `T`.
    ///
    /// # Errors
    ///
    /// [`ParseError::MissingDestination`] when nothing was parsed at `dest`,
    /// [`ParseError::Deserialize`] when the instance does not fit `T`.
    pub fn get<T: DeserializeOwned>(&self, dest: &str) -> Result<T> {
        let value = self
            .values
            .get(dest)
            .ok_or_else(|| ParseError::MissingDestination(dest.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|source| ParseError::Deserialize {
            dest: dest.to_string(),
            source,
        })
    }

    /// Destinations in registration order.
    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// All instances as one JSON object keyed by destination.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }

    pub(crate) fn extend(&mut self, instances: IndexMap<String, Value>) {
        self.values.extend(instances);
    }
}

impl FromIterator<(String, Value)> for ParsedArgs {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
