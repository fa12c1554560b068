//! Keyed string values from the query string, form bodies and path parameters.
//!
//! Keyed sources only ever carry strings. They are grouped by key and turned
//! into a JSON object whose values are strings (one value) or arrays of
//! strings (repeated keys); typing happens later in the lenient decoder.

use hermes_core::{ArgShape, Params};
use serde_json::{Map, Value};

use crate::error::{ExtractionError, ExtractionSource};

/// Ordered multimap of string keys to string values.
///
/// # Example
///
/// ```rust
/// use hermes_core::ArgShape;
/// use hermes_extract::KeyedValues;
///
/// let values = KeyedValues::from_urlencoded("tag=a&tag=b&Limit=5").unwrap();
/// assert_eq!(values.get("tag"), Some(&["a".to_string(), "b".to_string()][..]));
///
/// let shape = ArgShape::Record { name: "Search", fields: &["tag", "limit"] };
/// let object = values.into_object(&shape);
/// assert_eq!(object["limit"], "5");
/// assert_eq!(object["tag"], serde_json::json!(["a", "b"]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedValues {
    entries: Vec<(String, Vec<String>)>,
}

impl KeyedValues {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `application/x-www-form-urlencoded` data such as a query string.
    pub fn from_urlencoded(input: &str) -> Result<Self, serde_urlencoded::de::Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(input)?;
        Ok(pairs.into_iter().collect())
    }

    /// Parses the query string of a request.
    pub fn from_query(query: Option<&str>) -> Result<Self, ExtractionError> {
        match query {
            Some(q) if !q.is_empty() => Self::from_urlencoded(q)
                .map_err(|e| ExtractionError::malformed(ExtractionSource::Query, e)),
            _ => Ok(Self::new()),
        }
    }

    /// Collects path parameters in capture order.
    #[must_use]
    pub fn from_params(params: &Params) -> Self {
        params.iter().collect()
    }

    /// Appends one value under `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Appends every value of `other` after the values already present.
    pub fn extend(&mut self, other: Self) {
        for (key, values) in other.entries {
            for value in values {
                self.append(key.clone(), value);
            }
        }
    }

    /// Values stored under `key`, in insertion order.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Whether no key is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Builds the JSON object for an argument of the given shape.
    ///
    /// Records keep only keys that name a field, matched exactly first and
    /// case-insensitively otherwise; unknown keys are dropped. Maps keep every
    /// key. Sequences have no keys, so the result is empty.
    #[must_use]
    pub fn into_object(self, shape: &ArgShape) -> Map<String, Value> {
        let mut grouped = KeyedValues::new();
        match shape {
            ArgShape::Sequence => {
                if !self.is_empty() {
                    tracing::debug!(keys = self.len(), "sequence argument ignores keyed values");
                }
            }
            ArgShape::Map => grouped = self,
            ArgShape::Record { fields, .. } => {
                for (key, values) in self.entries {
                    match match_field(&key, *fields) {
                        Some(field) => {
                            for value in values {
                                grouped.append(field, value);
                            }
                        }
                        None => tracing::trace!(key = %key, "ignoring unknown key"),
                    }
                }
            }
        }

        grouped
            .entries
            .into_iter()
            .map(|(key, mut values)| {
                let value = if values.len() == 1 {
                    Value::String(values.remove(0))
                } else {
                    Value::Array(values.into_iter().map(Value::String).collect())
                };
                (key, value)
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for KeyedValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (k, v) in iter {
            values.append(k, v);
        }
        values
    }
}

/// Resolves `key` to one of `fields`: exact match first, then a
/// case-insensitive one.
pub(crate) fn match_field(key: &str, fields: &'static [&'static str]) -> Option<&'static str> {
    fields
        .iter()
        .find(|f| **f == key)
        .or_else(|| fields.iter().find(|f| eq_fold(f, key)))
        .copied()
}

fn eq_fold(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
