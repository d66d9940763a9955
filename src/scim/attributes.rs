//! Attribute path → column mapping.
//!
//! Paths are matched exactly and case-sensitively. Callers register every
//! spelling they accept, including sub-attribute paths such as
//! `emails.value` next to a bare `emails`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::filter_to_sql::FilterToSqlError;

/// Mapping from SCIM attribute paths to SQL column references.
///
/// Columns are emitted verbatim. A column containing `?` breaks
/// [`number_placeholders`](super::number_placeholders), which renumbers every
/// `?` it finds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, String>);

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a mapping, returning `self` for chaining.
    pub fn with(mut self, path: impl Into<String>, column: impl Into<String>) -> Self {
        self.insert(path, column);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, column: impl Into<String>) -> Option<String> {
        self.0.insert(path.into(), column.into())
    }

    /// Resolve an attribute path to its column reference.
    ///
    /// # Errors
    ///
    /// Returns [`FilterToSqlError::UnresolvedAttribute`] if the path is not
    /// mapped.
    pub fn resolve(&self, path: &str) -> Result<&str, FilterToSqlError> {
        self.0
            .get(path)
            .map(String::as_str)
            .ok_or_else(|| FilterToSqlError::UnresolvedAttribute(path.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(path, column)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
