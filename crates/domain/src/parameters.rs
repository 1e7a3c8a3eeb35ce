//! Case-insensitive parameter bag shared by signals and jobs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::ParameterValue;

/// Named parameter values with case-insensitive keys.
///
/// The spelling used on first insertion is kept for display and
/// serialisation; lookups ignore case. Insertion order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "HashMap<String, ParameterValue>",
    into = "HashMap<String, ParameterValue>"
)]
pub struct Parameters {
    entries: HashMap<String, (String, ParameterValue)>,
}

/// Normalised key used for case-insensitive parameter names.
pub(crate) fn fold(name: &str) -> String {
    name.to_lowercase()
}

impl Parameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Replacing keeps the original spelling.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        let name = name.into();
        let value = value.into();
        self.entries
            .entry(fold(&name))
            .and_modify(|entry| entry.1 = value.clone())
            .or_insert((name, value));
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.insert(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.entries.get(&fold(name)).map(|(_, value)| value)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&fold(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value))
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<ParameterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl From<HashMap<String, ParameterValue>> for Parameters {
    fn from(map: HashMap<String, ParameterValue>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Parameters> for HashMap<String, ParameterValue> {
    fn from(params: Parameters) -> Self {
        params.entries.into_values().collect()
    }
}
