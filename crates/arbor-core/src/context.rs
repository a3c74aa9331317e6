//! Request-scoped context.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Key under which every context records why data is being requested.
pub const PURPOSE: &str = "purpose";

/// Immutable string-keyed request metadata.
///
/// A context always holds a [`PURPOSE`] entry; every constructor enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct Context {
    contents: BTreeMap<String, String>,
}

impl Context {
    pub fn new(purpose: impl Into<String>) -> Self {
        let mut contents = BTreeMap::new();
        contents.insert(PURPOSE.to_string(), purpose.into());
        Self { contents }
    }

    /// Return a copy of this context with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.contents.insert(key.into(), value.into());
        self
    }

    pub fn purpose(&self) -> &str {
        self.get(PURPOSE).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.contents.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.contents.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.contents.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

impl TryFrom<BTreeMap<String, String>> for Context {
    type Error = CoreError;

    fn try_from(contents: BTreeMap<String, String>) -> Result<Self> {
        if !contents.contains_key(PURPOSE) {
            return Err(CoreError::invalid_context(format!(
                "context must contain a '{PURPOSE}' entry"
            )));
        }
        Ok(Self { contents })
    }
}

impl From<Context> for BTreeMap<String, String> {
    fn from(context: Context) -> Self {
        context.contents
    }
}
