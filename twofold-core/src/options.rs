/*!
Open-ended option bags forwarded to codec backends.

The dispatcher treats a [`BackendOptions`] as opaque: it only ever moves the
logical `columns` selection into the backend's own key. Each backend reads the
keys it understands through an [`OptionReader`] and rejects anything left over,
the way a keyword-argument function rejects unexpected keywords.
*/

use crate::config::StorageOptions;
use crate::{Result, TwofoldError};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key under which callers may pass extra storage connection options.
pub const STORAGE_OPTIONS_KEY: &str = "storage_options";

/// Options forwarded verbatim to a backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendOptions {
    entries: BTreeMap<String, Value>,
}

impl BackendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Start consuming the bag on behalf of `backend`
    pub fn reader(self, backend: &'static str) -> OptionReader {
        OptionReader {
            backend,
            entries: self.entries,
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for BackendOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Typed, consuming access to a [`BackendOptions`] bag
#[derive(Debug)]
pub struct OptionReader {
    backend: &'static str,
    entries: BTreeMap<String, Value>,
}

impl OptionReader {
    fn invalid(&self, key: &str, reason: impl Into<String>) -> TwofoldError {
        TwofoldError::invalid_option(self.backend, key, reason)
    }

    pub fn take_bool(&mut self, key: &str) -> Result<Option<bool>> {
        match self.entries.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(other) => Err(self.invalid(key, format!("expected a boolean, got {other}"))),
        }
    }

    pub fn take_usize(&mut self, key: &str) -> Result<Option<usize>> {
        match self.entries.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| *n > 0)
                .map(Some)
                .ok_or_else(|| self.invalid(key, format!("expected a positive integer, got {n}"))),
            Some(other) => Err(self.invalid(key, format!("expected a positive integer, got {other}"))),
        }
    }

    pub fn take_string(&mut self, key: &str) -> Result<Option<String>> {
        match self.entries.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.invalid(key, format!("expected a string, got {other}"))),
        }
    }

    /// A single-byte delimiter such as `","` or `"\t"`
    pub fn take_byte(&mut self, key: &str) -> Result<Option<u8>> {
        match self.take_string(key)? {
            None => Ok(None),
            Some(s) if s.len() == 1 => Ok(Some(s.as_bytes()[0])),
            Some(s) => Err(self.invalid(key, format!("expected a single ASCII character, got {s:?}"))),
        }
    }

    pub fn take_string_list(&mut self, key: &str) -> Result<Option<Vec<String>>> {
        match self.entries.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(self.invalid(key, format!("expected column names, got {other}"))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(other) => Err(self.invalid(key, format!("expected a list of strings, got {other}"))),
        }
    }

    /// The `storage_options` object, if the caller supplied one
    pub fn take_storage_options(&mut self) -> Result<Option<StorageOptions>> {
        match self.entries.remove(STORAGE_OPTIONS_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(
                map.into_iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => (k, s),
                        other => (k, other.to_string()),
                    })
                    .collect(),
            )),
            Some(other) => Err(self.invalid(
                STORAGE_OPTIONS_KEY,
                format!("expected an object, got {other}"),
            )),
        }
    }

    /// Fail on any key the backend did not consume
    pub fn finish(self) -> Result<()> {
        match self.entries.keys().next() {
            None => Ok(()),
            Some(key) => Err(self.invalid(key, "unexpected option")),
        }
    }
}
