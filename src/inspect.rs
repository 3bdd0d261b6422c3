//! Decoding of `buildah inspect` reports.
//!
//! The report is kept as a raw [`serde_json::Value`]; entity views read
//! derived fields out of it through the helpers here and memoize them in a
//! [`FieldCache`].

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde_json::Value;

use crate::error::Result;

/// What an inspect call should resolve the name-or-id against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Image,
    Container,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Image => "image",
            EntityKind::Container => "container",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse the stdout of `buildah inspect`.
///
/// buildah emits the `Config` field as a JSON string *inside* the JSON
/// report, so it has to be decoded a second time. This is a quirk of the
/// tool's output and is preserved here on purpose.
pub(crate) fn decode_report(stdout: &str) -> Result<Value> {
    let mut report: Value = serde_json::from_str(stdout)?;
    let decoded = match report.get("Config").and_then(Value::as_str) {
        Some(config) if !config.is_empty() => Some(serde_json::from_str::<Value>(config)?),
        _ => None,
    };
    if let Some(decoded) = decoded {
        report["Config"] = decoded;
    }
    Ok(report)
}

/// Per-entity cache of derived fields, keyed by logical field name.
///
/// Populated on first read, cleared wholesale by `refresh()`. Never shared
/// between entity views.
#[derive(Debug, Default)]
pub(crate) struct FieldCache(RefCell<HashMap<&'static str, Value>>);

impl FieldCache {
    pub fn get_or_compute(&self, name: &'static str, compute: impl FnOnce() -> Value) -> Value {
        if let Some(value) = self.0.borrow().get(name) {
            return value.clone();
        }
        let value = compute();
        self.0.borrow_mut().insert(name, value.clone());
        value
    }

    pub fn put(&self, name: &'static str, value: Value) {
        self.0.borrow_mut().insert(name, value);
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

// Extraction helpers. Missing or null fields read as empty values; entity
// views only exist after a successful inspect, so the identity fields are
// present in practice.

pub(crate) fn string(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

pub(crate) fn opt_string(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

pub(crate) fn string_vec(value: &Value) -> Vec<String> {
    match value.as_array() {
        Some(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

pub(crate) fn string_map(value: &Value) -> BTreeMap<String, String> {
    match value.as_object() {
        Some(entries) => entries
            .iter()
            .map(|(k, v)| (k.clone(), string(v)))
            .collect(),
        None => BTreeMap::new(),
    }
}

/// Keys of a JSON object, e.g. `ExposedPorts` and `Volumes`.
pub(crate) fn key_set(value: &Value) -> BTreeSet<String> {
    match value.as_object() {
        Some(entries) => entries.keys().cloned().collect(),
        None => BTreeSet::new(),
    }
}

/// `["PATH=/usr/bin", "TERM=xterm"]` → `{PATH: /usr/bin, TERM: xterm}`.
pub(crate) fn env_map(value: &Value) -> BTreeMap<String, String> {
    string_vec(value)
        .into_iter()
        .map(|entry| match entry.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (entry, String::new()),
        })
        .collect()
}

pub(crate) fn at<'a>(report: &'a Value, pointer: &str) -> &'a Value {
    report.pointer(pointer).unwrap_or(&Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_field_is_decoded_twice() {
        let inner = json!({"architecture": "amd64", "os": "linux"});
        let raw = json!({"Type": "buildah 0.0.1", "Config": inner.to_string()});
        let report = decode_report(&raw.to_string()).unwrap();
        assert_eq!(report["Config"]["architecture"], "amd64");
        assert_eq!(report["Config"]["os"], "linux");
    }

    #[test]
    fn empty_config_string_is_left_alone() {
        let raw = json!({"Config": ""});
        let report = decode_report(&raw.to_string()).unwrap();
        assert_eq!(report["Config"], "");
    }

    #[test]
    fn malformed_embedded_config_is_a_json_error() {
        let raw = json!({"Config": "{not json"});
        assert!(decode_report(&raw.to_string()).is_err());
    }

    #[test]
    fn env_map_splits_on_first_equals() {
        let env = json!(["PATH=/usr/bin", "X=a=b"]);
        let map = env_map(&env);
        assert_eq!(map["PATH"], "/usr/bin");
        assert_eq!(map["X"], "a=b");
    }

    #[test]
    fn field_cache_computes_once() {
        let cache = FieldCache::default();
        let mut computed = 0;
        for _ in 0..3 {
            cache.get_or_compute("name", || {
                computed += 1;
                json!("value")
            });
        }
        assert_eq!(computed, 1);
        cache.clear();
        cache.get_or_compute("name", || {
            computed += 1;
            json!("value")
        });
        assert_eq!(computed, 2);
    }

    #[test]
    fn missing_pointers_read_as_defaults() {
        let report = json!({});
        assert_eq!(string(at(&report, "/ContainerID")), "");
        assert!(string_vec(at(&report, "/OCIv1/config/Cmd")).is_empty());
        assert!(string_map(at(&report, "/OCIv1/config/Labels")).is_empty());
        assert!(key_set(at(&report, "/OCIv1/config/Volumes")).is_empty());
        assert_eq!(opt_string(at(&report, "/OCIv1/author")), None);
    }
}
