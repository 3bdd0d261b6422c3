//! Write-through collections for list- and map-valued container fields.
//!
//! A [`ConfigSet`] or [`ConfigMap`] is a local mirror of one configuration
//! field of one container. Every mutation issues a `buildah config` call
//! first and touches the local copy only after the call succeeds, so local
//! state lags remote state but never runs ahead of it. A failed remote call
//! leaves the mirror unchanged.

use std::collections::{BTreeMap, BTreeSet};

use crate::client::Buildah;
use crate::config;
use crate::error::Result;
use crate::options::Options;

/// Set-valued configuration field (e.g. `volume`).
#[derive(Debug)]
pub struct ConfigSet {
    client: Buildah,
    name_or_id: String,
    option: &'static str,
    items: BTreeSet<String>,
}

impl ConfigSet {
    pub(crate) fn new(
        client: Buildah,
        name_or_id: String,
        option: &'static str,
        items: BTreeSet<String>,
    ) -> Self {
        ConfigSet {
            client,
            name_or_id,
            option,
            items,
        }
    }

    /// Add a value; returns whether it was newly inserted.
    pub fn add(&mut self, value: impl Into<String>) -> Result<bool> {
        let value = value.into();
        self.client
            .config(&self.name_or_id, &Options::new().arg(self.option, &value))?;
        Ok(self.items.insert(value))
    }

    /// Remove a value; buildah's removal convention is the value suffixed
    /// with `-`. Returns whether the value was present locally.
    pub fn discard(&mut self, value: &str) -> Result<bool> {
        self.client.config(
            &self.name_or_id,
            &Options::new().arg(self.option, format!("{value}-")),
        )?;
        Ok(self.items.remove(value))
    }

    pub fn contains(&self, value: &str) -> bool {
        self.items.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.items.iter()
    }

    /// The local mirror itself.
    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.items
    }
}

/// Map-valued configuration field (e.g. `env`, `label`).
#[derive(Debug)]
pub struct ConfigMap {
    client: Buildah,
    name_or_id: String,
    option: &'static str,
    entries: BTreeMap<String, String>,
}

impl ConfigMap {
    pub(crate) fn new(
        client: Buildah,
        name_or_id: String,
        option: &'static str,
        entries: BTreeMap<String, String>,
    ) -> Self {
        ConfigMap {
            client,
            name_or_id,
            option,
            entries,
        }
    }

    /// Set one entry; returns the previously cached value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<Option<String>> {
        let (name, value) = (name.into(), value.into());
        let tokens = config::mapping_values([(name.as_str(), Some(value.as_str()))]);
        self.client
            .config(&self.name_or_id, &Options::new().list(self.option, tokens))?;
        Ok(self.entries.insert(name, value))
    }

    /// Unset one entry (`name-` on the wire); returns the previously
    /// cached value, if any.
    pub fn remove(&mut self, name: &str) -> Result<Option<String>> {
        let tokens = config::mapping_values([(name, None)]);
        self.client
            .config(&self.name_or_id, &Options::new().list(self.option, tokens))?;
        Ok(self.entries.remove(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }

    /// The local mirror itself.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::BuildahError;
    use crate::runner::{CommandRunner, MockCommandRunner, MockResponse};

    fn client(runner: &Arc<MockCommandRunner>) -> Buildah {
        Buildah::builder()
            .runner(runner.clone() as Arc<dyn CommandRunner>)
            .build()
            .unwrap()
    }

    #[test]
    fn set_add_issues_a_config_call_then_inserts() {
        let runner = Arc::new(MockCommandRunner::new());
        let mut volumes =
            ConfigSet::new(client(&runner), "c1".into(), "volume", BTreeSet::new());
        assert!(volumes.add("/tmp/foo").unwrap());
        assert!(volumes.contains("/tmp/foo"));
        assert_eq!(
            runner.calls()[0],
            ["buildah", "config", "--volume", "/tmp/foo", "c1"]
        );
    }

    #[test]
    fn set_discard_sends_the_removal_marker() {
        let runner = Arc::new(MockCommandRunner::new());
        let mut volumes = ConfigSet::new(
            client(&runner),
            "c1".into(),
            "volume",
            BTreeSet::from(["/tmp/foo".to_string()]),
        );
        assert!(volumes.discard("/tmp/foo").unwrap());
        assert!(volumes.is_empty());
        assert_eq!(
            runner.calls()[0],
            ["buildah", "config", "--volume", "/tmp/foo-", "c1"]
        );
    }

    #[test]
    fn failed_remote_call_leaves_the_set_untouched() {
        let runner = Arc::new(MockCommandRunner::new());
        runner.expect(MockResponse::failure("config failed\n"));
        let mut volumes =
            ConfigSet::new(client(&runner), "c1".into(), "volume", BTreeSet::new());
        let err = volumes.add("/tmp/foo").unwrap_err();
        assert!(matches!(err, BuildahError::CommandFailed { .. }));
        assert!(volumes.is_empty());
    }

    #[test]
    fn map_insert_sends_a_key_value_token() {
        let runner = Arc::new(MockCommandRunner::new());
        let mut env = ConfigMap::new(client(&runner), "c1".into(), "env", BTreeMap::new());
        assert_eq!(env.insert("PATH", "/usr/bin").unwrap(), None);
        assert_eq!(env.get("PATH"), Some("/usr/bin"));
        assert_eq!(
            runner.calls()[0],
            ["buildah", "config", "--env", "PATH=/usr/bin", "c1"]
        );
    }

    #[test]
    fn map_remove_sends_the_unset_marker() {
        let runner = Arc::new(MockCommandRunner::new());
        let mut env = ConfigMap::new(
            client(&runner),
            "c1".into(),
            "env",
            BTreeMap::from([("PATH".to_string(), "/usr/bin".to_string())]),
        );
        assert_eq!(env.remove("PATH").unwrap().as_deref(), Some("/usr/bin"));
        assert!(!env.contains_key("PATH"));
        assert_eq!(runner.calls()[0], ["buildah", "config", "--env", "PATH-", "c1"]);
    }

    #[test]
    fn failed_remote_call_leaves_the_map_untouched() {
        let runner = Arc::new(MockCommandRunner::new());
        runner.expect(MockResponse::failure("config failed\n"));
        let mut labels = ConfigMap::new(
            client(&runner),
            "c1".into(),
            "label",
            BTreeMap::from([("kept".to_string(), "yes".to_string())]),
        );
        assert!(labels.insert("new", "value").is_err());
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("kept"), Some("yes"));
    }
}
