//! Keyword-option to command-line flag encoding.
//!
//! buildah subcommands take their configuration as flags. [`Options`] keeps
//! an ordered list of named options and renders them with the rules the CLI
//! expects: single-character names become short flags, longer names become
//! long flags with underscores turned into hyphens, booleans are
//! presence-only, and list values repeat the flag once per element.

/// The value attached to one named option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptValue {
    /// Presence-only flag; `false` suppresses the option entirely.
    Switch(bool),
    /// Flag followed by a single stringified value.
    Value(String),
    /// Flag repeated once per element, in order.
    List(Vec<String>),
}

impl From<bool> for OptValue {
    fn from(value: bool) -> Self {
        OptValue::Switch(value)
    }
}

impl From<&str> for OptValue {
    fn from(value: &str) -> Self {
        OptValue::Value(value.to_string())
    }
}

impl From<String> for OptValue {
    fn from(value: String) -> Self {
        OptValue::Value(value)
    }
}

impl From<Vec<String>> for OptValue {
    fn from(values: Vec<String>) -> Self {
        OptValue::List(values)
    }
}

/// An ordered collection of named options.
///
/// Builder-style: methods consume and return `self` so call sites read as a
/// chain. Encoding order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    entries: Vec<(String, OptValue)>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an option with an explicit [`OptValue`].
    pub fn set(mut self, key: impl Into<String>, value: impl Into<OptValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Append a presence-only flag.
    pub fn flag(self, key: impl Into<String>) -> Self {
        self.set(key, true)
    }

    /// Append a single-valued option.
    pub fn arg(self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, OptValue::Value(value.to_string()))
    }

    /// Append a single-valued option, or nothing when `value` is `None`.
    pub fn maybe(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.arg(key, value),
            None => self,
        }
    }

    /// Append a repeated option, one flag per element.
    pub fn list<I, T>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.set(
            key,
            OptValue::List(values.into_iter().map(|v| v.to_string()).collect()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render to command-line tokens.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (key, value) in &self.entries {
            let flag = render_key(key);
            match value {
                OptValue::Switch(true) => args.push(flag),
                OptValue::Switch(false) => {}
                OptValue::Value(value) => {
                    args.push(flag);
                    args.push(value.clone());
                }
                OptValue::List(values) => {
                    for value in values {
                        args.push(flag.clone());
                        args.push(value.clone());
                    }
                }
            }
        }
        args
    }
}

/// `"q"` → `-q`, `"stop_signal"` → `--stop-signal`.
fn render_key(key: &str) -> String {
    if key.chars().count() == 1 {
        format!("-{key}")
    } else {
        format!("--{}", key.replace('_', "-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_keys_become_short_flags() {
        let args = Options::new().arg("q", "yes").to_args();
        assert_eq!(args, vec!["-q", "yes"]);
    }

    #[test]
    fn underscores_render_as_hyphens() {
        let args = Options::new().arg("stop_signal", "SIGTERM").to_args();
        assert_eq!(args, vec!["--stop-signal", "SIGTERM"]);
    }

    #[test]
    fn true_switch_emits_bare_flag() {
        let args = Options::new().flag("quiet").to_args();
        assert_eq!(args, vec!["--quiet"]);
    }

    #[test]
    fn false_switch_emits_nothing() {
        let args = Options::new().set("quiet", false).to_args();
        assert!(args.is_empty());
    }

    #[test]
    fn none_value_is_suppressed() {
        let args = Options::new().maybe("name", None::<&str>).to_args();
        assert!(args.is_empty());
        let args = Options::new().maybe("name", Some("c1")).to_args();
        assert_eq!(args, vec!["--name", "c1"]);
    }

    #[test]
    fn list_repeats_flag_per_element_in_order() {
        let args = Options::new().list("volume", ["/a", "/b", "/c"]).to_args();
        assert_eq!(args, vec!["--volume", "/a", "--volume", "/b", "--volume", "/c"]);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let args = Options::new()
            .flag("quiet")
            .arg("name", "c1")
            .list("env", ["A=1"])
            .to_args();
        assert_eq!(args, vec!["--quiet", "--name", "c1", "--env", "A=1"]);
    }

    #[test]
    fn scalar_values_are_stringified() {
        let args = Options::new().arg("retries", 3).to_args();
        assert_eq!(args, vec!["--retries", "3"]);
    }
}
