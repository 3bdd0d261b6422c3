//! Value encodings at the `buildah config` boundary.
//!
//! `config` accepts some values in formats that differ from how `inspect`
//! reports them. Entrypoint and cmd are both arrays in inspect output, but
//! on the way in one wants a JSON array and the other a shell-joined
//! string; mappings (env, label, annotation) are flat `key=value` tokens
//! with a trailing `-` marking an unset.

use crate::error::Result;

/// Entrypoint travels as a JSON array, so array-in/array-out stays
/// unambiguous.
pub(crate) fn entrypoint_value(entrypoint: &[String]) -> Result<String> {
    Ok(serde_json::to_string(entrypoint)?)
}

/// Cmd only accepts a plain string that buildah splits again, so the
/// tokens are shell-quoted and space-joined.
pub(crate) fn cmd_value(cmd: &[String]) -> Result<String> {
    Ok(shlex::try_join(cmd.iter().map(String::as_str))?)
}

/// `(k, Some(v))` → `k=v`, `(k, None)` → `k-` (buildah's unset marker).
pub(crate) fn mapping_values<'a>(
    entries: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
) -> Vec<String> {
    entries
        .into_iter()
        .map(|(key, value)| match value {
            Some(value) => format!("{key}={value}"),
            None => format!("{key}-"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entrypoint_is_a_json_array() {
        let value = entrypoint_value(&["/bin/sh".to_string(), "-c".to_string()]).unwrap();
        assert_eq!(value, r#"["/bin/sh","-c"]"#);
    }

    #[test]
    fn cmd_is_shell_joined() {
        let value = cmd_value(&[
            "echo".to_string(),
            "hello world".to_string(),
        ])
        .unwrap();
        assert_eq!(value, "echo 'hello world'");
    }

    #[test]
    fn mapping_set_and_unset_markers() {
        let values = mapping_values([("PATH", Some("/usr/bin")), ("TERM", None)]);
        assert_eq!(values, vec!["PATH=/usr/bin", "TERM-"]);
    }
}
