//! Property-based tests for the option encoder.
//!
//! These use proptest to generate random option names and values and
//! verify the encoding invariants hold for all of them.

use proptest::prelude::*;

use buildah::Options;

/// Generate a multi-character option name (may contain underscores).
fn long_key_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{1,10}"
}

/// Generate a single-character option name.
fn short_key_strategy() -> impl Strategy<Value = String> {
    "[a-z]"
}

/// Generate an option value without exotic characters.
fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9/=:.-]{0,20}"
}

/// The flag token a key should render to.
fn rendered(key: &str) -> String {
    if key.len() == 1 {
        format!("-{key}")
    } else {
        format!("--{}", key.replace('_', "-"))
    }
}

proptest! {
    #[test]
    fn true_switch_is_exactly_one_bare_flag(key in long_key_strategy()) {
        let args = Options::new().flag(key.as_str()).to_args();
        prop_assert_eq!(args, vec![rendered(&key)]);
    }

    #[test]
    fn false_switch_emits_no_tokens(key in long_key_strategy()) {
        let args = Options::new().set(key.as_str(), false).to_args();
        prop_assert!(args.is_empty());
    }

    #[test]
    fn none_value_emits_no_tokens(key in long_key_strategy()) {
        let args = Options::new().maybe(key.as_str(), None::<String>).to_args();
        prop_assert!(args.is_empty());
    }

    #[test]
    fn scalar_value_is_flag_then_value(
        key in long_key_strategy(),
        value in value_strategy(),
    ) {
        let args = Options::new().arg(key.as_str(), &value).to_args();
        prop_assert_eq!(args, vec![rendered(&key), value]);
    }

    #[test]
    fn short_keys_render_with_a_single_dash(
        key in short_key_strategy(),
        value in value_strategy(),
    ) {
        let args = Options::new().arg(key.as_str(), &value).to_args();
        prop_assert_eq!(&args[0], &format!("-{key}"));
    }

    #[test]
    fn list_emits_flag_once_per_element_in_order(
        key in long_key_strategy(),
        values in prop::collection::vec(value_strategy(), 0..6),
    ) {
        let args = Options::new().list(key.as_str(), values.clone()).to_args();
        prop_assert_eq!(args.len(), values.len() * 2);

        let flag = rendered(&key);
        let mut seen = Vec::new();
        for pair in args.chunks(2) {
            prop_assert_eq!(&pair[0], &flag);
            seen.push(pair[1].clone());
        }
        prop_assert_eq!(seen, values);
    }

    #[test]
    fn long_flags_never_contain_underscores(key in long_key_strategy()) {
        let args = Options::new().flag(key.as_str()).to_args();
        prop_assert!(!args[0].contains('_'));
        prop_assert!(args[0].starts_with("--"));
    }

    #[test]
    fn encoding_order_is_insertion_order(
        key_a in long_key_strategy(),
        key_b in long_key_strategy(),
        value in value_strategy(),
    ) {
        let args = Options::new()
            .flag(key_a.as_str())
            .arg(key_b.as_str(), &value)
            .to_args();
        prop_assert_eq!(args, vec![rendered(&key_a), rendered(&key_b), value]);
    }
}
