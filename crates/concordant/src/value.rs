//! Runtime values and how they meet document text.
//!
//! Expressions evaluate to [`serde_json::Value`]. This module owns the
//! culture-invariant formatting used when a value is written into a document
//! and the type-aware comparison used by assertions.

use regex::Regex;
pub use serde_json::Value;
use std::sync::OnceLock;

/// Expected text that matches a `null` result
pub const NULL_MARKER: &str = "null";

#[allow(clippy::expect_used)]
fn whitespace() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").expect("whitespace pattern is valid"))
}

/// Collapse whitespace runs (including non-breaking spaces) and trim, the way
/// a browser displays text.
#[must_use]
pub fn normalise_whitespace(text: &str) -> String {
    whitespace().replace_all(text, " ").trim().to_string()
}

/// Text written into a document for a value. `null` renders as empty text.
#[must_use]
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        // serde_json formats numbers with '.' and no grouping regardless of locale
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Text used in failure and diagnostic messages. `null` is spelled out.
#[must_use]
pub fn describe(value: &Value) -> String {
    match value {
        Value::Null => NULL_MARKER.to_string(),
        other => display_text(other),
    }
}

/// Short type name for diagnostics
#[must_use]
pub const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Compare an evaluated value with the expected text of an element.
///
/// - strings compare case-sensitively after whitespace normalisation
/// - integers match only text that parses as the same integer (`42` matches
///   `"42"` but not `"42.0"`)
/// - floats match text that parses, with `.` as decimal point, to exactly the
///   same value
/// - booleans match `true` / `false`
/// - `null` matches only [`NULL_MARKER`]
#[must_use]
pub fn matches_expected(actual: &Value, expected: &str) -> bool {
    let expected = normalise_whitespace(expected);
    match actual {
        Value::Null => expected == NULL_MARKER,
        Value::Bool(b) => expected == if *b { "true" } else { "false" },
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                expected.parse::<i64>().is_ok_and(|e| e == i)
            } else if let Some(u) = n.as_u64() {
                expected.parse::<u64>().is_ok_and(|e| e == u)
            } else {
                n.as_f64()
                    .is_some_and(|f| expected.parse::<f64>().is_ok_and(|e| e == f))
            }
        }
        Value::String(s) => normalise_whitespace(s) == expected,
        other => normalise_whitespace(&display_text(other)) == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod formatting_tests {
        use super::*;

        #[test]
        fn test_display_null_is_empty() {
            assert_eq!(display_text(&Value::Null), "");
            assert_eq!(describe(&Value::Null), "null");
        }

        #[test]
        fn test_display_numbers_invariant() {
            assert_eq!(display_text(&json!(1234.5)), "1234.5");
            assert_eq!(display_text(&json!(-7)), "-7");
        }

        #[test]
        fn test_normalise_whitespace() {
            assert_eq!(normalise_whitespace("  Hello \n\t World\u{00A0}! "), "Hello World !");
        }
    }

    mod equality_tests {
        use super::*;

        #[test]
        fn test_string_exact() {
            assert!(matches_expected(&json!("Hello World!"), "Hello World!"));
            assert!(!matches_expected(&json!("Hello World!"), "hello world!"));
        }

        #[test]
        fn test_integer_vs_text() {
            assert!(matches_expected(&json!(42), "42"));
            assert!(!matches_expected(&json!(42), "42.0"));
        }

        #[test]
        fn test_float_invariant_decimal_point() {
            assert!(matches_expected(&json!(2.5), "2.5"));
            assert!(matches_expected(&json!(2.5), "2.50"));
            assert!(!matches_expected(&json!(2.5), "2,5"));
        }

        #[test]
        fn test_boolean_and_null() {
            assert!(matches_expected(&json!(true), "true"));
            assert!(!matches_expected(&json!(true), "True"));
            assert!(matches_expected(&Value::Null, "null"));
            assert!(!matches_expected(&Value::Null, ""));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_integer_matches_its_own_text(n in any::<i64>()) {
                prop_assert!(matches_expected(&json!(n), &n.to_string()));
                let decimal = format!("{n}.0");
                prop_assert!(!matches_expected(&json!(n), &decimal));
            }

            #[test]
            fn prop_strings_match_themselves(s in "[a-zA-Z0-9 ]{0,20}") {
                prop_assert!(matches_expected(&json!(s.clone()), &s));
            }
        }
    }
}
