//! Predicates comparing a resolved argument against a configured policy value.
//!
//! All comparisons are case-sensitive. String arguments are compared by their
//! text; any other JSON value by its compact serialization.

use std::borrow::Cow;

use {regex::Regex, serde_json::Value, toolgate_common::types::PolicyOperator, tracing::warn};

/// Text form of an argument as seen by the operators.
pub fn stringify(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Evaluate `operator` with the argument on the left and `expected` on the right.
///
/// An invalid regex pattern never matches.
pub fn matches(operator: PolicyOperator, actual: &Value, expected: &str) -> bool {
    let actual = stringify(actual);
    match operator {
        PolicyOperator::Equal => actual == expected,
        PolicyOperator::NotEqual => actual != expected,
        PolicyOperator::Contains => actual.contains(expected),
        PolicyOperator::NotContains => !actual.contains(expected),
        PolicyOperator::StartsWith => actual.starts_with(expected),
        PolicyOperator::EndsWith => actual.ends_with(expected),
        PolicyOperator::Regex => match Regex::new(expected) {
            Ok(re) => re.is_match(&actual),
            Err(e) => {
                warn!(pattern = %expected, error = %e, "invalid regex in invocation policy");
                false
            },
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {
        super::*,
        rstest::rstest,
        serde_json::{Value, json},
    };

    #[rstest]
    #[case(PolicyOperator::Equal, json!("main"), "main", true)]
    #[case(PolicyOperator::Equal, json!("Main"), "main", false)]
    #[case(PolicyOperator::NotEqual, json!("dev"), "main", true)]
    #[case(PolicyOperator::NotEqual, json!("main"), "main", false)]
    #[case(PolicyOperator::Contains, json!("drop table users"), "drop table", true)]
    #[case(PolicyOperator::NotContains, json!("select 1"), "drop", true)]
    #[case(PolicyOperator::NotContains, json!("drop it"), "drop", false)]
    #[case(PolicyOperator::StartsWith, json!("/etc/passwd"), "/etc", true)]
    #[case(PolicyOperator::EndsWith, json!("bad@evil.com"), "@evil.com", true)]
    #[case(PolicyOperator::EndsWith, json!("bad@EVIL.com"), "@evil.com", false)]
    #[case(PolicyOperator::Regex, json!("ticket-1234"), r"^ticket-\d+$", true)]
    #[case(PolicyOperator::Regex, json!("ticket-abc"), r"^ticket-\d+$", false)]
    fn operator_semantics(
        #[case] operator: PolicyOperator,
        #[case] actual: Value,
        #[case] expected: &str,
        #[case] result: bool,
    ) {
        assert_eq!(matches(operator, &actual, expected), result);
    }

    #[test]
    fn non_string_values_use_json_text() {
        assert!(matches(PolicyOperator::Equal, &json!(42), "42"));
        assert!(matches(PolicyOperator::Equal, &json!(true), "true"));
        assert!(matches(
            PolicyOperator::Contains,
            &json!({"to": "x@evil.com"}),
            "evil.com"
        ));
    }

    #[test]
    fn invalid_regex_never_matches() {
        assert!(!matches(PolicyOperator::Regex, &json!("(("), "(("));
    }
}
