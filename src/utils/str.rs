//! Utilities for `String` and `str`

use serde_json::Value;

/// Returns the last path segment of a type name without generic arguments,
/// e.g. `std::io::error::Error` becomes `Error`
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full
        .split_once('<')
        .map_or(full, |(base, _)| base);
    base.rsplit("::")
        .next()
        .unwrap_or(base)
}

/// Renders a JSON value the way it would be printed by string conversion:
/// strings without quotes, everything else as JSON
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders an argument list as a comma-separated JSON sequence
pub(crate) fn join_args(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&arg.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;

    #[test]
    fn it_shortens_type_names() {
        assert_eq!(short_type_name("std::io::error::Error"), "Error");
        assert_eq!(short_type_name("my_app::errors::NotFound"), "NotFound");
        assert_eq!(short_type_name("Plain"), "Plain");
        assert_eq!(short_type_name("a::Wrapper<b::Inner>"), "Wrapper");
    }

    #[test]
    fn it_renders_values_as_text() {
        assert_eq!(value_to_text(&json!("route")), "route");
        assert_eq!(value_to_text(&json!(42)), "42");
        assert_eq!(value_to_text(&json!({ "a": 1 })), r#"{"a":1}"#);
    }

    #[test]
    fn it_joins_argument_lists() {
        assert_eq!(join_args(&[]), "");
        assert_eq!(join_args(&[json!("/url"), json!(301)]), r#""/url", 301"#);
    }
}
