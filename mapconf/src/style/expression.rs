//! Helpers for engine style expressions.

use serde_json::Value;

/// Operator of an expression, if the value is an expression.
pub fn operator(value: &Value) -> Option<&str> {
    value.as_array()?.first()?.as_str()
}

/// Returns true if the value is an `interpolate` or `step` expression over the zoom level.
pub fn is_zoom_expression(value: &Value) -> bool {
    let Some(items) = value.as_array() else {
        return false;
    };

    let input = match operator(value) {
        Some("interpolate" | "interpolate-hcl" | "interpolate-lab") => items.get(2),
        Some("step") => items.get(1),
        _ => None,
    };

    input.is_some_and(|input| operator(input) == Some("zoom"))
}

/// Merges a user supplied value into a default value, keeping the structure of the default
/// expression where possible.
///
/// * An expression supplied by the user is used as is.
/// * A flat user value replaces a flat default.
/// * In a `case` or `match` default, the flat user value replaces the fallback branch, so the
///   conditional branches (hover and selection highlights, categories) keep working.
/// * In a zoom `interpolate` or `step` default, the fallback branch of every nested `case` or
///   `match` is replaced. If there are no nested conditionals, the user value wins.
///
/// ```
/// use mapconf::style::combine_with_default;
/// use serde_json::json;
///
/// let default = json!(["case", ["boolean", ["feature-state", "hover"], false], "yellow", "gray"]);
/// let merged = combine_with_default(&json!("#2ca02c"), &default);
///
/// assert_eq!(merged, json!(["case", ["boolean", ["feature-state", "hover"], false], "yellow", "#2ca02c"]));
/// ```
pub fn combine_with_default(user: &Value, default: &Value) -> Value {
    if user.is_array() || user.is_null() {
        return user.clone();
    }

    match operator(default) {
        Some("case" | "match") => replace_fallback(default, user),
        _ if is_zoom_expression(default) => {
            let mut merged = default.clone();
            let replaced = replace_nested_fallbacks(&mut merged, user);
            if replaced > 0 {
                merged
            } else {
                user.clone()
            }
        }
        _ => user.clone(),
    }
}

fn replace_fallback(expression: &Value, fallback: &Value) -> Value {
    let mut merged = expression.clone();
    if let Some(last) = merged.as_array_mut().and_then(|items| items.last_mut()) {
        *last = fallback.clone();
    }

    merged
}

fn replace_nested_fallbacks(expression: &mut Value, fallback: &Value) -> usize {
    let output_start = match operator(expression) {
        Some("step") => 2,
        _ => 4,
    };

    let Some(items) = expression.as_array_mut() else {
        return 0;
    };

    let mut replaced = 0;
    for output in items.iter_mut().skip(output_start).step_by(2) {
        if matches!(operator(output), Some("case" | "match")) {
            *output = replace_fallback(output, fallback);
            replaced += 1;
        }
    }

    replaced
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flat_default() {
        assert_eq!(combine_with_default(&json!("red"), &json!("blue")), json!("red"));
        assert_eq!(combine_with_default(&json!(0.3), &json!(0.8)), json!(0.3));
    }

    #[test]
    fn case_default_keeps_conditions() {
        let default = json!([
            "case",
            ["boolean", ["feature-state", "selected"], false],
            "#ffff00",
            ["boolean", ["feature-state", "hover"], false],
            "#abcdef",
            "#ff0000"
        ]);

        let merged = combine_with_default(&json!("#00ff00"), &default);
        assert_eq!(
            merged,
            json!([
                "case",
                ["boolean", ["feature-state", "selected"], false],
                "#ffff00",
                ["boolean", ["feature-state", "hover"], false],
                "#abcdef",
                "#00ff00"
            ])
        );
    }

    #[test]
    fn zoom_interpolation_with_nested_cases() {
        let default = json!([
            "interpolate",
            ["linear"],
            ["zoom"],
            5,
            ["case", ["boolean", ["feature-state", "hover"], false], "white", "black"],
            15,
            ["case", ["boolean", ["feature-state", "hover"], false], "white", "gray"]
        ]);

        let merged = combine_with_default(&json!("red"), &default);
        assert_eq!(
            merged,
            json!([
                "interpolate",
                ["linear"],
                ["zoom"],
                5,
                ["case", ["boolean", ["feature-state", "hover"], false], "white", "red"],
                15,
                ["case", ["boolean", ["feature-state", "hover"], false], "white", "red"]
            ])
        );
    }

    #[test]
    fn zoom_step_with_nested_case() {
        let default = json!(["step", ["zoom"], "black", 10, ["case", true, "white", "gray"]]);
        let merged = combine_with_default(&json!("red"), &default);
        assert_eq!(
            merged,
            json!(["step", ["zoom"], "black", 10, ["case", true, "white", "red"]])
        );
    }

    #[test]
    fn zoom_interpolation_without_conditionals_is_replaced() {
        let default = json!(["interpolate", ["linear"], ["zoom"], 5, "black", 15, "gray"]);
        assert_eq!(combine_with_default(&json!("red"), &default), json!("red"));
    }

    #[test]
    fn user_expression_is_used_verbatim() {
        let user = json!(["interpolate", ["linear"], ["zoom"], 8, "red", 14, "blue"]);
        let default = json!(["case", true, "white", "black"]);
        assert_eq!(combine_with_default(&user, &default), user);
    }

    #[test]
    fn zoom_detection() {
        assert!(is_zoom_expression(&json!(["interpolate", ["exponential", 2], ["zoom"], 1, 1])));
        assert!(is_zoom_expression(&json!(["step", ["zoom"], 1, 10, 2])));
        assert!(!is_zoom_expression(&json!(["interpolate", ["linear"], ["get", "pop"], 1, 1])));
        assert!(!is_zoom_expression(&json!("red")));
    }
}
