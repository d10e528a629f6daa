use serde_json::Value;

use crate::corrections;
use crate::validation::{ErrorType, ValidationError, ValidationResult};

use super::{evaluate, is_pattern, parse, EvalError, Pattern};

const PARTIAL_KEY: &str = "match:partial";
const EXTRACT_FIELD_PREFIX: &str = "match:extractField:";

/// Recursively compares `expected` against `actual`, dispatching to pattern
/// evaluation at string leaves and honoring the `match:partial` /
/// `match:extractField:<path>` object-key markers. This is the public
/// contract named in `SPEC_FULL.md` §4.6: `match(expected, actual, path="")`.
pub fn match_value(expected: &Value, actual: &Value, path: &str) -> ValidationResult {
    if let Value::String(pattern_str) = expected {
        if is_pattern(pattern_str) {
            return match_pattern_string(pattern_str, actual, path);
        }
    }

    match (expected, actual) {
        (Value::Object(expected_map), Value::Object(_)) => match_object(expected_map, actual, path),
        (Value::Array(expected_items), Value::Array(actual_items)) => {
            match_array(expected_items, actual_items, path)
        }
        (Value::Array(_), _) | (Value::Object(_), _) => ValidationResult::fail(vec![type_mismatch(
            path,
            expected,
            actual,
            json_type_name(expected),
            json_type_name(actual),
        )]),
        _ => {
            if expected == actual {
                ValidationResult::pass()
            } else {
                ValidationResult::fail(vec![ValidationError::new(
                    ErrorType::ValueMismatch,
                    path,
                    expected.clone(),
                    actual.clone(),
                    format!("expected {expected} but got {actual}"),
                )])
            }
        }
    }
}

fn match_pattern_string(pattern_str: &str, actual: &Value, path: &str) -> ValidationResult {
    let pattern = match parse(pattern_str) {
        Ok(pattern) => pattern,
        Err(parse_error) => {
            let suggestion = corrections::analyze(pattern_str).into_iter().next();
            return ValidationResult::fail(vec![ValidationError::new(
                ErrorType::PatternSyntax,
                path,
                Value::String(pattern_str.to_string()),
                actual.clone(),
                format!("`{}` is not a recognized pattern: {}", pattern_str, parse_error.reason),
            )
            .with_pattern_type(pattern_kind_label(pattern_str))
            .with_suggestion(suggestion)]);
        }
    };

    match evaluate(&pattern, actual) {
        Ok(true) => ValidationResult::pass(),
        Ok(false) => {
            let suggestion = corrections::analyze(pattern_str).into_iter().next();
            ValidationResult::fail(vec![ValidationError::new(
                ErrorType::PatternFailed,
                path,
                Value::String(pattern_str.to_string()),
                actual.clone(),
                format!("`{actual}` does not match `{pattern_str}`"),
            )
            .with_pattern_type(pattern_kind_label(pattern_str))
            .with_suggestion(suggestion)])
        }
        Err(EvalError::TypeMismatch { expected, actual: actual_kind }) => {
            ValidationResult::fail(vec![ValidationError::new(
                ErrorType::TypeMismatch,
                path,
                Value::String(pattern_str.to_string()),
                actual.clone(),
                format!("pattern `{pattern_str}` requires {expected} but got {actual_kind}"),
            )
            .with_pattern_type(pattern_kind_label(pattern_str))])
        }
        Err(EvalError::NotALeafPattern) => ValidationResult::fail(vec![ValidationError::new(
            ErrorType::PatternSyntax,
            path,
            Value::String(pattern_str.to_string()),
            actual.clone(),
            format!("`{pattern_str}` is a structural pattern and cannot appear as a leaf value"),
        )]),
        Err(other) => ValidationResult::fail(vec![ValidationError::new(
            ErrorType::PatternFailed,
            path,
            Value::String(pattern_str.to_string()),
            actual.clone(),
            format!("{other:?}"),
        )]),
    }
}

fn match_object(
    expected_map: &serde_json::Map<String, Value>,
    actual: &Value,
    path: &str,
) -> ValidationResult {
    let actual_map = actual.as_object().expect("caller matched (Object, Object)");

    if let Some(extract_key) = expected_map.keys().find(|k| k.starts_with(EXTRACT_FIELD_PREFIX)) {
        let field_path = &extract_key[EXTRACT_FIELD_PREFIX.len()..];
        let projection = extract_field(actual, field_path);
        let sub_expected = &expected_map[extract_key];
        let sub_path = join_path(path, &format!("extractField({field_path})"));
        return match_value(sub_expected, &projection, &sub_path);
    }

    let partial = matches!(expected_map.get(PARTIAL_KEY), Some(Value::Bool(true)));

    let mut errors = Vec::new();

    for (key, expected_value) in expected_map {
        if key == PARTIAL_KEY {
            continue;
        }
        let child_path = join_path(path, key);
        match actual_map.get(key) {
            Some(actual_value) => errors.extend(match_value(expected_value, actual_value, &child_path).errors),
            None => errors.push(ValidationError::new(
                ErrorType::MissingField,
                child_path,
                expected_value.clone(),
                Value::Null,
                format!("missing required field `{key}`"),
            )),
        }
    }

    if !partial {
        for key in actual_map.keys() {
            if !expected_map.contains_key(key) {
                let child_path = join_path(path, key);
                errors.push(ValidationError::new(
                    ErrorType::ExtraField,
                    child_path,
                    Value::Null,
                    actual_map[key].clone(),
                    format!("unexpected extra field `{key}`"),
                ));
            }
        }
    }

    ValidationResult::fail(errors)
}

fn match_array(expected_items: &[Value], actual_items: &[Value], path: &str) -> ValidationResult {
    if expected_items.len() != actual_items.len() {
        return ValidationResult::fail(vec![ValidationError::new(
            ErrorType::ArrayLengthMismatch,
            path,
            Value::from(expected_items.len()),
            Value::from(actual_items.len()),
            format!(
                "expected array of length {} but got length {}",
                expected_items.len(),
                actual_items.len()
            ),
        )]);
    }

    let mut errors = Vec::new();
    for (index, (expected_item, actual_item)) in expected_items.iter().zip(actual_items).enumerate() {
        let child_path = format!("{path}[{index}]");
        errors.extend(match_value(expected_item, actual_item, &child_path).errors);
    }
    ValidationResult::fail(errors)
}

fn type_mismatch(
    path: &str,
    expected: &Value,
    actual: &Value,
    expected_kind: &str,
    actual_kind: &str,
) -> ValidationError {
    ValidationError::new(
        ErrorType::TypeMismatch,
        path,
        expected.clone(),
        actual.clone(),
        format!("expected {expected_kind} but got {actual_kind}"),
    )
}

fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}.{key}")
    }
}

fn pattern_kind_label(pattern_str: &str) -> String {
    pattern_str
        .strip_prefix(super::PREFIX)
        .and_then(|rest| rest.strip_prefix(super::NEGATE_PREFIX).or(Some(rest)))
        .and_then(|rest| rest.split(':').next())
        .unwrap_or(pattern_str)
        .to_string()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Projects `path` out of `value`; a `*` segment maps the remaining path over
/// every element of an array, collecting the results back into an array.
fn extract_field(value: &Value, path: &str) -> Value {
    let segments: Vec<&str> = path.split('.').collect();
    extract_segments(value, &segments)
}

fn extract_segments(value: &Value, segments: &[&str]) -> Value {
    match segments.split_first() {
        None => value.clone(),
        Some((&"*", rest)) => match value.as_array() {
            Some(items) => Value::Array(items.iter().map(|item| extract_segments(item, rest)).collect()),
            None => Value::Null,
        },
        Some((segment, rest)) => match value.get(*segment) {
            Some(next) => extract_segments(next, rest),
            None => Value::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_equality_passes_for_identical_values() {
        let value = json!({"a": [1, 2, {"b": "c"}]});
        assert!(match_value(&value, &value, "").passed);
    }

    #[test]
    fn missing_field_is_reported() {
        let expected = json!({"a": 1, "b": 2});
        let actual = json!({"a": 1});
        let result = match_value(&expected, &actual, "");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].error_type, ErrorType::MissingField);
        assert_eq!(result.errors[0].path, "b");
    }

    #[test]
    fn extra_field_is_reported_without_partial() {
        let expected = json!({"a": 1});
        let actual = json!({"a": 1, "b": 2});
        let result = match_value(&expected, &actual, "");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].error_type, ErrorType::ExtraField);
    }

    #[test]
    fn partial_marker_ignores_extra_fields() {
        let expected = json!({"match:partial": true, "a": 1});
        let actual = json!({"a": 1, "b": 2});
        assert!(match_value(&expected, &actual, "").passed);
    }

    #[test]
    fn pattern_string_dispatches_inside_nested_object() {
        let expected = json!({"result": {"tools": "match:not:arrayLength:0"}});
        let actual = json!({"result": {"tools": [{"name": "read_file"}]}});
        assert!(match_value(&expected, &actual, "").passed);
    }

    #[test]
    fn array_length_mismatch_reported_without_per_element_noise() {
        let expected = json!([1, 2, 3]);
        let actual = json!([1, 2]);
        let result = match_value(&expected, &actual, "items");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].error_type, ErrorType::ArrayLengthMismatch);
    }

    #[test]
    fn extract_field_projects_wildcard_array_path() {
        let expected = json!({"match:extractField:tools.*.name": ["read_file", "write_file"]});
        let actual = json!({"tools": [{"name": "read_file"}, {"name": "write_file"}]});
        assert!(match_value(&expected, &actual, "").passed);
    }

    #[test]
    fn unknown_pattern_kind_is_pattern_syntax_error() {
        let expected = json!("match:arrayLenght:3");
        let actual = json!([1, 2, 3]);
        let result = match_value(&expected, &actual, "count");
        assert_eq!(result.errors[0].error_type, ErrorType::PatternSyntax);
    }
}
