//! Pattern dispatch: parses `match:[not:]<kind>[:param...]` strings into a
//! tagged-variant [`Pattern`] and evaluates them against actual JSON values.
//! See `SPEC_FULL.md` §4.6. Structural recursion (deep equality, `partial`,
//! `extractField`) lives in [`engine`].

mod engine;

pub use engine::match_value;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

pub const PREFIX: &str = "match:";
pub const NEGATE_PREFIX: &str = "not:";

/// `true` iff `s` is a pattern string and should be pattern-dispatched rather
/// than compared by equality.
pub fn is_pattern(s: &str) -> bool {
    s.starts_with(PREFIX)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Type(TypeName),
    Exists,
    Length(u64),
    Contains(String),
    ContainsIgnoreCase(String),
    StartsWith(String),
    EndsWith(String),
    EqualsIgnoreCase(String),
    Regex(String),
    ArrayLength(u64),
    ArrayContains(ArrayContains),
    ArrayElements(Box<Pattern>),
    Equals(f64),
    NotEquals(f64),
    GreaterThan(f64),
    GreaterThanOrEqual(f64),
    LessThan(f64),
    LessThanOrEqual(f64),
    Between(f64, f64),
    Approximately(f64, f64),
    MultipleOf(f64),
    DecimalPlaces(u32),
    DateValid,
    DateAfter(String),
    DateBefore(String),
    DateBetween(String, String),
    DateAge(String),
    DateEquals(String),
    DateFormat(String),
    Partial,
    ExtractField(String),
    Not(Box<Pattern>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeName {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Function,
    Undefined,
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayContains {
    Value(Value),
    Field(String, Value),
}

/// Pattern did not parse: either the kind is unknown or a parameter was
/// malformed. The string is preserved verbatim for [`crate::corrections`].
#[derive(Debug, Clone, PartialEq)]
pub struct PatternParseError {
    pub raw: String,
    pub reason: String,
}

pub fn parse(raw: &str) -> Result<Pattern, PatternParseError> {
    let err = |reason: &str| PatternParseError {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };

    let rest = raw.strip_prefix(PREFIX).ok_or_else(|| err("missing `match:` prefix"))?;
    let (negate, rest) = match rest.strip_prefix(NEGATE_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, rest),
    };

    let pattern = parse_kind(rest, raw)?;
    Ok(if negate { Pattern::Not(Box::new(pattern)) } else { pattern })
}

fn parse_kind(rest: &str, raw: &str) -> Result<Pattern, PatternParseError> {
    let err = |reason: &str| PatternParseError {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };
    let num = |s: &str| -> Result<f64, PatternParseError> {
        s.parse::<f64>().map_err(|_| err(&format!("`{s}` is not a number")))
    };

    let mut parts = rest.splitn(2, ':');
    let kind = parts.next().unwrap_or_default();
    let params = parts.next().unwrap_or_default();

    match kind {
        "type" => Ok(Pattern::Type(parse_type_name(params).ok_or_else(|| {
            err(&format!("unknown type name `{params}`"))
        })?)),
        "exists" => Ok(Pattern::Exists),
        "length" | "count" => Ok(Pattern::Length(
            params.parse::<u64>().map_err(|_| err("length requires a non-negative integer"))?,
        )),
        "contains" => Ok(Pattern::Contains(params.to_string())),
        "containsIgnoreCase" => Ok(Pattern::ContainsIgnoreCase(params.to_string())),
        "startsWith" => Ok(Pattern::StartsWith(params.to_string())),
        "endsWith" => Ok(Pattern::EndsWith(params.to_string())),
        "equalsIgnoreCase" => Ok(Pattern::EqualsIgnoreCase(params.to_string())),
        "regex" => Ok(Pattern::Regex(params.to_string())),
        "arrayLength" => Ok(Pattern::ArrayLength(
            params
                .parse::<u64>()
                .map_err(|_| err("arrayLength requires a non-negative integer"))?,
        )),
        "arrayContains" => parse_array_contains(params, raw),
        "arrayElements" => {
            let inner = parse(&format!("{PREFIX}{params}")).map_err(|_| {
                err("arrayElements requires a valid nested pattern")
            })?;
            Ok(Pattern::ArrayElements(Box::new(inner)))
        }
        "equals" => Ok(Pattern::Equals(num(params)?)),
        "notEquals" => Ok(Pattern::NotEquals(num(params)?)),
        "greaterThan" => Ok(Pattern::GreaterThan(num(params)?)),
        "greaterThanOrEqual" => Ok(Pattern::GreaterThanOrEqual(num(params)?)),
        "lessThan" => Ok(Pattern::LessThan(num(params)?)),
        "lessThanOrEqual" => Ok(Pattern::LessThanOrEqual(num(params)?)),
        "between" | "range" => {
            let (lo, hi) = split_two(params).ok_or_else(|| err("requires <lo>:<hi>"))?;
            Ok(Pattern::Between(num(lo)?, num(hi)?))
        }
        "approximately" => {
            let (n, tol) = split_two(params).ok_or_else(|| err("requires <n>:<tolerance>"))?;
            Ok(Pattern::Approximately(num(n)?, num(tol)?))
        }
        "multipleOf" | "divisibleBy" => Ok(Pattern::MultipleOf(num(params)?)),
        "decimalPlaces" => Ok(Pattern::DecimalPlaces(
            params.parse::<u32>().map_err(|_| err("decimalPlaces requires a non-negative integer"))?,
        )),
        "dateValid" => Ok(Pattern::DateValid),
        "dateAfter" => Ok(Pattern::DateAfter(params.to_string())),
        "dateBefore" => Ok(Pattern::DateBefore(params.to_string())),
        "dateBetween" => {
            let (lo, hi) = split_two(params).ok_or_else(|| err("requires <lo>:<hi>"))?;
            Ok(Pattern::DateBetween(lo.to_string(), hi.to_string()))
        }
        "dateAge" => Ok(Pattern::DateAge(params.to_string())),
        "dateEquals" => Ok(Pattern::DateEquals(params.to_string())),
        "dateFormat" => Ok(Pattern::DateFormat(params.to_string())),
        "partial" => Ok(Pattern::Partial),
        "extractField" => Ok(Pattern::ExtractField(params.to_string())),
        _ => Err(err(&format!("unknown pattern kind `{kind}`"))),
    }
}

fn split_two(params: &str) -> Option<(&str, &str)> {
    let mut parts = params.splitn(2, ':');
    Some((parts.next()?, parts.next()?))
}

fn parse_array_contains(params: &str, raw: &str) -> Result<Pattern, PatternParseError> {
    // `arrayContains:<value>` or `arrayContains:<field>:<value>` — splitting
    // at most twice means a bare value may itself legally contain `:`.
    match split_two(params) {
        Some((field, value)) if !value.is_empty() => Ok(Pattern::ArrayContains(ArrayContains::Field(
            field.to_string(),
            parse_loose_value(value),
        ))),
        _ => Ok(Pattern::ArrayContains(ArrayContains::Value(parse_loose_value(params)))),
    }
}

/// Array/scalar pattern parameters are written as bare tokens (`true`,
/// `42`, `read_file`), not JSON; fall back to a JSON string when the token
/// isn't valid JSON on its own.
fn parse_loose_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_type_name(name: &str) -> Option<TypeName> {
    Some(match name {
        "string" => TypeName::String,
        "number" => TypeName::Number,
        "boolean" => TypeName::Boolean,
        "object" => TypeName::Object,
        "array" => TypeName::Array,
        "function" => TypeName::Function,
        "undefined" => TypeName::Undefined,
        "null" => TypeName::Null,
        _ => return None,
    })
}

/// Evaluates a parsed, non-structural pattern (anything but `Partial` /
/// `ExtractField`, which [`engine`] handles before reaching here) against
/// `actual`. Returns `Ok(true/false)` for a well-formed check, or `Err` when
/// the pattern is being applied to an incompatible shape (`type_mismatch`,
/// not a failed check).
pub fn evaluate(pattern: &Pattern, actual: &Value) -> Result<bool, EvalError> {
    match pattern {
        Pattern::Not(inner) => evaluate(inner, actual).map(|result| !result),
        Pattern::Type(type_name) => Ok(matches_type(*type_name, actual)),
        // Reaching here at all means the engine found a value at this path;
        // JSON has no `undefined`, so a present `null` counts as existing.
        Pattern::Exists => Ok(true),
        Pattern::Length(n) => length_of(actual).map(|len| len == *n),
        Pattern::Contains(needle) => as_str(actual)?.contains(needle.as_str()).into_ok(),
        Pattern::ContainsIgnoreCase(needle) => as_str(actual)?
            .to_lowercase()
            .contains(&needle.to_lowercase())
            .into_ok(),
        Pattern::StartsWith(prefix) => as_str(actual)?.starts_with(prefix.as_str()).into_ok(),
        Pattern::EndsWith(suffix) => as_str(actual)?.ends_with(suffix.as_str()).into_ok(),
        Pattern::EqualsIgnoreCase(expected) => {
            (as_str(actual)?.to_lowercase() == expected.to_lowercase()).into_ok()
        }
        Pattern::Regex(pattern_str) => {
            let re = Regex::new(pattern_str).map_err(|e| EvalError::InvalidRegex(e.to_string()))?;
            re.is_match(as_str(actual)?).into_ok()
        }
        Pattern::ArrayLength(n) => (as_array(actual)?.len() as u64 == *n).into_ok(),
        Pattern::ArrayContains(spec) => evaluate_array_contains(spec, actual)?.into_ok(),
        Pattern::ArrayElements(inner) => {
            for element in as_array(actual)? {
                if !evaluate(inner, element)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Pattern::Equals(n) => (as_f64(actual)? == *n).into_ok(),
        Pattern::NotEquals(n) => (as_f64(actual)? != *n).into_ok(),
        Pattern::GreaterThan(n) => (as_f64(actual)? > *n).into_ok(),
        Pattern::GreaterThanOrEqual(n) => (as_f64(actual)? >= *n).into_ok(),
        Pattern::LessThan(n) => (as_f64(actual)? < *n).into_ok(),
        Pattern::LessThanOrEqual(n) => (as_f64(actual)? <= *n).into_ok(),
        Pattern::Between(lo, hi) => {
            let value = as_f64(actual)?;
            (value >= *lo && value <= *hi).into_ok()
        }
        Pattern::Approximately(n, tol) => ((as_f64(actual)? - *n).abs() <= *tol).into_ok(),
        Pattern::MultipleOf(n) => {
            if *n == 0.0 {
                return Ok(false);
            }
            let value = as_f64(actual)?;
            (((value / n).round() * n - value).abs() < 1e-9).into_ok()
        }
        Pattern::DecimalPlaces(n) => (decimal_places(as_f64(actual)?) <= *n).into_ok(),
        Pattern::DateValid => parse_date(actual).is_ok().into_ok(),
        Pattern::DateAfter(iso) => {
            let value = parse_date(actual).map_err(EvalError::InvalidDate)?;
            let bound = parse_date_str(iso)?;
            (value > bound).into_ok()
        }
        Pattern::DateBefore(iso) => {
            let value = parse_date(actual).map_err(EvalError::InvalidDate)?;
            let bound = parse_date_str(iso)?;
            (value < bound).into_ok()
        }
        Pattern::DateBetween(lo, hi) => {
            let value = parse_date(actual).map_err(EvalError::InvalidDate)?;
            let lo = parse_date_str(lo)?;
            let hi = parse_date_str(hi)?;
            (value >= lo && value <= hi).into_ok()
        }
        Pattern::DateAge(duration) => {
            let value = parse_date(actual).map_err(EvalError::InvalidDate)?;
            let max_age = parse_duration(duration)?;
            ((Utc::now() - value) <= max_age).into_ok()
        }
        Pattern::DateEquals(iso) => {
            let value = parse_date(actual).map_err(EvalError::InvalidDate)?;
            let bound = parse_date_str(iso)?;
            (value == bound).into_ok()
        }
        Pattern::DateFormat(format) => matches_date_format(format, actual).into_ok(),
        Pattern::Partial | Pattern::ExtractField(_) => Err(EvalError::NotALeafPattern),
    }
}

/// Small ergonomic helper so leaf arms can end in `expr.into_ok()` instead of
/// `Ok(expr)`, keeping the match arms above readable as one-liners.
trait IntoOk {
    fn into_ok(self) -> Result<bool, EvalError>;
}

impl IntoOk for bool {
    fn into_ok(self) -> Result<bool, EvalError> {
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    TypeMismatch { expected: &'static str, actual: &'static str },
    InvalidRegex(String),
    InvalidDate(String),
    InvalidDuration(String),
    NotALeafPattern,
}

fn matches_type(type_name: TypeName, actual: &Value) -> bool {
    match type_name {
        TypeName::String => actual.is_string(),
        TypeName::Number => actual.is_number(),
        TypeName::Boolean => actual.is_boolean(),
        TypeName::Array => actual.is_array(),
        TypeName::Object => actual.is_object(),
        TypeName::Null => actual.is_null(),
        TypeName::Undefined => actual.is_null(),
        TypeName::Function => false,
    }
}

fn length_of(actual: &Value) -> Result<u64, EvalError> {
    match actual {
        Value::String(s) => Ok(s.chars().count() as u64),
        Value::Array(a) => Ok(a.len() as u64),
        Value::Object(o) => Ok(o.len() as u64),
        _ => Err(EvalError::TypeMismatch {
            expected: "string, array, or object",
            actual: json_type_name(actual),
        }),
    }
}

fn as_str(actual: &Value) -> Result<&str, EvalError> {
    actual.as_str().ok_or(EvalError::TypeMismatch {
        expected: "string",
        actual: json_type_name(actual),
    })
}

fn as_array(actual: &Value) -> Result<&Vec<Value>, EvalError> {
    actual.as_array().ok_or(EvalError::TypeMismatch {
        expected: "array",
        actual: json_type_name(actual),
    })
}

fn as_f64(actual: &Value) -> Result<f64, EvalError> {
    actual.as_f64().ok_or(EvalError::TypeMismatch {
        expected: "number",
        actual: json_type_name(actual),
    })
}

fn evaluate_array_contains(spec: &ArrayContains, actual: &Value) -> Result<bool, EvalError> {
    let items = as_array(actual)?;
    Ok(match spec {
        ArrayContains::Value(expected) => items.iter().any(|item| item == expected),
        ArrayContains::Field(field, expected) => items
            .iter()
            .any(|item| item.get(field).is_some_and(|value| value == expected)),
    })
}

fn decimal_places(value: f64) -> u32 {
    let text = format!("{value}");
    match text.split_once('.') {
        Some((_, frac)) => frac.trim_end_matches('0').len() as u32,
        None => 0,
    }
}

fn parse_date(actual: &Value) -> Result<DateTime<Utc>, String> {
    match actual {
        Value::String(s) => parse_date_str(s).map_err(|e| match e {
            EvalError::InvalidDate(msg) => msg,
            other => format!("{other:?}"),
        }),
        Value::Number(n) => {
            let millis = n.as_i64().ok_or_else(|| format!("`{n}` is not a valid epoch-millis integer"))?;
            DateTime::from_timestamp_millis(millis).ok_or_else(|| format!("`{millis}` is out of range"))
        }
        _ => Err(format!("`{actual}` is not a date-like value")),
    }
}

fn parse_date_str(raw: &str) -> Result<DateTime<Utc>, EvalError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| EvalError::InvalidDate(format!("`{raw}` is not a valid ISO-8601 timestamp")))
}

fn parse_duration(raw: &str) -> Result<chrono::Duration, EvalError> {
    let invalid = || EvalError::InvalidDuration(format!("`{raw}` is not a valid duration (e.g. `1d`, `30m`)"));
    let unit = raw.chars().last().ok_or_else(invalid)?;
    let amount: i64 = raw[..raw.len() - 1].parse().map_err(|_| invalid())?;
    Ok(match unit {
        's' => chrono::Duration::seconds(amount),
        'm' => chrono::Duration::minutes(amount),
        'h' => chrono::Duration::hours(amount),
        'd' => chrono::Duration::days(amount),
        _ => return Err(invalid()),
    })
}

fn matches_date_format(format: &str, actual: &Value) -> bool {
    let Some(text) = actual.as_str() else { return false };
    match format {
        "iso" => DateTime::parse_from_rfc3339(text).is_ok(),
        "us" => Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").unwrap().is_match(text),
        _ => false,
    }
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
