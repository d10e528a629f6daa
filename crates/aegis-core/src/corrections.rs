//! CorrectionsAnalyzer: given a pattern-shaped string that failed to parse or
//! failed to match, produce ranked suggestions for what the author probably
//! meant. Pure and infallible — unknown input yields an empty list, never an
//! error (`SPEC_FULL.md` §4.7).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamplePair {
    pub incorrect: String,
    pub correct: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub message: String,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<ExamplePair>,
}

impl Suggestion {
    fn high(message: impl Into<String>, corrected: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            confidence: Confidence::High,
            corrected: Some(corrected.into()),
            alternatives: Vec::new(),
            example: None,
        }
    }

    fn medium(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            confidence: Confidence::Medium,
            corrected: None,
            alternatives: Vec::new(),
            example: None,
        }
    }
}

/// Runs every sub-analyzer over `raw` and returns at most a handful of
/// suggestions, high-confidence first.
pub fn analyze(raw: &str) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    suggestions.extend(type_corrections(raw));
    suggestions.extend(operator_corrections(raw));
    suggestions.extend(regex_corrections(raw));
    suggestions.extend(non_existent_features(raw));
    suggestions.extend(misspelling_corrections(raw));

    suggestions.sort_by_key(|s| match s.confidence {
        Confidence::High => 0,
        Confidence::Medium => 1,
    });
    suggestions.truncate(5);
    suggestions
}

const KNOWN_KINDS: &[&str] = &[
    "type", "exists", "length", "count", "contains", "containsIgnoreCase", "startsWith", "endsWith",
    "equalsIgnoreCase", "regex", "arrayLength", "arrayContains", "arrayElements", "equals", "notEquals",
    "greaterThan", "greaterThanOrEqual", "lessThan", "lessThanOrEqual", "between", "range", "approximately",
    "multipleOf", "divisibleBy", "decimalPlaces", "dateValid", "dateAfter", "dateBefore", "dateBetween",
    "dateAge", "dateEquals", "dateFormat", "partial", "extractField",
];

fn kind_of(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix("match:")?;
    let rest = rest.strip_prefix("not:").unwrap_or(rest);
    rest.split(':').next()
}

fn type_corrections(raw: &str) -> Vec<Suggestion> {
    let mut out = Vec::new();

    if !raw.starts_with("match:") {
        if let Some(bare_type) = raw
            .strip_prefix("typeof:")
            .or_else(|| raw.strip_prefix("instanceof:"))
        {
            out.push(Suggestion::high(
                "`typeof:`/`instanceof:` are not pattern kinds; use `type:`",
                format!("match:type:{}", bare_type.to_lowercase()),
            ));
        } else if KNOWN_KINDS.iter().any(|k| raw.starts_with(&format!("{k}:")) || *k == raw) {
            out.push(Suggestion::high("pattern strings must start with `match:`", format!("match:{raw}")));
        }
        return out;
    }

    let capitalized = [
        ("String", "string"),
        ("Number", "number"),
        ("Boolean", "boolean"),
        ("Object", "object"),
        ("Array", "array"),
        ("Undefined", "undefined"),
        ("Null", "null"),
    ];
    for (wrong, right) in capitalized {
        if raw == format!("match:type:{wrong}") {
            out.push(Suggestion::high(
                format!("JS type names are lowercase: `{wrong}` \u{2192} `{right}`"),
                format!("match:type:{right}"),
            ));
        }
        let quoted = format!("match:type:\"{}\"", wrong.to_lowercase());
        if raw == quoted {
            out.push(Suggestion::high(
                "type parameters are bare words, not quoted strings",
                format!("match:type:{right}"),
            ));
        }
    }

    if raw == "match:isArray" || raw == "match:Array.isArray" {
        out.push(Suggestion::high("use `type:array`, not a validation-library idiom", "match:type:array"));
    }
    if raw == "match:type:any" {
        out.push(Suggestion::high("TS `any` has no value-level equivalent; use `exists`", "match:exists"));
    }
    if raw == "match:type:void" {
        out.push(Suggestion::high("TS `void` maps to `undefined`", "match:type:undefined"));
    }
    if raw == "match:type:never" {
        out.push(Suggestion::high("TS `never` means the field must be absent", "match:not:exists"));
    }
    for (foreign, right) in [("List", "array"), ("ArrayList", "array"), ("varchar", "string"), ("Integer", "number")] {
        if raw == format!("match:type:{foreign}") {
            out.push(Suggestion::high(
                format!("`{foreign}` is not a JSON type; did you mean `{right}`?"),
                format!("match:type:{right}"),
            ));
        }
    }

    out
}

fn operator_corrections(raw: &str) -> Vec<Suggestion> {
    let Some(kind) = kind_of(raw) else { return Vec::new() };
    let aliases = [
        ("eq", "equals"),
        ("ne", "notEquals"),
        ("gt", "greaterThan"),
        ("lt", "lessThan"),
        ("gte", "greaterThanOrEqual"),
        ("lte", "lessThanOrEqual"),
        ("==", "equals"),
        ("!=", "notEquals"),
        (">", "greaterThan"),
        ("<", "lessThan"),
        (">=", "greaterThanOrEqual"),
        ("<=", "lessThanOrEqual"),
    ];
    let mut out = Vec::new();
    for (alias, correct) in aliases {
        if kind == alias {
            let corrected = raw.replacen(&format!(":{alias}:"), &format!(":{correct}:"), 1);
            out.push(Suggestion::high(format!("`{alias}` is not a pattern kind; use `{correct}`"), corrected));
        }
    }

    if (kind == "between" || kind == "range") && raw.contains(',') {
        out.push(Suggestion::medium("ranges use `:` as the delimiter, not `,`"));
    }

    out
}

fn regex_corrections(raw: &str) -> Vec<Suggestion> {
    let Some(kind) = kind_of(raw) else { return Vec::new() };
    let mut out = Vec::new();

    if kind == "regexp" || kind == "re" || kind == "pattern" {
        let corrected = raw.replacen(&format!(":{kind}:"), ":regex:", 1);
        out.push(Suggestion::high(format!("`{kind}` is not a pattern kind; use `regex`"), corrected));
        return out;
    }

    if kind != "regex" {
        return out;
    }

    let param = raw.splitn(3, ':').nth(2).unwrap_or_default();
    if param.contains("\\\\") {
        out.push(Suggestion::high(
            "double-escaped backslashes read as literal `\\\\`; pattern strings don't need JSON-level escaping",
            raw.replace("\\\\", "\\"),
        ));
    }
    if param.starts_with('"') && param.ends_with('"') && param.len() >= 2 {
        out.push(Suggestion::high(
            "regex parameters are not quoted",
            format!("match:regex:{}", &param[1..param.len() - 1]),
        ));
    }
    if param.contains("[[:digit:]]") {
        out.push(Suggestion::high(
            "POSIX character classes aren't supported; use a normal character class",
            param.replace("[[:digit:]]", "[0-9]"),
        ));
    }
    if param.contains("{1,}") {
        out.push(Suggestion::high("`{1,}` is equivalent to `+`", param.replace("{1,}", "+")));
    }
    if param.ends_with("/i") {
        out.push(Suggestion::medium(
            "inline `/flags` syntax isn't supported; case-insensitive matching has no dedicated flag here",
        ));
    }
    let opens = param.matches('(').count() + param.matches('[').count();
    let closes = param.matches(')').count() + param.matches(']').count();
    if opens != closes {
        out.push(Suggestion::medium("unbalanced brackets or parentheses in regex"));
    }

    out
}

fn non_existent_features(raw: &str) -> Vec<Suggestion> {
    let Some(kind) = kind_of(raw) else { return Vec::new() };
    let entry = |alternatives: &[&str], incorrect: &str, correct: &str| Suggestion {
        message: format!("`{kind}` is not a supported pattern kind"),
        confidence: Confidence::Medium,
        corrected: None,
        alternatives: alternatives.iter().map(|s| s.to_string()).collect(),
        example: Some(ExamplePair {
            incorrect: incorrect.to_string(),
            correct: correct.to_string(),
        }),
    };

    match kind {
        "email" => vec![entry(
            &["match:regex:^[^@]+@[^@]+\\.[^@]+$", "match:contains:@"],
            "match:email:",
            "match:regex:^[^@]+@[^@]+\\.[^@]+$",
        )],
        "uuid" => vec![entry(
            &["match:regex:^[0-9a-f-]{36}$"],
            "match:uuid:",
            "match:regex:^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
        )],
        "jwt" => vec![entry(&["match:regex:^[\\w-]+\\.[\\w-]+\\.[\\w-]+$"], "match:jwt:", "match:regex:^[\\w-]+\\.[\\w-]+\\.[\\w-]+$")],
        "httpStatus" => vec![entry(&["match:range:200:299", "match:equals:200"], "match:httpStatus:2xx", "match:range:200:299")],
        "positive" => vec![entry(&["match:greaterThan:0"], "match:positive:", "match:greaterThan:0")],
        "even" | "odd" | "prime" => vec![entry(&["match:regex:...", "compute in the test harness instead"], &format!("match:{kind}:"), "match:regex:...")],
        "empty" => vec![entry(&["match:length:0", "match:arrayLength:0"], "match:empty:", "match:length:0")],
        _ => Vec::new(),
    }
}

/// Common misspellings of known kind names, keyed by edit-distance-adjacent
/// typos observed in real suites.
fn misspelling_corrections(raw: &str) -> Vec<Suggestion> {
    let Some(kind) = kind_of(raw) else { return Vec::new() };
    if KNOWN_KINDS.contains(&kind) {
        return Vec::new();
    }

    const MISSPELLINGS: &[(&str, &str)] = &[
        ("arrayLenght", "arrayLength"),
        ("arrayLegnth", "arrayLength"),
        ("conatins", "contains"),
        ("containss", "contains"),
        ("startWith", "startsWith"),
        ("endWith", "endsWith"),
        ("greaterThen", "greaterThan"),
        ("lessThen", "lessThan"),
        ("regexp", "regex"),
        ("betwen", "between"),
        ("existsOrNull", "exists"),
    ];

    if let Some((_, correct)) = MISSPELLINGS.iter().find(|(wrong, _)| *wrong == kind) {
        let corrected = raw.replacen(kind, correct, 1);
        return vec![Suggestion::high(format!("`{kind}` looks like a misspelling of `{correct}`"), corrected)];
    }

    if let Some(closest) = KNOWN_KINDS
        .iter()
        .map(|known| (*known, edit_distance(kind, known)))
        .filter(|(_, distance)| *distance <= 2)
        .min_by_key(|(_, distance)| *distance)
        .map(|(known, _)| known)
    {
        let corrected = raw.replacen(kind, closest, 1);
        return vec![Suggestion::high(format!("`{kind}` looks like a misspelling of `{closest}`"), corrected)];
    }

    Vec::new()
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, &ca) in a.iter().enumerate() {
        let mut prev_diag = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let temp = row[j + 1];
            row[j + 1] = if ca == cb {
                prev_diag
            } else {
                1 + prev_diag.min(row[j]).min(row[j + 1])
            };
            prev_diag = temp;
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_arraylength_for_common_typo() {
        let suggestions = analyze("match:arrayLenght:3");
        assert!(suggestions.iter().any(|s| s.corrected.as_deref() == Some("match:arrayLength:3")));
    }

    #[test]
    fn suggests_lowercase_type_name() {
        let suggestions = analyze("match:type:String");
        assert!(suggestions.iter().any(|s| s.corrected.as_deref() == Some("match:type:string")));
    }

    #[test]
    fn flags_non_existent_email_feature() {
        let suggestions = analyze("match:email:");
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].example.is_some());
    }

    #[test]
    fn unknown_well_formed_pattern_yields_no_suggestions() {
        assert!(analyze("match:type:string").is_empty());
    }

    #[test]
    fn suggests_operator_alias_correction() {
        let suggestions = analyze("match:gt:10");
        assert!(suggestions.iter().any(|s| s.corrected.as_deref() == Some("match:greaterThan:10")));
    }
}
