use serde::Serialize;
use serde_json::Value;

use crate::corrections::Suggestion;

/// Stable machine-readable category for a [`ValidationError`], used by the
/// reporter's `groupErrors` aggregation and the error-weighting table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    TypeMismatch,
    ValueMismatch,
    MissingField,
    ExtraField,
    ArrayLengthMismatch,
    PatternFailed,
    PatternSyntax,
}

impl ErrorType {
    /// Weight used by the reporter to rank "top recommendations" (§4.9).
    pub fn weight(self) -> u8 {
        match self {
            ErrorType::PatternSyntax => 10,
            ErrorType::ExtraField => 8,
            ErrorType::MissingField | ErrorType::TypeMismatch => 7,
            ErrorType::PatternFailed => 6,
            ErrorType::ArrayLengthMismatch => 5,
            ErrorType::ValueMismatch => 3,
        }
    }
}

/// One mismatch found while comparing an expected shape (possibly containing
/// pattern strings) against an actual JSON value.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub error_type: ErrorType,
    pub path: String,
    pub expected: Value,
    pub actual: Value,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
}

impl ValidationError {
    pub fn new(
        error_type: ErrorType,
        path: impl Into<String>,
        expected: Value,
        actual: Value,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error_type,
            path: path.into(),
            expected,
            actual,
            message: message.into(),
            pattern_type: None,
            suggestion: None,
        }
    }

    pub fn with_pattern_type(mut self, pattern_type: impl Into<String>) -> Self {
        self.pattern_type = Some(pattern_type.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: Option<Suggestion>) -> Self {
        self.suggestion = suggestion;
        self
    }
}

/// Summary of a [`ValidationResult`]'s errors, surfaced alongside `passed`/
/// `errors` per `SPEC_FULL.md` §3 so `--json` consumers don't have to
/// recompute it from the raw error list.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub summary: String,
    pub suggestions: Vec<String>,
    pub error_types: Vec<ErrorType>,
    pub paths_with_errors: Vec<String>,
}

impl Analysis {
    fn from_errors(errors: &[ValidationError]) -> Self {
        if errors.is_empty() {
            return Self {
                summary: "no validation errors".to_string(),
                ..Self::default()
            };
        }

        let mut error_types = Vec::new();
        let mut paths_with_errors = Vec::new();
        let mut suggestions = Vec::new();
        for error in errors {
            if !error_types.contains(&error.error_type) {
                error_types.push(error.error_type);
            }
            if !paths_with_errors.contains(&error.path) {
                paths_with_errors.push(error.path.clone());
            }
            if let Some(suggestion) = &error.suggestion {
                if !suggestions.contains(&suggestion.message) {
                    suggestions.push(suggestion.message.clone());
                }
            }
        }

        Self {
            summary: format!(
                "{} validation error{} across {} path{}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                paths_with_errors.len(),
                if paths_with_errors.len() == 1 { "" } else { "s" },
            ),
            suggestions,
            error_types,
            paths_with_errors,
        }
    }
}

/// Outcome of a single `match(expected, actual)` call.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub errors: Vec<ValidationError>,
    pub analysis: Analysis,
}

impl ValidationResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
            analysis: Analysis::from_errors(&[]),
        }
    }

    pub fn fail(errors: Vec<ValidationError>) -> Self {
        let analysis = Analysis::from_errors(&errors);
        Self {
            passed: errors.is_empty(),
            errors,
            analysis,
        }
    }

    pub fn merge(results: impl IntoIterator<Item = ValidationResult>) -> Self {
        let mut errors = Vec::new();
        for result in results {
            errors.extend(result.errors);
        }
        let analysis = Analysis::from_errors(&errors);
        Self {
            passed: errors.is_empty(),
            errors,
            analysis,
        }
    }
}
