use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use serde::Serialize;

use crate::executor::{Status, TestResult};
use crate::validation::{ErrorType, ValidationError};

/// Flags controlling [`Reporter`] output, one per `SPEC_FULL.md` §4.9 /
/// §6 CLI flag.
#[derive(Debug, Clone, Default)]
pub struct ReporterOptions {
    pub verbose: bool,
    pub quiet: bool,
    pub json: bool,
    pub errors_only: bool,
    pub group_errors: bool,
    pub syntax_only: bool,
    pub no_analysis: bool,
    pub max_errors: Option<usize>,
    pub timing: bool,
}

#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub description: String,
    pub tests: Vec<TestResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

pub struct Reporter {
    options: ReporterOptions,
}

impl Reporter {
    pub fn new(options: ReporterOptions) -> Self {
        Self { options }
    }

    pub fn summarize(suites: &[SuiteReport]) -> Summary {
        let total: usize = suites.iter().map(|s| s.tests.len()).sum();
        let passed = suites
            .iter()
            .flat_map(|s| &s.tests)
            .filter(|t| t.status == Status::Passed)
            .count();
        Summary {
            total,
            passed,
            failed: total - passed,
        }
    }

    /// Renders the full report for a completed run.
    pub fn render(&self, suites: &[SuiteReport], elapsed: Duration) -> String {
        if self.options.json {
            return self.render_json(suites, elapsed);
        }

        let summary = Self::summarize(suites);

        if self.options.quiet {
            return if self.options.timing {
                format!(
                    "{} passed, {} failed, {} total ({:.2?})\n",
                    summary.passed, summary.failed, summary.total, elapsed
                )
            } else {
                format!(
                    "{} passed, {} failed, {} total\n",
                    summary.passed, summary.failed, summary.total
                )
            };
        }

        let mut out = String::new();
        for suite in suites {
            self.render_suite(&mut out, suite);
        }

        if self.options.group_errors {
            self.render_grouped_errors(&mut out, suites);
        }

        if !self.options.no_analysis {
            self.render_top_recommendations(&mut out, suites);
        }

        let _ = writeln!(
            out,
            "\n{} passed, {} failed, {} total ({:.2?})",
            summary.passed, summary.failed, summary.total, elapsed
        );
        out
    }

    fn render_suite(&self, out: &mut String, suite: &SuiteReport) {
        let has_visible = suite.tests.iter().any(|t| self.is_visible(t));
        if !has_visible {
            return;
        }
        let _ = writeln!(out, "{}", suite.description);
        for test in &suite.tests {
            if !self.is_visible(test) {
                continue;
            }
            match test.status {
                Status::Passed => {
                    let _ = writeln!(out, "  \u{2713} {} ({:.2?})", test.description, test.duration);
                }
                Status::Failed => {
                    let _ = writeln!(out, "  \u{2717} {} ({:.2?})", test.description, test.duration);
                    self.render_failure_block(out, test);
                }
            }
        }
    }

    fn is_visible(&self, test: &TestResult) -> bool {
        match test.status {
            Status::Passed => self.options.verbose && !self.options.errors_only,
            Status::Failed => true,
        }
    }

    fn render_failure_block(&self, out: &mut String, test: &TestResult) {
        let Some(validation) = &test.validation else { return };
        let errors = self.filtered_errors(&validation.errors);
        let limit = self.options.max_errors.unwrap_or(errors.len());
        for error in errors.iter().take(limit) {
            let _ = writeln!(out, "      at {}: {}", display_path(&error.path), error.message);
            if !self.options.no_analysis {
                if let Some(suggestion) = &error.suggestion {
                    let _ = writeln!(out, "        suggestion: {}", suggestion.message);
                    if let Some(corrected) = &suggestion.corrected {
                        let _ = writeln!(out, "        try: {corrected}");
                    }
                }
            }
        }
    }

    fn filtered_errors<'a>(&self, errors: &'a [ValidationError]) -> Vec<&'a ValidationError> {
        errors
            .iter()
            .filter(|e| {
                if self.options.syntax_only {
                    e.error_type == ErrorType::PatternSyntax && e.suggestion.is_some()
                } else {
                    true
                }
            })
            .collect()
    }

    fn render_grouped_errors(&self, out: &mut String, suites: &[SuiteReport]) {
        let mut groups: HashMap<(ErrorType, String), GroupEntry> = HashMap::new();
        for suite in suites {
            for test in &suite.tests {
                let Some(validation) = &test.validation else { continue };
                for error in &validation.errors {
                    let key = (error.error_type, error.expected.to_string());
                    let entry = groups.entry(key).or_insert_with(|| GroupEntry {
                        count: 0,
                        tests: std::collections::HashSet::new(),
                        sample_paths: Vec::new(),
                    });
                    entry.count += 1;
                    entry.tests.insert(test.description.clone());
                    if entry.sample_paths.len() < 3 {
                        entry.sample_paths.push(error.path.clone());
                    }
                }
            }
        }

        if groups.is_empty() {
            return;
        }

        let _ = writeln!(out, "\nGrouped errors:");
        let mut grouped: Vec<_> = groups.into_iter().collect();
        grouped.sort_by(|a, b| b.1.count.cmp(&a.1.count));

        let field_types = [ErrorType::MissingField, ErrorType::ExtraField];
        for ((error_type, expected), entry) in grouped {
            if field_types.contains(&error_type) && entry.sample_paths.len() > 3 {
                let _ = writeln!(
                    out,
                    "  {:?}: {} occurrences across {} tests (fields rolled up: {})",
                    error_type,
                    entry.count,
                    entry.tests.len(),
                    entry.sample_paths.len()
                );
            } else {
                let _ = writeln!(
                    out,
                    "  {:?} {}: {} occurrences across {} tests, e.g. {}",
                    error_type,
                    expected,
                    entry.count,
                    entry.tests.len(),
                    entry.sample_paths.join(", ")
                );
            }
        }
    }

    fn render_top_recommendations(&self, out: &mut String, suites: &[SuiteReport]) {
        let mut ranked: Vec<&ValidationError> = suites
            .iter()
            .flat_map(|s| &s.tests)
            .filter_map(|t| t.validation.as_ref())
            .flat_map(|v| &v.errors)
            .filter(|e| e.suggestion.is_some())
            .collect();

        if ranked.is_empty() {
            return;
        }

        ranked.sort_by(|a, b| b.error_type.weight().cmp(&a.error_type.weight()));
        ranked.dedup_by(|a, b| a.error_type == b.error_type && a.expected == b.expected);

        let _ = writeln!(out, "\nTop recommendations:");
        for error in ranked.iter().take(3) {
            if let Some(suggestion) = &error.suggestion {
                let _ = writeln!(out, "  - {}", suggestion.message);
            }
        }
    }

    fn render_json(&self, suites: &[SuiteReport], elapsed: Duration) -> String {
        let summary = Self::summarize(suites);
        let body = serde_json::json!({
            "summary": summary,
            "performance": {"elapsedMs": elapsed.as_millis()},
            "suites": suites.iter().map(|suite| {
                serde_json::json!({
                    "description": suite.description,
                    "tests": suite.tests.iter().map(|t| test_result_json(t, self.options.no_analysis)).collect::<Vec<_>>(),
                })
            }).collect::<Vec<_>>(),
        });
        serde_json::to_string_pretty(&body).unwrap_or_else(|_| "{}".to_string())
    }
}

struct GroupEntry {
    count: usize,
    tests: std::collections::HashSet<String>,
    sample_paths: Vec<String>,
}

fn test_result_json(result: &TestResult, no_analysis: bool) -> serde_json::Value {
    let validation_result = result.validation.as_ref().map(|v| {
        let mut value = serde_json::to_value(v).unwrap_or_default();
        if no_analysis {
            if let Some(object) = value.as_object_mut() {
                object.remove("analysis");
            }
        }
        value
    });
    serde_json::json!({
        "description": result.description,
        "status": match result.status { Status::Passed => "passed", Status::Failed => "failed" },
        "durationMs": result.duration.as_millis(),
        "errorMessage": result.error_message,
        "validationResult": validation_result,
    })
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "(root)"
    } else {
        path
    }
}
