use std::time::{Duration, Instant};

use crate::{
    communicator::MCPCommunicator,
    error::McpError,
    pattern::match_value,
    protocol::expects_reply,
    test_model::{StderrExpectation, Test},
    validation::{ErrorType, ValidationError, ValidationResult},
};

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    Failed,
}

/// Recorded outcome of one executed [`Test`] (`SPEC_FULL.md` §4.9 "per-test" shape).
#[derive(Debug, Clone)]
pub struct TestResult {
    pub description: String,
    pub status: Status,
    pub duration: Duration,
    pub error_message: Option<String>,
    pub validation: Option<ValidationResult>,
}

/// Drives one [`Test`] against a running [`MCPCommunicator`] (`SPEC_FULL.md` §4.8).
pub struct TestExecutor {
    read_timeout: Duration,
}

impl TestExecutor {
    pub fn new(read_timeout: Option<Duration>) -> Self {
        Self {
            read_timeout: read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT),
        }
    }

    /// Runs `test`: clears buffers, sends the request, reads a response if
    /// one is expected, validates response and stderr, and records timing.
    pub async fn run(&self, communicator: &MCPCommunicator, test: &Test) -> TestResult {
        let started = Instant::now();

        // Buffer hygiene is unconditional: forgotten clears are the most
        // common source of cross-test contamination (SPEC_FULL.md §9).
        communicator.clear_all_buffers().await;

        if let Err(send_err) = communicator.send_message(&test.request).await {
            return self.transport_failure(test, started, send_err);
        }

        let response = if expects_reply(&test.request) {
            match communicator.read_message(self.read_timeout).await {
                Ok(response) => Some(response),
                Err(read_err) => return self.transport_failure(test, started, read_err),
            }
        } else {
            None
        };

        let mut validation = ValidationResult::pass();

        if let (Some(expected), Some(actual)) = (&test.expect.response, &response) {
            let response_result = match_value(expected, actual, "");
            validation = ValidationResult::merge([validation, response_result]);
        }

        if let Some(stderr_expectation) = &test.expect.stderr {
            let stderr = communicator.stderr().await;
            if let Some(error) = self.check_stderr(stderr_expectation, &stderr) {
                validation = ValidationResult::merge([validation, ValidationResult::fail(vec![error])]);
            }
        }

        let duration = started.elapsed();
        if validation.passed {
            TestResult {
                description: test.description.clone(),
                status: Status::Passed,
                duration,
                error_message: None,
                validation: None,
            }
        } else {
            let error_message = validation
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "validation failed".to_string());
            TestResult {
                description: test.description.clone(),
                status: Status::Failed,
                duration,
                error_message: Some(error_message),
                validation: Some(validation),
            }
        }
    }

    fn check_stderr(&self, expectation: &StderrExpectation, stderr: &str) -> Option<ValidationError> {
        let trimmed = stderr.trim();
        match expectation {
            StderrExpectation::ToBeEmpty if trimmed.is_empty() => None,
            StderrExpectation::ToBeEmpty => Some(ValidationError::new(
                ErrorType::ValueMismatch,
                "stderr",
                serde_json::Value::String(String::new()),
                serde_json::Value::String(trimmed.to_string()),
                "expected stderr to be empty",
            )),
            StderrExpectation::Exact(expected) if trimmed == expected => None,
            StderrExpectation::Exact(expected) => Some(ValidationError::new(
                ErrorType::ValueMismatch,
                "stderr",
                serde_json::Value::String(expected.clone()),
                serde_json::Value::String(trimmed.to_string()),
                "stderr did not match exactly",
            )),
            StderrExpectation::Pattern(pattern) => {
                let result = match_value(
                    &serde_json::Value::String(pattern.clone()),
                    &serde_json::Value::String(trimmed.to_string()),
                    "stderr",
                );
                result.errors.into_iter().next()
            }
        }
    }

    fn transport_failure(&self, test: &Test, started: Instant, error: McpError) -> TestResult {
        let validation_error = ValidationError::new(
            ErrorType::PatternFailed,
            "",
            serde_json::Value::Null,
            serde_json::Value::Null,
            format!("transport error: {error}"),
        );
        TestResult {
            description: test.description.clone(),
            status: Status::Failed,
            duration: started.elapsed(),
            error_message: Some(error.to_string()),
            validation: Some(ValidationResult::fail(vec![validation_error])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::collections::HashMap;

    fn config(script: &str) -> ServerConfig {
        ServerConfig {
            name: "test".into(),
            command: "sh".into(),
            args: vec!["-c".into(), script.into()],
            cwd: None,
            env: HashMap::new(),
            startup_timeout: Duration::from_secs(1),
            ready_pattern: None,
            post_handshake_delay: Duration::from_millis(0),
        }
    }

    #[tokio::test]
    async fn passing_test_reports_no_validation() {
        let script = r#"
            read -r line
            printf '{"jsonrpc":"2.0","id":1,"result":{"ok":true}}\n'
            cat
        "#;
        let communicator = MCPCommunicator::start(&config(script)).await.unwrap();
        let executor = TestExecutor::new(Some(Duration::from_secs(2)));
        let test: Test = serde_json::from_value(serde_json::json!({
            "description": "basic ping",
            "request": {"jsonrpc": "2.0", "id": 1, "method": "ping"},
            "expect": {"response": {"result": {"ok": true}}},
        }))
        .unwrap();

        let result = executor.run(&communicator, &test).await;
        assert_eq!(result.status, Status::Passed);
        communicator.stop().await;
    }

    #[tokio::test]
    async fn failing_pattern_is_recorded_with_validation() {
        let script = r#"
            read -r line
            printf '{"jsonrpc":"2.0","id":1,"result":{"count":2}}\n'
            cat
        "#;
        let communicator = MCPCommunicator::start(&config(script)).await.unwrap();
        let executor = TestExecutor::new(Some(Duration::from_secs(2)));
        let test: Test = serde_json::from_value(serde_json::json!({
            "description": "count check",
            "request": {"jsonrpc": "2.0", "id": 1, "method": "ping"},
            "expect": {"response": {"result": {"count": "match:greaterThan:10"}}},
        }))
        .unwrap();

        let result = executor.run(&communicator, &test).await;
        assert_eq!(result.status, Status::Failed);
        assert!(result.validation.is_some());
        communicator.stop().await;
    }

    #[tokio::test]
    async fn notification_without_id_does_not_wait_for_reply() {
        let communicator = MCPCommunicator::start(&config("cat")).await.unwrap();
        let executor = TestExecutor::new(Some(Duration::from_millis(100)));
        let test: Test = serde_json::from_value(serde_json::json!({
            "description": "fire and forget",
            "request": {"jsonrpc": "2.0", "method": "notifications/ping"},
        }))
        .unwrap();

        let result = executor.run(&communicator, &test).await;
        assert_eq!(result.status, Status::Passed);
        communicator.stop().await;
    }
}
