//! End-to-end coverage of the seed scenarios from `SPEC_FULL.md` §8, driven
//! through the public `Runner`/`Reporter` API against a fake stdio MCP
//! server (a `sh` script that reads one line per request and echoes a
//! canned response).

use std::collections::HashMap;
use std::time::Duration;

use aegis_core::{Reporter, ReporterOptions, Runner, ServerConfig, TestSuite};

fn config(script: &str) -> ServerConfig {
    ServerConfig {
        name: "fake-mcp-server".into(),
        command: "sh".into(),
        args: vec!["-c".into(), script.into()],
        cwd: None,
        env: HashMap::new(),
        startup_timeout: Duration::from_secs(2),
        ready_pattern: None,
        post_handshake_delay: Duration::from_millis(0),
    }
}

/// Responds to `initialize`/`notifications/initialized` then to exactly one
/// follow-up request with `response_line`.
fn single_tool_server(response_line: &str) -> String {
    format!(
        r#"
        read -r init_request
        printf '{{"jsonrpc":"2.0","id":"aegis-init","result":{{"protocolVersion":"2025-06-18"}}}}\n'
        read -r initialized_notification
        read -r request
        printf '%s\n' '{response_line}'
        "#
    )
}

fn suite(description: &str, request: serde_json::Value, response: serde_json::Value) -> TestSuite {
    serde_json::from_value(serde_json::json!({
        "description": description,
        "tests": [{
            "it": description,
            "request": request,
            "expect": {"response": response, "stderr": "toBeEmpty"},
        }],
    }))
    .expect("suite parses")
}

#[tokio::test]
async fn tools_discovery_passes() {
    let response = r#"{"jsonrpc":"2.0","id":"t1","result":{"tools":[{"name":"read_file"}]}}"#;
    let config = config(&single_tool_server(response));
    let suites = vec![suite(
        "tools discovery",
        serde_json::json!({"jsonrpc": "2.0", "id": "t1", "method": "tools/list"}),
        serde_json::json!({"result": {"tools": "match:not:arrayLength:0"}}),
    )];

    let runner = Runner::new(Some(Duration::from_secs(2)));
    let outcome = runner.run(&config, &suites).await.expect("run succeeds");
    let summary = Reporter::summarize(&outcome.suites);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn tool_execution_with_contains() {
    let response =
        r#"{"jsonrpc":"2.0","id":"t1","result":{"content":[{"text":"Hello world"}],"isError":false}}"#;
    let config = config(&single_tool_server(response));
    let suites = vec![suite(
        "tool execution",
        serde_json::json!({
            "jsonrpc": "2.0", "id": "t1", "method": "tools/call",
            "params": {"name": "read_file", "arguments": {"path": "./hello.txt"}},
        }),
        serde_json::json!({"result": {"content": [{"text": "match:contains:Hello"}], "isError": false}}),
    )];

    let runner = Runner::new(Some(Duration::from_secs(2)));
    let outcome = runner.run(&config, &suites).await.expect("run succeeds");
    assert_eq!(Reporter::summarize(&outcome.suites).passed, 1);
}

#[tokio::test]
async fn numeric_range_and_negation() {
    let response = r#"{"jsonrpc":"2.0","id":"t1","result":{"uptime":99.8,"errorCount":3}}"#;
    let config = config(&single_tool_server(response));
    let suites = vec![suite(
        "health check",
        serde_json::json!({"jsonrpc": "2.0", "id": "t1", "method": "health"}),
        serde_json::json!({"result": {"uptime": "match:between:90:100", "errorCount": "match:not:greaterThan:10"}}),
    )];

    let runner = Runner::new(Some(Duration::from_secs(2)));
    let outcome = runner.run(&config, &suites).await.expect("run succeeds");
    assert_eq!(Reporter::summarize(&outcome.suites).passed, 1);
}

#[tokio::test]
async fn date_validation() {
    let response = r#"{"jsonrpc":"2.0","id":"t1","result":{"createdAt":"2025-09-10T10:30:00.000Z","invalidDate":"not-a-date"}}"#;
    let config = config(&single_tool_server(response));
    let suites = vec![suite(
        "dates",
        serde_json::json!({"jsonrpc": "2.0", "id": "t1", "method": "metadata"}),
        serde_json::json!({"result": {"createdAt": "match:dateFormat:iso", "invalidDate": "match:not:dateValid"}}),
    )];

    let runner = Runner::new(Some(Duration::from_secs(2)));
    let outcome = runner.run(&config, &suites).await.expect("run succeeds");
    assert_eq!(Reporter::summarize(&outcome.suites).passed, 1);
}

#[tokio::test]
async fn pattern_misspelling_is_diagnosed() {
    let response = r#"{"jsonrpc":"2.0","id":"t1","result":{"tools":[{"name":"read_file"}]}}"#;
    let config = config(&single_tool_server(response));
    let suites = vec![suite(
        "typo",
        serde_json::json!({"jsonrpc": "2.0", "id": "t1", "method": "tools/list"}),
        serde_json::json!({"result": {"tools": "match:arrayLenght:3"}}),
    )];

    let runner = Runner::new(Some(Duration::from_secs(2)));
    let outcome = runner.run(&config, &suites).await.expect("run succeeds");
    let summary = Reporter::summarize(&outcome.suites);
    assert_eq!(summary.failed, 1);

    let test = &outcome.suites[0].tests[0];
    let validation = test.validation.as_ref().expect("failure carries validation");
    let suggestion = validation.errors[0].suggestion.as_ref().expect("typo is diagnosed");
    assert_eq!(suggestion.corrected.as_deref(), Some("match:arrayLength:3"));

    let reporter = Reporter::new(ReporterOptions::default());
    let report = reporter.render(&outcome.suites, outcome.elapsed);
    assert!(report.contains("arrayLength"));
}

#[tokio::test]
async fn server_exit_mid_suite_aborts_remaining_tests() {
    let script = r#"
        read -r init_request
        printf '{"jsonrpc":"2.0","id":"aegis-init","result":{}}\n'
        read -r initialized_notification
        exit 0
    "#;
    let config = config(script);
    let suites = vec![suite(
        "orphaned",
        serde_json::json!({"jsonrpc": "2.0", "id": "t1", "method": "ping"}),
        serde_json::json!({"result": {}}),
    )];

    let runner = Runner::new(Some(Duration::from_millis(500)));
    let outcome = runner.run(&config, &suites).await.expect("run completes despite exit");
    assert_eq!(Reporter::summarize(&outcome.suites).failed, 1);
}
