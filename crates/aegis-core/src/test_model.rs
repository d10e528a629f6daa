use serde::Deserialize;
use serde_json::Value;

/// Expected outcome for one test's response and stderr (`SPEC_FULL.md` §4.8, §6).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Expect {
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub stderr: Option<StderrExpectation>,
}

#[derive(Clone, Debug)]
pub enum StderrExpectation {
    ToBeEmpty,
    Pattern(String),
    Exact(String),
}

impl<'de> Deserialize<'de> for StderrExpectation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "toBeEmpty" => StderrExpectation::ToBeEmpty,
            _ if crate::pattern::is_pattern(&raw) => StderrExpectation::Pattern(raw),
            _ => StderrExpectation::Exact(raw),
        })
    }
}

/// One declarative test case. `it`/`description` are interchangeable wire
/// keys for the same field, per §6's "Test file schema".
#[derive(Clone, Debug, Deserialize)]
pub struct Test {
    #[serde(alias = "it")]
    pub description: String,
    pub request: Value,
    #[serde(default)]
    pub expect: Expect,
}

/// A named group of tests loaded from one YAML/JSON test file.
#[derive(Clone, Debug, Deserialize)]
pub struct TestSuite {
    pub description: String,
    pub tests: Vec<Test>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_it_alias_for_description() {
        let json = serde_json::json!({
            "it": "responds to ping",
            "request": {"jsonrpc": "2.0", "id": 1, "method": "ping"},
        });
        let test: Test = serde_json::from_value(json).unwrap();
        assert_eq!(test.description, "responds to ping");
    }

    #[test]
    fn stderr_expectation_recognizes_pattern_strings() {
        let json = serde_json::json!({
            "description": "quiet tool",
            "request": {"method": "x"},
            "expect": {"stderr": "match:contains:warning"},
        });
        let test: Test = serde_json::from_value(json).unwrap();
        assert!(matches!(test.expect.stderr, Some(StderrExpectation::Pattern(_))));
    }

    #[test]
    fn stderr_expectation_to_be_empty() {
        let json = serde_json::json!({"stderr": "toBeEmpty"});
        let expect: Expect = serde_json::from_value(json).unwrap();
        assert!(matches!(expect.stderr, Some(StderrExpectation::ToBeEmpty)));
    }

    #[test]
    fn parses_full_suite() {
        let json = serde_json::json!({
            "description": "tools",
            "tests": [
                {"it": "lists tools", "request": {"method": "tools/list", "id": "t1"}},
            ],
        });
        let suite: TestSuite = serde_json::from_value(json).unwrap();
        assert_eq!(suite.tests.len(), 1);
    }
}
