use std::{collections::HashMap, path::PathBuf, time::Duration};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_POST_HANDSHAKE_DELAY_MS: u64 = 100;

/// Launch configuration for the MCP server under test.
///
/// Immutable for the duration of a run; see `SPEC_FULL.md` §3.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub startup_timeout: Duration,
    pub ready_pattern: Option<Regex>,
    pub post_handshake_delay: Duration,
}

/// Wire shape consumed from a JSON config file (camelCase per §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfigFile {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
    #[serde(default)]
    pub startup_timeout: Option<i64>,
    #[serde(default)]
    pub ready_pattern: Option<String>,
    #[serde(default)]
    pub post_handshake_delay_ms: Option<i64>,
}

impl ServerConfigFile {
    /// Validates and converts a raw config file shape into a [`ServerConfig`].
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingField("name"));
        }
        if self.command.trim().is_empty() {
            return Err(ConfigError::MissingField("command"));
        }

        let startup_timeout = match self.startup_timeout {
            None => Duration::from_millis(DEFAULT_STARTUP_TIMEOUT_MS),
            Some(ms) if ms > 0 => Duration::from_millis(ms as u64),
            Some(ms) => return Err(ConfigError::NonPositiveTimeout(ms)),
        };

        let post_handshake_delay = match self.post_handshake_delay_ms {
            None => Duration::from_millis(DEFAULT_POST_HANDSHAKE_DELAY_MS),
            Some(ms) if ms >= 0 => Duration::from_millis(ms as u64),
            Some(ms) => return Err(ConfigError::NonPositiveTimeout(ms)),
        };

        let ready_pattern = match self.ready_pattern {
            None => None,
            Some(pattern) if pattern.is_empty() => {
                return Err(ConfigError::InvalidField {
                    field: "readyPattern",
                    expected: "a non-empty regex string",
                })
            }
            Some(pattern) => {
                Some(Regex::new(&pattern).map_err(ConfigError::InvalidReadyPattern)?)
            }
        };

        Ok(ServerConfig {
            name: self.name,
            command: self.command,
            args: self.args,
            cwd: self.cwd.map(PathBuf::from),
            env: self.env.unwrap_or_default(),
            startup_timeout,
            ready_pattern,
            post_handshake_delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_file() -> ServerConfigFile {
        ServerConfigFile {
            name: "echo-server".into(),
            command: "node".into(),
            args: vec!["server.js".into()],
            cwd: None,
            env: None,
            startup_timeout: None,
            ready_pattern: None,
            post_handshake_delay_ms: None,
        }
    }

    #[test]
    fn defaults_startup_timeout_to_5000ms() {
        let config = base_file().into_config().expect("valid config");
        assert_eq!(config.startup_timeout, Duration::from_millis(5000));
        assert_eq!(config.post_handshake_delay, Duration::from_millis(100));
    }

    #[test]
    fn rejects_empty_name() {
        let mut file = base_file();
        file.name = "  ".into();
        assert!(matches!(
            file.into_config(),
            Err(ConfigError::MissingField("name"))
        ));
    }

    #[test]
    fn rejects_negative_startup_timeout() {
        let mut file = base_file();
        file.startup_timeout = Some(-1);
        assert!(matches!(
            file.into_config(),
            Err(ConfigError::NonPositiveTimeout(-1))
        ));
    }

    #[test]
    fn rejects_empty_ready_pattern() {
        let mut file = base_file();
        file.ready_pattern = Some(String::new());
        assert!(matches!(
            file.into_config(),
            Err(ConfigError::InvalidField { field: "readyPattern", .. })
        ));
    }

    #[test]
    fn compiles_ready_pattern_regex() {
        let mut file = base_file();
        file.ready_pattern = Some("Server ready".into());
        let config = file.into_config().expect("valid config");
        assert!(config.ready_pattern.unwrap().is_match("Server ready on :3000"));
    }
}
