use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

/// Errors raised while spawning, driving, or tearing down an MCP server
/// under test.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("server did not become ready within {0:?}")]
    StartupTimeout(Duration),
    #[error("server did not respond to initialize: {0}")]
    Handshake(String),
    #[error("server returned a JSON-RPC error during initialize: {message} (code {code})")]
    HandshakeRpc { code: i64, message: String },
    #[error("failed to write to server stdin: {0}")]
    StdinWrite(#[source] io::Error),
    #[error("timed out after {0:?} waiting for a response")]
    Timeout(Duration),
    #[error("pending read was cancelled: {0}")]
    Cancelled(String),
    #[error("process exited before a response was received")]
    ProcessExited,
    #[error("child stdin unavailable")]
    StdinUnavailable,
    #[error("child stdout unavailable")]
    StdoutUnavailable,
    #[error("failed to serialize JSON-RPC message: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("transport channel closed unexpectedly")]
    ChannelClosed,
}

/// Errors raised while validating a [`crate::config::ServerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
    #[error("`startupTimeoutMs` must be positive, got {0}")]
    NonPositiveTimeout(i64),
    #[error("`readyPattern` is not a valid regex: {0}")]
    InvalidReadyPattern(#[source] regex::Error),
}

/// Errors raised while discovering or parsing test suite files. Loading
/// itself (glob expansion, YAML/JSON parsing) happens in `aegis-cli`; this
/// type lets that stage report through the same taxonomy as the rest of the
/// run instead of a CLI-private error type.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("no test files matched `{0}`")]
    NoMatches(String),
    #[error("invalid glob pattern `{pattern}`: {message}")]
    InvalidGlob { pattern: String, message: String },
    #[error("failed to read test file `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse test file `{path}`: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Top-level error returned by [`crate::runner::Runner`].
#[derive(Debug, Error)]
pub enum AegisError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mcp(#[from] McpError),
    #[error(transparent)]
    Suite(#[from] SuiteError),
}
