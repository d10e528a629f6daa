#![forbid(unsafe_code)]

//! Pure engine for driving an MCP server under test over JSON-RPC 2.0 on
//! stdio: process supervision, stream framing, request/response
//! correlation, the pattern-matching validation language, and result
//! reporting. Configuration loading, test-file discovery, and the CLI live
//! in `aegis-cli`.

pub mod communicator;
pub mod config;
pub mod corrections;
pub mod error;
pub mod executor;
pub mod handshake;
pub mod message;
pub mod pattern;
pub mod process;
pub mod protocol;
pub mod reporter;
pub mod runner;
pub mod stream;
pub mod test_model;
pub mod validation;

pub use communicator::MCPCommunicator;
pub use config::ServerConfig;
pub use error::{AegisError, ConfigError, McpError, SuiteError};
pub use executor::{Status, TestExecutor, TestResult};
pub use reporter::{Reporter, ReporterOptions, SuiteReport};
pub use runner::{RunOutcome, Runner};
pub use test_model::{Expect, StderrExpectation, Test, TestSuite};
