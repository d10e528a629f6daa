use std::path::PathBuf;

use clap::Parser;

/// MCP Aegis: a declarative and programmatic test runner for Model Context
/// Protocol servers over JSON-RPC 2.0 on stdio.
#[derive(Debug, Parser)]
#[command(name = "aegis", version, about)]
pub struct Cli {
    /// Glob(s) matching test suite files (YAML or JSON).
    #[arg(required = true)]
    pub tests: Vec<String>,

    /// Path to the server configuration file (JSON).
    #[arg(long)]
    pub config: PathBuf,

    /// Print every test, including passing ones.
    #[arg(long)]
    pub verbose: bool,

    /// Raise log verbosity to `debug` regardless of `RUST_LOG`.
    #[arg(long)]
    pub debug: bool,

    /// Print only the final summary.
    #[arg(long)]
    pub quiet: bool,

    /// Include elapsed-time figures in output that would otherwise omit them.
    #[arg(long)]
    pub timing: bool,

    /// Emit a single JSON report instead of human-readable text.
    #[arg(long)]
    pub json: bool,

    /// Suppress passing-test lines; show only failures.
    #[arg(long = "errors-only")]
    pub errors_only: bool,

    /// Restrict shown failures to ones CorrectionsAnalyzer could diagnose.
    #[arg(long = "syntax-only")]
    pub syntax_only: bool,

    /// Suppress the suggestion/analysis block under each failure.
    #[arg(long = "no-analysis")]
    pub no_analysis: bool,

    /// Aggregate identical errors across tests into one block.
    #[arg(long = "group-errors")]
    pub group_errors: bool,

    /// Cap the number of errors shown per failing test.
    #[arg(long = "max-errors")]
    pub max_errors: Option<usize>,

    /// Per-test read timeout in milliseconds (default: 5000).
    #[arg(long = "max-test-timeout-ms")]
    pub max_test_timeout_ms: Option<u64>,
}
