use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced before or around a [`aegis_core::Runner`] invocation —
/// anything that should exit the process with code 2 rather than 1
/// (`SPEC_FULL.md` §6 "CLI surface").
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] aegis_core::ConfigError),

    #[error("failed to read config file `{path}`: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file `{path}`: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Run(#[from] aegis_core::AegisError),
}
