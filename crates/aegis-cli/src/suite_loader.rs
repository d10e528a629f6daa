use std::path::PathBuf;

use aegis_core::{AegisError, SuiteError, TestSuite};

use crate::error::CliError;

fn suite_err(err: SuiteError) -> CliError {
    CliError::Run(AegisError::from(err))
}

/// Expands each glob in `patterns` and parses every matched file as a test
/// suite. YAML and JSON are both accepted (JSON is valid YAML), per
/// `SPEC_FULL.md` §6 "Test file schema".
pub fn load_all(patterns: &[String]) -> Result<Vec<TestSuite>, CliError> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let mut matched = false;
        let entries = glob::glob(pattern).map_err(|source| {
            suite_err(SuiteError::InvalidGlob {
                pattern: pattern.clone(),
                message: source.to_string(),
            })
        })?;
        for entry in entries.flatten() {
            matched = true;
            paths.push(entry);
        }
        if !matched && PathBuf::from(pattern).is_file() {
            matched = true;
            paths.push(PathBuf::from(pattern));
        }
        if !matched {
            return Err(suite_err(SuiteError::NoMatches(pattern.clone())));
        }
    }

    paths.sort();
    paths.into_iter().map(|path| load_one(&path)).collect()
}

fn load_one(path: &PathBuf) -> Result<TestSuite, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        suite_err(SuiteError::Io {
            path: path.clone(),
            source,
        })
    })?;
    serde_yaml::from_str(&raw).map_err(|source| {
        suite_err(SuiteError::Parse {
            path: path.clone(),
            message: source.to_string(),
        })
    })
}
