use std::path::Path;

use aegis_core::{config::ServerConfigFile, ServerConfig};

use crate::error::CliError;

/// Reads and validates a `ServerConfig` from a JSON file (`SPEC_FULL.md` §6
/// "Configuration file").
pub fn load(path: &Path) -> Result<ServerConfig, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ServerConfigFile = serde_json::from_str(&raw).map_err(|source| CliError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.into_config()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_a_minimal_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"name": "echo", "command": "node", "args": ["server.js"]}}"#).unwrap();
        let config = load(file.path()).expect("valid config");
        assert_eq!(config.name, "echo");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load(Path::new("/nonexistent/aegis-config.json")).unwrap_err();
        assert!(matches!(err, CliError::ConfigIo { .. }));
    }
}
