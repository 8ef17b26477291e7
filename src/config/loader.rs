//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ScannerConfig;
use crate::config::validation::{validate_config, ConfigViolation};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_violations(.0))]
    Validation(Vec<ConfigViolation>),
}

fn join_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ScannerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ScannerConfig, ConfigError> {
    let config: ScannerConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanner.toml");
        fs::write(
            &path,
            "[ingest]\nchunk_size = 50\n[channel]\npeer_queue_depth = 8\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.ingest.chunk_size, 50);
        assert_eq!(config.channel.peer_queue_depth, 8);
    }

    #[test]
    fn test_validation_failure_surfaces_all_fields() {
        let err = parse_config("[scheduler]\nbatch_size = 0\njitter_ratio = 2.0\n").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed"));
        assert!(message.contains("scheduler.batch_size"));
        assert!(message.contains("scheduler.jitter_ratio"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
