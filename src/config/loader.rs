//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ServerConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse configuration from a TOML file.
///
/// Value ranges are not checked here. Command-line flags may still replace
/// out-of-range values, so callers validate after applying them.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load from `path` when given, otherwise start from defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(ServerConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("movie-api-{}-{}.toml", name, std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_valid_file() {
        let path = write_temp(
            "valid",
            r#"
            [rate_limit]
            requests_per_second = 5.0
            burst = 8
            "#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.rate_limit.requests_per_second, 5.0);
        assert_eq!(config.rate_limit.burst, 8);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn out_of_range_value_can_be_fixed_by_flag() {
        use crate::config::cli::Cli;
        use crate::config::validation::validate_config;
        use clap::Parser;

        let path = write_temp("overridden", "[rate_limit]\nburst = 0\n");
        let mut config = load_or_default(Some(&path)).unwrap();
        assert_eq!(config.rate_limit.burst, 0);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            ConfigError::Validation(errors).to_string(),
            "Validation failed: rate_limit.burst: must be at least 1"
        );

        Cli::parse_from(["movie-api", "--limiter-burst", "4"]).apply(&mut config);
        assert!(validate_config(&config).is_ok());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let path = write_temp("malformed", "[rate_limit\nburst = 4\n");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
