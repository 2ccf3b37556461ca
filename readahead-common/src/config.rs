//! Configuration file resolution and TOML loading
//!
//! Config file lookup follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`<config dir>/readahead/config.toml`)
//! 4. None - callers fall back to built-in defaults

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the per-user config directory and file
const CONFIG_DIR_NAME: &str = "readahead";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve which config file to load, if any.
///
/// An explicitly named file (CLI or environment) is returned even if it does
/// not exist, so the caller reports a useful error. The platform default is
/// only returned when present.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|path| path.exists())
}

/// Get the default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load and deserialize a TOML file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let value = toml::from_str(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(value)
}

/// Load a TOML file if a path was resolved, otherwise use defaults
pub fn load_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    match path {
        Some(path) => load_toml(path),
        None => {
            debug!("No configuration file found, using built-in defaults");
            Ok(T::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        name: String,
        #[serde(default)]
        count: u32,
    }

    #[test]
    fn test_cli_argument_wins() {
        let cli = PathBuf::from("/tmp/explicit.toml");
        let resolved = resolve_config_path(Some(&cli), "READAHEAD_TEST_UNSET_VAR");
        assert_eq!(resolved, Some(cli));
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = \"pool\"\ncount = 4").unwrap();

        let sample: Sample = load_toml(file.path()).unwrap();
        assert_eq!(
            sample,
            Sample {
                name: "pool".to_string(),
                count: 4
            }
        );
    }

    #[test]
    fn test_load_toml_missing_file_is_config_error() {
        let err = load_toml::<Sample>(Path::new("/nonexistent/readahead.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_toml_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "count = \"not a number\"").unwrap();

        let err = load_toml::<Sample>(file.path()).unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_load_or_default_without_path() {
        let sample: Sample = load_or_default(None).unwrap();
        assert_eq!(sample, Sample::default());
    }
}
