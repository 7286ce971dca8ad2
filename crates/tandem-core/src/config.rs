//! Runtime configuration.
//!
//! Lookup order: an explicit path, then `$TANDEM_CONFIG`, then
//! `<config dir>/tandem/config.json` if it exists, then defaults.
//! Environment overrides are applied on top of whatever was loaded.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::EngineKind;
use crate::error::ConfigError;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "TANDEM_CONFIG";
pub const STANDARD_MODULE_ENV: &str = "TANDEM_STANDARD_MODULE";
pub const ACCELERATED_MODULE_ENV: &str = "TANDEM_ACCELERATED_MODULE";
pub const WORKERS_ENV: &str = "TANDEM_WORKERS";
pub const THREADS_ENV: &str = "TANDEM_THREADS";

/// Tandem configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shared library for the standard build. Unset means the built-in engine.
    pub standard_module: Option<PathBuf>,

    /// Shared library for the accelerated build. Unset means the built-in engine.
    pub accelerated_module: Option<PathBuf>,

    /// Pool size for the accelerated build. Unset means hardware concurrency.
    pub worker_count: Option<usize>,

    /// Forces the capability answer instead of probing the host.
    pub threads: Option<bool>,
}

impl Config {
    /// Load configuration and apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => Some(PathBuf::from(path)),
                None => Self::default_path().filter(|p| p.is_file()),
            },
        };

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => {
                tracing::debug!("No config file, using defaults");
                Self::default()
            }
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!("Reading config from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no build could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(0) = self.worker_count {
            return Err(invalid("worker_count", "0"));
        }
        Ok(())
    }

    /// `<config dir>/tandem/config.json`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tandem").join("config.json"))
    }

    /// Apply `TANDEM_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = lookup(STANDARD_MODULE_ENV).filter(|v| !v.is_empty()) {
            self.standard_module = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(ACCELERATED_MODULE_ENV).filter(|v| !v.is_empty()) {
            self.accelerated_module = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup(WORKERS_ENV) {
            let count = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid(WORKERS_ENV, &value))?;
            self.worker_count = Some(count);
        }
        if let Some(value) = lookup(THREADS_ENV) {
            self.threads = Some(parse_flag(&value).ok_or_else(|| invalid(THREADS_ENV, &value))?);
        }
        self.validate()
    }

    /// Configured shared library for `kind`, if any.
    pub fn module_path(&self, kind: EngineKind) -> Option<&Path> {
        match kind {
            EngineKind::Standard => self.standard_module.as_deref(),
            EngineKind::Accelerated => self.accelerated_module.as_deref(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "worker_count": 3 }}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.worker_count, Some(3));
        assert_eq!(config.standard_module, None);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tandem.json");
        std::fs::write(
            &path,
            r#"{ "accelerated_module": "/opt/libfast.so", "threads": false }"#,
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(
            config.module_path(EngineKind::Accelerated),
            Some(Path::new("/opt/libfast.so"))
        );
        assert_eq!(config.module_path(EngineKind::Standard), None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ worker_count: ").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_zero_workers_in_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tandem.json");
        std::fs::write(&path, r#"{ "worker_count": 0 }"#).unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "worker_count"));

        let err = Config::load(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());
        let config = Config {
            worker_count: Some(0),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config {
            worker_count: Some(2),
            ..Config::default()
        };
        config
            .apply_overrides(env(&[
                (STANDARD_MODULE_ENV, "/tmp/libstd.so"),
                (WORKERS_ENV, "8"),
                (THREADS_ENV, "off"),
            ]))
            .unwrap();

        assert_eq!(config.standard_module, Some(PathBuf::from("/tmp/libstd.so")));
        assert_eq!(config.accelerated_module, None);
        assert_eq!(config.worker_count, Some(8));
        assert_eq!(config.threads, Some(false));
    }

    #[test]
    fn test_invalid_overrides() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[(WORKERS_ENV, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == WORKERS_ENV));

        let err = config
            .apply_overrides(env(&[(THREADS_ENV, "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == THREADS_ENV));
    }

    #[test]
    fn test_serializes_as_json() {
        let config = Config {
            threads: Some(true),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
