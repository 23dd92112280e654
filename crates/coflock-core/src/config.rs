//! Lock acquisition options and their layered loading
//!
//! # Hierarchy
//!
//! Options are loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config: `<config dir>/coflock/config.toml`
//! 3. An explicit config file
//! 4. Environment variables: `COFLOCK_*`
//! 5. CLI flags (applied by the binary)
//!
//! # Example Config
//!
//! ```toml
//! [lock]
//! retry_interval_ms = 250
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{Error, Result};

/// Default pause between two contended lock attempts
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Environment variable overriding the retry interval, in milliseconds
pub const RETRY_INTERVAL_ENV: &str = "COFLOCK_RETRY_INTERVAL_MS";

/// Configuration for lock acquisition behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    /// How long a contended acquisition suspends before probing again.
    ///
    /// Fixed: no exponential growth, no jitter.
    pub retry_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl LockOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pause between contended attempts
    #[must_use]
    pub const fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Reject options that would turn the retry loop into a busy spin.
    pub fn validate(&self) -> Result<()> {
        if self.retry_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "retry interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Parse a TOML document and apply it on top of `self`.
    pub fn merge_toml(self, content: &str) -> Result<Self> {
        toml::from_str::<ConfigFile>(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {e}")))
            .map(|file| self.merge(file.lock))
    }

    /// Apply `COFLOCK_*` overrides found through `lookup`.
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`.
    pub fn apply_env<F>(self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(raw) = lookup(RETRY_INTERVAL_ENV) else {
            return Ok(self);
        };
        raw.trim()
            .parse::<u64>()
            .map(|ms| self.with_retry_interval(Duration::from_millis(ms)))
            .map_err(|e| {
                Error::InvalidConfig(format!("{RETRY_INTERVAL_ENV}='{raw}' is not a number: {e}"))
            })
    }

    fn merge(self, section: LockSection) -> Self {
        match section.retry_interval_ms {
            Some(ms) => self.with_retry_interval(Duration::from_millis(ms)),
            None => self,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    lock: LockSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LockSection {
    retry_interval_ms: Option<u64>,
}

/// Load options from all sources except CLI flags.
///
/// `explicit` must exist when given; the global file is optional.
///
/// # Errors
///
/// Returns error if:
/// - A config file cannot be read or is malformed TOML
/// - The environment override is not a number
/// - The resulting options fail validation
pub fn load_options(explicit: Option<&Path>) -> Result<LockOptions> {
    let options = LockOptions::default();

    let options = match global_config_path() {
        Some(global) if global.is_file() => load_toml_file(options, &global)?,
        _ => options,
    };

    let options = match explicit {
        Some(path) => load_toml_file(options, path)?,
        None => options,
    };

    let options = options.apply_env(|key| std::env::var(key).ok())?;
    options.validate()?;
    tracing::debug!("Loaded lock options: {options:?}");
    Ok(options)
}

/// Get path to the global config file
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "coflock")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn load_toml_file(options: LockOptions, path: &Path) -> Result<LockOptions> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::io(format!("Failed to read config file {}", path.display()), e)
    })?;
    options.merge_toml(&content)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_default_retry_interval_is_one_second() {
        let options = LockOptions::default();
        assert_eq!(options.retry_interval, Duration::from_secs(1));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let options = LockOptions::new().with_retry_interval(Duration::ZERO);
        assert!(matches!(options.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_merge_toml_overrides_interval() {
        let options = LockOptions::new()
            .merge_toml("[lock]\nretry_interval_ms = 250\n")
            .expect("valid toml");

        assert_eq!(options.retry_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_merge_toml_empty_document_keeps_values() {
        let base = LockOptions::new().with_retry_interval(Duration::from_millis(40));
        let options = base.clone().merge_toml("").expect("empty toml");
        assert_eq!(options, base);
    }

    #[test]
    fn test_merge_toml_rejects_unknown_keys() {
        let result = LockOptions::new().merge_toml("[lock]\ntimeout_ms = 10\n");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_env_override_wins() {
        let options = LockOptions::new()
            .apply_env(|key| (key == RETRY_INTERVAL_ENV).then(|| "75".to_string()))
            .expect("numeric env");

        assert_eq!(options.retry_interval, Duration::from_millis(75));
    }

    #[test]
    fn test_env_override_must_be_numeric() {
        let result = LockOptions::new().apply_env(|_| Some("soon".to_string()));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    #[serial]
    fn test_load_options_layers_file_then_env() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("coflock.toml");
        std::fs::write(&path, "[lock]\nretry_interval_ms = 500\n").expect("write config");

        std::env::remove_var(RETRY_INTERVAL_ENV);
        let from_file = load_options(Some(&path)).expect("load from file");
        assert_eq!(from_file.retry_interval, Duration::from_millis(500));

        std::env::set_var(RETRY_INTERVAL_ENV, "20");
        let from_env = load_options(Some(&path));
        std::env::remove_var(RETRY_INTERVAL_ENV);

        assert_eq!(
            from_env.expect("load with env").retry_interval,
            Duration::from_millis(20)
        );
    }

    #[test]
    #[serial]
    fn test_load_options_missing_explicit_file_is_io_error() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("absent.toml");

        let result = load_options(Some(&path));

        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
