use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppResult, ConfigError, FileError};

/// Program configuration
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of jobs running at once (and number of browser instances in the pool)
    pub max_concurrent: usize,
    /// Total attempts per job, including the first one
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_backoff_ms: u64,
    /// Delay before the first action of each job in the opening wave
    pub stagger_ms: u64,
    pub navigation_timeout_ms: u64,
    pub wait_timeout_ms: u64,
    pub script_timeout_ms: u64,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Chrome/Chromium binary; auto-detected when unset
    pub chrome_executable: Option<PathBuf>,
    /// Remote debugging port of the logged-in browser used for cart operations
    pub browser_debug_port: u16,
    /// Allow max_concurrent > 1 on a bridge that shares browser state
    pub allow_shared_session_concurrency: bool,
    pub base_url: String,
    pub default_quantity: u32,
    pub search_limit: usize,
    pub search_max_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent: 15,
            max_attempts: 3,
            retry_backoff_ms: 2000,
            stagger_ms: 250,
            navigation_timeout_ms: 30_000,
            wait_timeout_ms: 20_000,
            script_timeout_ms: 15_000,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            chrome_executable: None,
            browser_debug_port: 9222,
            allow_shared_session_concurrency: false,
            base_url: "https://www.lcsc.com".to_string(),
            default_quantity: 100,
            search_limit: 20,
            search_max_pages: 1,
        }
    }
}

impl Config {
    /// Defaults overridden by `LCSC_*` environment variables
    pub fn from_env() -> AppResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Load a TOML file, then apply environment overrides on top of it
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        base.with_env_overrides()
    }

    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FileError::read(path, e))?;
        let config = toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config)
    }

    /// Whether the TOML file or the environment sets `max_concurrent` explicitly
    pub fn max_concurrent_is_set(path: Option<&Path>) -> AppResult<bool> {
        if std::env::var_os("LCSC_MAX_CONCURRENT").is_some() {
            return Ok(true);
        }
        let Some(path) = path else {
            return Ok(false);
        };
        let content = std::fs::read_to_string(path).map_err(|e| FileError::read(path, e))?;
        let table: toml::Table = toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(table.contains_key("max_concurrent"))
    }

    fn with_env_overrides(mut self) -> AppResult<Self> {
        override_from_env("LCSC_MAX_CONCURRENT", &mut self.max_concurrent)?;
        override_from_env("LCSC_MAX_ATTEMPTS", &mut self.max_attempts)?;
        override_from_env("LCSC_RETRY_BACKOFF_MS", &mut self.retry_backoff_ms)?;
        override_from_env("LCSC_STAGGER_MS", &mut self.stagger_ms)?;
        override_from_env("LCSC_NAVIGATION_TIMEOUT_MS", &mut self.navigation_timeout_ms)?;
        override_from_env("LCSC_WAIT_TIMEOUT_MS", &mut self.wait_timeout_ms)?;
        override_from_env("LCSC_SCRIPT_TIMEOUT_MS", &mut self.script_timeout_ms)?;
        override_from_env("LCSC_HEADLESS", &mut self.headless)?;
        override_from_env("LCSC_VIEWPORT_WIDTH", &mut self.viewport_width)?;
        override_from_env("LCSC_VIEWPORT_HEIGHT", &mut self.viewport_height)?;
        override_from_env("LCSC_BROWSER_DEBUG_PORT", &mut self.browser_debug_port)?;
        override_from_env(
            "LCSC_ALLOW_SHARED_SESSION_CONCURRENCY",
            &mut self.allow_shared_session_concurrency,
        )?;
        override_from_env("LCSC_DEFAULT_QUANTITY", &mut self.default_quantity)?;
        override_from_env("LCSC_SEARCH_LIMIT", &mut self.search_limit)?;
        override_from_env("LCSC_SEARCH_MAX_PAGES", &mut self.search_max_pages)?;
        if let Ok(url) = std::env::var("LCSC_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(path) = std::env::var("LCSC_CHROME_EXECUTABLE") {
            self.chrome_executable = Some(PathBuf::from(path));
        }
        Ok(self)
    }

    /// Reject values no batch can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidPoolSize {
                value: self.max_concurrent,
            });
        }
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts", "0", "a positive integer"));
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(invalid(
                "viewport",
                &format!("{}x{}", self.viewport_width, self.viewport_height),
                "non-zero dimensions",
            ));
        }
        Ok(())
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }
}

fn override_from_env<T: FromStr>(var_name: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(raw) = std::env::var(var_name) {
        *target = raw.trim().parse().map_err(|_| {
            invalid(var_name, &raw, std::any::type_name::<T>())
        })?;
    }
    Ok(())
}

fn invalid(field: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_backoff(), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let config = Config {
            max_concurrent: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPoolSize { value: 0 })
        ));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("max_concurrent = 4\nheadless = false\n").unwrap();
        assert_eq!(config.max_concurrent, 4);
        assert!(!config.headless);
        assert_eq!(config.search_limit, 20);
        assert_eq!(config.base_url, "https://www.lcsc.com");
    }

    #[test]
    fn test_max_concurrent_set_in_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let with_key = dir.path().join("pool.toml");
        let without_key = dir.path().join("headed.toml");
        std::fs::write(&with_key, "max_concurrent = 4\n").unwrap();
        std::fs::write(&without_key, "headless = false\n").unwrap();

        assert!(Config::max_concurrent_is_set(Some(&with_key)).unwrap());
        if std::env::var_os("LCSC_MAX_CONCURRENT").is_none() {
            assert!(!Config::max_concurrent_is_set(Some(&without_key)).unwrap());
            assert!(!Config::max_concurrent_is_set(None).unwrap());
        }
    }

    #[test]
    fn test_toml_file_parse_error_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "max_concurrent = \"many\"").unwrap();

        let err = Config::from_toml_file(&path).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
