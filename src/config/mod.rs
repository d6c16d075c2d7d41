// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{ClientError, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (prefix: GEMGUARD_, nested with `__`)
    /// 2. Config file (`~/.gemguard/config.toml`, optional)
    /// 3. Defaults (lowest)
    pub fn load() -> Result<Self> {
        Self::build(File::with_name(&Self::default_config_path()).required(false))
    }

    /// Load configuration from an explicit file; the file must exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::build(File::from(path.as_ref()).required(true))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("GEMGUARD")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        let mut app: AppConfig = config
            .try_deserialize()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        if app.gemini.api_key.is_empty() {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                app.gemini.api_key = key;
            }
        }

        app.validate()?;
        Ok(app)
    }

    /// Reject settings the client cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(ClientError::Config("retry.max_attempts must be >= 1".into()));
        }
        if self.retry.backoff_multiplier <= 1.0 {
            return Err(ClientError::Config(
                "retry.backoff_multiplier must be > 1".into(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ClientError::Config(
                "retry.max_delay_ms must be >= retry.base_delay_ms".into(),
            ));
        }
        if self.rate_limit.concurrency == 0 {
            return Err(ClientError::Config(
                "rate_limit.concurrency must be >= 1".into(),
            ));
        }
        if self.gemini.timeout_ms == 0 {
            return Err(ClientError::Config("gemini.timeout_ms must be > 0".into()));
        }
        Ok(())
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gemguard")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.rate_limit.concurrency, 5);
        assert_eq!(config.cache.ttl_ms, 300_000);
    }

    #[test]
    fn test_validate_rejects_flat_backoff() {
        let mut config = AppConfig::default();
        config.retry.backoff_multiplier = 1.0;
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[gemini]\napi_key = \"test-key\"\nmodel = \"gemini-test\"\n\n[rate_limit]\nconcurrency = 2\n\n[cache]\nttl_ms = 1000"
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.gemini.model, "gemini-test");
        assert_eq!(config.rate_limit.concurrency, 2);
        assert_eq!(config.cache.ttl_ms, 1000);
        // Untouched sections keep defaults
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        assert!(AppConfig::load_from("/nonexistent/gemguard.toml").is_err());
    }
}
