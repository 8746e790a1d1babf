//! Configuration with environment variable support.
//!
//! [`ApiConfig::from_env`] loads a `.env` file if present, then reads the
//! `SLEEPY_`-prefixed variables:
//!
//! | Variable                  | Field                    | Default   |
//! |---------------------------|--------------------------|-----------|
//! | `SLEEPY_BASE_PATH`        | `base_path`              | `""`      |
//! | `SLEEPY_BODY_LIMIT`       | `body_limit`             | 1 MiB     |
//! | `SLEEPY_CORS_ENABLED`     | `cors.enabled`           | `false`   |
//! | `SLEEPY_CORS_ALLOW_ORIGIN`| `cors.allow_origin`      | `*`       |
//! | `SLEEPY_CORS_MAX_AGE`     | `cors.max_age_secs`      | unset     |
//! | `SLEEPY_ENV`              | `environment`            | development |

use crate::cors::CorsConfig;
use serde::Deserialize;
use std::fmt;

/// Default maximum request body size (1 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Error type for configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Envy(#[from] envy::Error),
}

/// Environment profile for the application, read from `SLEEPY_ENV`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Internal diagnostics are logged for client errors too
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Detect the current environment from `SLEEPY_ENV`.
    ///
    /// `production` or `prod` selects production; anything else, including
    /// an unset variable, is development.
    pub fn current() -> Self {
        Self::parse(std::env::var("SLEEPY_ENV").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("production") | Some("prod") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for an [`Api`](crate::Api)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Prepended to every resource prefix, e.g. `/v2`
    pub base_path: String,
    pub cors: CorsConfig,
    /// Maximum request body size in bytes
    pub body_limit: usize,
    pub environment: Environment,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            cors: CorsConfig::default(),
            body_limit: DEFAULT_BODY_LIMIT,
            environment: Environment::Development,
        }
    }
}

/// Flat view of the `SLEEPY_` variables, as envy sees them
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvVars {
    base_path: Option<String>,
    body_limit: Option<usize>,
    cors_enabled: Option<bool>,
    cors_allow_origin: Option<String>,
    cors_max_age: Option<u64>,
}

impl ApiConfig {
    /// Load from `.env` and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let vars: EnvVars = envy::prefixed("SLEEPY_").from_env()?;
        Ok(Self::from_vars(vars, Environment::current()))
    }

    /// Load from an explicit list of `(name, value)` pairs
    pub fn from_pairs<I>(iter: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let pairs: Vec<(String, String)> = iter.into_iter().collect();
        let environment = Environment::parse(
            pairs
                .iter()
                .find(|(k, _)| k == "SLEEPY_ENV")
                .map(|(_, v)| v.as_str()),
        );
        let vars: EnvVars = envy::prefixed("SLEEPY_").from_iter(pairs)?;
        Ok(Self::from_vars(vars, environment))
    }

    fn from_vars(vars: EnvVars, environment: Environment) -> Self {
        let defaults = Self::default();
        let mut cors = defaults.cors;
        if let Some(enabled) = vars.cors_enabled {
            cors.enabled = enabled;
        }
        if let Some(origin) = vars.cors_allow_origin {
            cors.allow_origin = origin;
        }
        if vars.cors_max_age.is_some() {
            cors.max_age_secs = vars.cors_max_age;
        }

        Self {
            base_path: vars.base_path.unwrap_or(defaults.base_path),
            cors,
            body_limit: vars.body_limit.unwrap_or(defaults.body_limit),
            environment,
        }
    }

    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn cors(mut self, cors: CorsConfig) -> Self {
        self.cors = cors;
        self
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.base_path, "");
        assert_eq!(config.body_limit, DEFAULT_BODY_LIMIT);
        assert!(!config.cors.enabled);
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn reads_prefixed_variables() {
        let config = ApiConfig::from_pairs(vars(&[
            ("SLEEPY_BASE_PATH", "/v2"),
            ("SLEEPY_BODY_LIMIT", "2048"),
            ("SLEEPY_CORS_ENABLED", "true"),
            ("SLEEPY_CORS_MAX_AGE", "600"),
            ("SLEEPY_ENV", "production"),
            ("UNRELATED", "ignored"),
        ]))
        .unwrap();

        assert_eq!(config.base_path, "/v2");
        assert_eq!(config.body_limit, 2048);
        assert!(config.cors.enabled);
        assert_eq!(config.cors.allow_origin, "*");
        assert_eq!(config.cors.max_age_secs, Some(600));
        assert!(config.environment.is_production());
    }

    #[test]
    fn bad_values_are_errors() {
        let err = ApiConfig::from_pairs(vars(&[("SLEEPY_BODY_LIMIT", "lots")])).unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn environment_parsing() {
        assert_eq!(Environment::parse(Some("prod")), Environment::Production);
        assert_eq!(Environment::parse(Some("staging")), Environment::Development);
        assert_eq!(Environment::parse(None), Environment::Development);
    }

    #[test]
    fn builder_setters() {
        let config = ApiConfig::default().base_path("/v2").body_limit(10);
        assert_eq!(config.base_path, "/v2");
        assert_eq!(config.body_limit, 10);
    }
}
