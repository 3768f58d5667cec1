use std::{env, fmt, net::SocketAddr, str::FromStr};

use crate::{DEFAULT_BIND_ADDR, DEFAULT_DATABASE_URL};

const VAR_ENV: &str = "APP_ENV";
const VAR_BIND_ADDR: &str = "APP_BIND_ADDR";
const VAR_DATABASE_URL: &str = "DATABASE_URL";

/// Deployment flavour; selects the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    /// Canonical name used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            _ => Err(ConfigError::InvalidEnvironment(value.to_string())),
        }
    }
}

/// Settings for the employee service process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub database_url: String,
}

impl AppConfig {
    /// Reads `APP_ENV`, `APP_BIND_ADDR` and `DATABASE_URL` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Unset or blank variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let environment = match read(VAR_ENV) {
            Some(value) => value.parse()?,
            None => Environment::Development,
        };

        let bind_addr: SocketAddr = read(VAR_BIND_ADDR)
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .trim()
            .parse()
            .map_err(ConfigError::BindAddress)?;

        let database_url = read(VAR_DATABASE_URL)
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        Ok(Self {
            bind_addr,
            environment,
            database_url,
        })
    }
}

/// Reasons the configuration could not be resolved.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "{VAR_ENV} must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid {VAR_BIND_ADDR} value: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidEnvironment(_) => None,
            Self::BindAddress(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_development_on_port_5555() {
        let config = config_from(&[]).expect("defaults load");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.bind_addr.port(), 5555);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[
            (VAR_ENV, ""),
            (VAR_BIND_ADDR, "  "),
            (VAR_DATABASE_URL, " "),
        ])
        .expect("blank values load");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn reads_every_variable() {
        let config = config_from(&[
            (VAR_ENV, "prod"),
            (VAR_BIND_ADDR, "0.0.0.0:9000"),
            (VAR_DATABASE_URL, "sqlite:///var/lib/employees.db"),
        ])
        .expect("config loads");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.database_url, "sqlite:///var/lib/employees.db");
    }

    #[test]
    fn environment_names_are_case_insensitive() {
        assert_eq!("TEST".parse::<Environment>().unwrap(), Environment::Test);
        assert_eq!("Dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!(Environment::Production.as_str(), "production");
    }

    #[test]
    fn rejects_unknown_environment() {
        let err = config_from(&[(VAR_ENV, "staging")]).expect_err("unknown env");
        assert!(matches!(err, ConfigError::InvalidEnvironment(ref value) if value == "staging"));
        assert!(err.to_string().contains("got staging"));
    }

    #[test]
    fn rejects_invalid_bind_address() {
        let err = config_from(&[(VAR_BIND_ADDR, "not-an-address")]).expect_err("bad address");
        assert!(matches!(err, ConfigError::BindAddress(_)));
        assert!(err.to_string().starts_with("invalid APP_BIND_ADDR value"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn from_env_reads_process_environment() {
        env::set_var(VAR_DATABASE_URL, "sqlite://from-env.db");
        let config = AppConfig::from_env().expect("config loads");
        env::remove_var(VAR_DATABASE_URL);
        assert_eq!(config.database_url, "sqlite://from-env.db");
    }
}
