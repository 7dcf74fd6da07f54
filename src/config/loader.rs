//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::routing::ServiceClass;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid environment variable {name}: '{value}'")]
    Env { name: String, value: String },
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: file (if any), then environment overrides, then
/// validation.
pub fn load(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply the deployment environment variables on top of `config`.
///
/// `HOST`/`PORT` form the bind address, `<CLASS>_HOST` replaces a backend
/// list, `<CLASS>_LOG_RETENTION` (falling back to `LOG_RETENTION`) sets
/// retention, and `POSTGRES_*` configure the store.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("HOST");
    let port = lookup("PORT");
    if host.is_some() || port.is_some() {
        let (default_host, default_port) = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(h, p)| (h.to_string(), p.to_string()))
            .unwrap_or_else(|| (config.listener.bind_address.clone(), "80".to_string()));
        let port = match port {
            Some(p) => parse_env::<u16>("PORT", &p)?.to_string(),
            None => default_port,
        };
        config.listener.bind_address = format!("{}:{}", host.unwrap_or(default_host), port);
    }

    let shared_retention = lookup("LOG_RETENTION");
    for class in ServiceClass::ALL {
        let prefix = class.env_prefix();
        let service = config.services.get_mut(class);

        if let Some(backends) = lookup(&format!("{prefix}_HOST")) {
            service.backends = backends;
        }

        let name = format!("{prefix}_LOG_RETENTION");
        if let Some(value) = lookup(&name) {
            service.retention_hours = parse_env(&name, &value)?;
        } else if let Some(value) = &shared_retention {
            service.retention_hours = parse_env("LOG_RETENTION", value)?;
        }
    }

    if let Some(value) = lookup("REQUEST_LOG_LIMIT") {
        config.log_limits.request_log_limit = parse_env("REQUEST_LOG_LIMIT", &value)?;
    }
    if let Some(value) = lookup("RESPONSE_LOG_LIMIT") {
        config.log_limits.response_log_limit = parse_env("RESPONSE_LOG_LIMIT", &value)?;
    }

    let store = &mut config.store;
    if let Some(value) = lookup("POSTGRES_HOST") {
        store.host = value;
    }
    if let Some(value) = lookup("POSTGRES_PORT") {
        store.port = parse_env("POSTGRES_PORT", &value)?;
    }
    if let Some(value) = lookup("POSTGRES_USER") {
        store.user = value;
    }
    if let Some(value) = lookup("POSTGRES_PASSWORD") {
        store.password = value;
    }
    if let Some(value) = lookup("POSTGRES_DB") {
        store.database = value;
    }

    Ok(())
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        name: name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ProxyConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("HOST", "0.0.0.0"),
                ("PORT", "8000"),
                ("API_HOST", "api-1:8080,api-2:8080"),
                ("LOG_RETENTION", "24"),
                ("GPRS_LOG_RETENTION", "0"),
                ("POSTGRES_DB", "audit"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8000");
        assert_eq!(config.services.api.backends, "api-1:8080,api-2:8080");
        assert_eq!(config.services.ui.retention_hours, 24);
        assert_eq!(config.services.gprs.retention_hours, 0);
        assert_eq!(config.store.database, "audit");
    }

    #[test]
    fn test_port_only_keeps_host() {
        let mut config = ProxyConfig::default();
        apply_env_overrides(&mut config, env(&[("PORT", "8081")])).unwrap();
        assert_eq!(config.listener.bind_address, "localhost:8081");
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = ProxyConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("UI_LOG_RETENTION", "a week")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { ref name, .. } if name == "UI_LOG_RETENTION"));
    }
}
