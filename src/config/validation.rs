//! Semantic validation of a parsed configuration.

use crate::config::schema::ProxyConfig;
use crate::load_balancer::backend::{AddressError, BackendAddress};
use crate::routing::ServiceClass;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address must not be empty")]
    EmptyBindAddress,
    #[error("service '{0}' has no backends")]
    EmptyPool(ServiceClass),
    #[error("service '{class}': {source}")]
    BadBackend { class: ServiceClass, source: AddressError },
    #[error("pipeline.{0} must be greater than zero")]
    ZeroPipelineSetting(&'static str),
}

/// Validate the configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::EmptyBindAddress);
    }

    for class in ServiceClass::ALL {
        match BackendAddress::parse_list(&config.services.get(class).backends) {
            Ok(list) if list.is_empty() => errors.push(ValidationError::EmptyPool(class)),
            Ok(_) => {}
            Err(source) => errors.push(ValidationError::BadBackend { class, source }),
        }
    }

    let pipeline = &config.pipeline;
    let zero_settings = [
        ("flush_interval_ms", pipeline.flush_interval_ms == 0),
        ("prune_interval_ms", pipeline.prune_interval_ms == 0),
        ("record_batch_size", pipeline.record_batch_size == 0),
        ("key_value_batch_size", pipeline.key_value_batch_size == 0),
    ];
    for (name, is_zero) in zero_settings {
        if is_zero {
            errors.push(ValidationError::ZeroPipelineSetting(name));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.services.novus.backends = " ; ".into();
        config.services.ui.backends = "ui:99999".into();
        config.pipeline.record_batch_size = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::EmptyPool(ServiceClass::Novus)));
        assert!(errors.contains(&ValidationError::ZeroPipelineSetting("record_batch_size")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::BadBackend { class: ServiceClass::Ui, .. })));
    }

    #[test]
    fn test_large_intervals_are_not_zero() {
        let mut config = ProxyConfig::default();
        config.pipeline.flush_interval_ms = 1 << 32;
        config.pipeline.prune_interval_ms = u64::MAX;
        assert!(validate_config(&config).is_ok());

        config.pipeline.prune_interval_ms = 0;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::ZeroPipelineSetting("prune_interval_ms")]
        );
    }
}
