//! Backend pool registry.
//!
//! # Responsibilities
//! - Hold one backend list per service class
//! - Apply the least-connections algorithm to select backends
//! - Hand out connection guards for tracking

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ServicesConfig;
use crate::load_balancer::{
    LoadBalancer,
    backend::{AddressError, Backend, BackendAddress, BackendConnectionGuard},
    least_conn::LeastConnections,
};
use crate::routing::ServiceClass;

/// Error building the pool registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("no backends configured for service '{0}'")]
    Empty(ServiceClass),
    #[error("service '{class}': {source}")]
    Address {
        class: ServiceClass,
        #[source]
        source: AddressError,
    },
}

/// Per-class backend pools.
#[derive(Debug)]
pub struct BackendPools {
    pools: HashMap<ServiceClass, Vec<Arc<Backend>>>,
    balancer: Box<dyn LoadBalancer>,
}

impl BackendPools {
    /// Build pools from explicit address lists. Every class must be present
    /// with at least one address.
    pub fn new(addresses: HashMap<ServiceClass, Vec<BackendAddress>>) -> Result<Self, PoolError> {
        let mut pools = HashMap::new();
        for class in ServiceClass::ALL {
            let backends: Vec<Arc<Backend>> = addresses
                .get(&class)
                .map(|list| list.iter().cloned().map(|a| Arc::new(Backend::new(a))).collect())
                .unwrap_or_default();

            if backends.is_empty() {
                return Err(PoolError::Empty(class));
            }
            pools.insert(class, backends);
        }

        Ok(Self {
            pools,
            balancer: Box::new(LeastConnections::new()),
        })
    }

    /// Build pools from the `services` section of the configuration.
    pub fn from_config(services: &ServicesConfig) -> Result<Self, PoolError> {
        let mut addresses = HashMap::new();
        for class in ServiceClass::ALL {
            let list = BackendAddress::parse_list(&services.get(class).backends)
                .map_err(|source| PoolError::Address { class, source })?;
            addresses.insert(class, list);
        }
        Self::new(addresses)
    }

    /// Select the least-loaded backend for `class` and reserve a slot on it.
    ///
    /// Selection and increment happen back to back on the caller's task.
    /// Two concurrent callers may still observe the same minimum; the
    /// reservation is best-effort, not a strict atomic claim.
    pub fn acquire(&self, class: ServiceClass) -> Option<BackendConnectionGuard> {
        let backends = self.pools.get(&class)?;
        match self.balancer.next_server(backends) {
            Some(backend) => Some(backend.acquire()),
            None => {
                tracing::debug!(service = %class, "No backends in pool");
                None
            }
        }
    }

    /// Backends configured for `class`, in configuration order.
    pub fn backends(&self, class: ServiceClass) -> &[Arc<Backend>] {
        self.pools.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }
}
