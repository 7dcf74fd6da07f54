//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend endpoint (`host:port`)
//! - Parse backend address lists from configuration
//! - Track active connections (for Least Connections LB)
//! - Release the connection count exactly once via an RAII guard

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Port used when an address omits one.
pub const DEFAULT_BACKEND_PORT: u16 = 80;

/// Error returned for a malformed backend address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("empty host in backend address '{0}'")]
    EmptyHost(String),
    #[error("invalid port in backend address '{0}'")]
    InvalidPort(String),
}

/// A parsed `host[:port]` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAddress {
    pub host: String,
    pub port: u16,
}

impl BackendAddress {
    /// Parse one `host[:port]` entry.
    pub fn parse(entry: &str) -> Result<Self, AddressError> {
        let entry = entry.trim();
        let (host, port) = match entry.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| AddressError::InvalidPort(entry.to_string()))?;
                (host.trim(), port)
            }
            None => (entry, DEFAULT_BACKEND_PORT),
        };

        if host.is_empty() {
            return Err(AddressError::EmptyHost(entry.to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Parse a list separated by `,` or `;`. Blank entries are skipped.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, AddressError> {
        list.split([',', ';'])
            .filter(|entry| !entry.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

impl fmt::Display for BackendAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// The address of the backend.
    pub address: BackendAddress,
    /// Pre-formatted `host:port` authority for outbound URIs.
    pub authority: String,
    /// Number of currently in-flight requests.
    pub active_connections: AtomicUsize,
}

impl Backend {
    /// Create a new backend.
    pub fn new(address: BackendAddress) -> Self {
        let authority = address.to_string();
        Self {
            address,
            authority,
            active_connections: AtomicUsize::new(0),
        }
    }

    /// Get the current number of active connections.
    pub fn connection_count(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Increment active connection count.
    pub fn inc_connections(&self) {
        let count = self.active_connections.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::record_backend_connections(&self.authority, count);
    }

    /// Decrement active connection count.
    pub fn dec_connections(&self) {
        // Saturate at zero; an unbalanced release must not wrap the counter.
        let prev = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| Some(c.saturating_sub(1)))
            .unwrap_or(0);
        metrics::record_backend_connections(&self.authority, prev.saturating_sub(1));
    }

    /// Reserve a connection slot, returning a guard that releases it on drop.
    pub fn acquire(self: &Arc<Self>) -> BackendConnectionGuard {
        self.inc_connections();
        BackendConnectionGuard {
            backend: self.clone(),
        }
    }
}

/// A RAII guard that manages the active connection count.
#[derive(Debug)]
pub struct BackendConnectionGuard {
    pub backend: Arc<Backend>,
}

impl Deref for BackendConnectionGuard {
    type Target = Backend;
    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for BackendConnectionGuard {
    fn drop(&mut self) {
        self.backend.dec_connections();
    }
}
