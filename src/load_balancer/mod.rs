//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request classified → ServiceClass identified
//!     → pool.rs (backends for the class)
//!     → least_conn.rs (pick backend with fewest in-flight requests)
//!     → backend.rs (guard increments now, decrements on drop)
//!     → Guard travels with the response stream until it ends
//! ```
//!
//! # Design Decisions
//! - Load balancer is stateless; backends track their own counters
//! - Counters are decremented by RAII, so every exit path releases once
//! - Empty pools are rejected at startup, never at request time

use std::sync::Arc;

pub mod backend;
pub mod least_conn;
pub mod pool;

pub use backend::{Backend, BackendAddress, BackendConnectionGuard};
pub use pool::{BackendPools, PoolError};

/// Backend selection strategy.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Pick a backend from `backends`, or `None` if the slice is empty.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}
