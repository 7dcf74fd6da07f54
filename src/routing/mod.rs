//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path + query)
//!     → router.rs (ordered rule scan)
//!     → matcher.rs (evaluate prefix / exact conditions)
//!     → Return: ServiceClass (never a no-match)
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - No regex in hot path (prefix and equality only)
//! - Deterministic: same input always maps to the same class
//! - First match wins; `ui` is the catch-all

pub mod matcher;
pub mod router;
pub mod service_class;

pub use router::{Classifier, RoutingRule};
pub use service_class::ServiceClass;
