//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build pools & store → Spawn flusher/pruner → Listen
//!
//! Shutdown (supervisor.rs):
//!     Signal received → Stop accepting → Drain connections
//!     → Stop pruner → Final queue flush → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Queued log records are flushed, not dropped, on shutdown

pub mod shutdown;
pub mod signals;
pub mod supervisor;

pub use shutdown::Shutdown;
