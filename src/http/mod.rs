//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Client connection
//!     → server.rs (Axum setup, request ID, proxy handler)
//!     → [routing classifies the target]
//!     → [load balancer picks a backend]
//!     → request.rs (outbound request, x-forwarded-for)
//!     → capture.rs (tee both bodies for the audit log)
//!     → exchange.rs (record once both bodies have ended)
//!     → response.rs (failures mapped to client responses)
//!     → Stream back to client
//! ```

pub mod capture;
pub mod exchange;
pub mod request;
pub mod response;
pub mod server;

pub use response::ProxyError;
pub use server::HttpServer;
