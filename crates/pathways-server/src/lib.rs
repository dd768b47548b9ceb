//! Pathways REST server
//!
//! Thin HTTP surface over the pathway core: pathway create/read/update/list
//! with association reconciliation, and the enrollment chart endpoint.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use router::build_router;
pub use state::AppState;
