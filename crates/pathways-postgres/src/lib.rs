//! PostgreSQL adapter for the pathway core.
//!
//! - [`PgPathwayStore`] implements `PathwayStore`
//! - [`PgEnrollmentLookup`] implements `EnrollmentStatusLookup`
//! - [`DatabaseManager`] owns the pool and applies `migrations/`

pub mod database;
mod rows;
pub mod store;

pub use database::{mask_database_url, DatabaseConfig, DatabaseManager};
pub use store::{PgEnrollmentLookup, PgPathwayStore};
