//! SQLite persistence for the ledger.
//!
//! The schema keeps every monetary column as fixed-point TEXT so amounts
//! round-trip exactly; see [`decimal`] for the conversion helpers.

pub mod decimal;
mod factory;
mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::SqliteRepository;
