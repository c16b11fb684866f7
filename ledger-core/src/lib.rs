pub mod calculations;
pub mod db;
pub mod engine;
pub mod models;

pub use db::repository::{LedgerRepository, RepositoryError};
pub use engine::{EngineError, EventSink, NullSink, TaxEngine, TaxEvent};
pub use models::*;
