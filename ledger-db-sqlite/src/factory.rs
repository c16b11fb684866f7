use async_trait::async_trait;

use ledger_core::db::repository::{LedgerRepository, RepositoryError};
use ledger_core::db::{DbConfig, RepositoryFactory};

use crate::repository::SqliteRepository;

/// [`RepositoryFactory`] for SQLite.
///
/// Register this with a [`ledger_core::db::RepositoryRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use ledger_core::db::RepositoryRegistry;
/// use ledger_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string` and bring
    /// its schema up to date.
    ///
    /// Accepted connection-string values:
    /// * A sqlx-style URL — e.g. `"sqlite:ledger.db?mode=rwc"`.
    /// * `"sqlite::memory:"` — an ephemeral in-memory database (tests).
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn LedgerRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string).await?;
        repo.run_migrations().await?;
        Ok(Box::new(repo))
    }
}
