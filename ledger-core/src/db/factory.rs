use std::collections::HashMap;

use async_trait::async_trait;

use super::repository::{LedgerRepository, RepositoryError};

/// Where the ledger lives.
///
/// `backend` selects a registered [`RepositoryFactory`] by name and
/// `connection_string` is handed to that factory as-is. For the SQLite
/// backend the connection string is a sqlx URL, e.g.
/// `sqlite:ledger.db?mode=rwc` or `sqlite::memory:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl DbConfig {
    pub fn new(
        backend: impl Into<String>,
        connection_string: impl Into<String>,
    ) -> Self {
        Self {
            backend: backend.into(),
            connection_string: connection_string.into(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::new("sqlite", "sqlite::memory:")
    }
}

/// Opens repositories for one storage backend.
///
/// Each backend crate exports a unit struct implementing this trait. The
/// host registers every backend it was built with and then resolves a
/// [`DbConfig`] through the [`RepositoryRegistry`], which keeps backend
/// selection a deployment concern rather than a compile-time one.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Lowercase name this factory answers to, unique per registry.
    fn backend_name(&self) -> &'static str;

    /// Connect, bring the schema up to date if the backend has one, and hand
    /// back a ready repository.
    async fn create(&self, config: &DbConfig)
    -> Result<Box<dyn LedgerRepository>, RepositoryError>;
}

/// Maps backend names to their factories.
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under its own [`RepositoryFactory::backend_name`].
    /// A factory already registered under that name is replaced.
    pub fn register(&mut self, factory: Box<dyn RepositoryFactory>) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Every registered backend name, sorted.
    pub fn backend_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens a repository for `config`, dispatching on `config.backend`.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Configuration`] when no factory is registered
    /// under that name; otherwise whatever the chosen factory returns.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn LedgerRepository>, RepositoryError> {
        let factory = self.factories.get(config.backend.as_str()).ok_or_else(|| {
            RepositoryError::Configuration(format!(
                "no repository backend registered under '{}' (registered: {})",
                config.backend,
                self.backend_names().join(", ")
            ))
        })?;

        factory.create(config).await
    }
}
