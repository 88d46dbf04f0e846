//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{CatalogService, PersistenceService};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::infrastructure::traits::{
    CategorySource, ComboStore, FileComboStore, JsonCatalogSource,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Category subsystem boundary
    pub source: Arc<dyn CategorySource>,

    /// Combo persistence boundary
    pub store: Arc<dyn ComboStore>,

    pub catalog: CatalogService,
    pub persistence: PersistenceService,
}

impl ServiceContainer {
    /// Create a new service container with file-backed implementations.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        let source = JsonCatalogSource::load(&settings.catalog_path).map_err(|e| {
            ApplicationError::SourceUnavailable {
                context: format!("load catalog {}", settings.catalog_path.display()),
                source: Box::new(e),
            }
        })?;
        let store = FileComboStore::new(&settings.store_dir);
        Ok(Self::with_deps(settings, Arc::new(source), Arc::new(store)))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        source: Arc<dyn CategorySource>,
        store: Arc<dyn ComboStore>,
    ) -> Self {
        let settings = Arc::new(settings);
        let catalog = CatalogService::new(source.clone());
        let persistence = PersistenceService::new(store.clone());

        Self {
            settings,
            source,
            store,
            catalog,
            persistence,
        }
    }
}
