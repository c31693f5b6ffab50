use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use super::{stores::StoreIdentifier, CatalogSnapshot, CatalogStore, Error};
use crate::catalog::{
    ArchitectureClass, Catalog, CompatibilityRecord, DeviceArchitecture, Engine, EngineVersion,
    ModelInfo, ParserRule, RuleType,
};

/// A snapshot over a fully parsed catalog. Every store ends up serving one of
/// these; they differ only in where the catalog comes from.
#[derive(Debug, Clone)]
pub(crate) struct LoadedSnapshot {
    catalog: Arc<Catalog>,
}

impl LoadedSnapshot {
    pub(crate) fn new(catalog: Arc<Catalog>) -> LoadedSnapshot {
        LoadedSnapshot { catalog }
    }
}

#[async_trait]
impl CatalogSnapshot for LoadedSnapshot {
    async fn engine_by_name(&self, name: &str) -> Result<Option<Engine>, Error> {
        Ok(self.catalog.engine_by_name(name).cloned())
    }

    async fn engines(&self) -> Result<Vec<Engine>, Error> {
        Ok(self.catalog.engines().cloned().collect())
    }

    async fn engine_versions(
        &self,
        engine_id: Uuid,
        device_architecture: DeviceArchitecture,
        version: Option<&str>,
    ) -> Result<Vec<EngineVersion>, Error> {
        Ok(self
            .catalog
            .engine_versions(engine_id, device_architecture, version)
            .cloned()
            .collect())
    }

    async fn compatibility_record(
        &self,
        engine_version_id: Uuid,
    ) -> Result<Option<CompatibilityRecord>, Error> {
        Ok(self.catalog.compatibility_record(engine_version_id).cloned())
    }

    async fn parser_rules(
        &self,
        engine_id: Uuid,
        rule_type: RuleType,
    ) -> Result<Vec<ParserRule>, Error> {
        Ok(self
            .catalog
            .parser_rules(engine_id, rule_type)
            .cloned()
            .collect())
    }

    async fn model_info_by_uri(&self, uri: &str) -> Result<Option<ModelInfo>, Error> {
        Ok(self.catalog.model_info_by_uri(uri).cloned())
    }

    async fn architecture_class_by_name(
        &self,
        class_name: &str,
    ) -> Result<Option<ArchitectureClass>, Error> {
        Ok(self.catalog.architecture_class_by_name(class_name).cloned())
    }

    async fn architecture_classes(&self) -> Result<Vec<ArchitectureClass>, Error> {
        Ok(self
            .catalog
            .architecture_classes()
            .into_iter()
            .cloned()
            .collect())
    }

    async fn models(&self) -> Result<Vec<ModelInfo>, Error> {
        Ok(self.catalog.models().into_iter().cloned().collect())
    }
}

/// Holds a catalog in memory. Writers replace the whole catalog; readers keep
/// whichever version they began with.
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    catalog: RwLock<Arc<Catalog>>,
}

impl MemoryStore {
    pub(crate) fn new(catalog: Catalog) -> MemoryStore {
        MemoryStore {
            catalog: RwLock::new(Arc::new(catalog)),
        }
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Swap in a new catalog. Snapshots opened earlier are unaffected.
    pub(crate) fn replace(&self, catalog: Catalog) {
        let mut current = self.catalog.write().unwrap_or_else(PoisonError::into_inner);

        *current = Arc::new(catalog);
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    fn id(&self) -> StoreIdentifier {
        StoreIdentifier::Memory
    }

    async fn begin(&self) -> Result<Box<dyn CatalogSnapshot>, Error> {
        let catalog = self
            .catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Ok(Box::new(LoadedSnapshot::new(catalog)))
    }
}
