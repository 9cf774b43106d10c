use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// An `(id, name)` pair offered as a choice on the discount edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
}

impl CatalogEntry {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn list_all(&self) -> Result<Vec<CatalogEntry>, ServiceError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<CatalogEntry>, ServiceError>;
}

#[async_trait]
pub trait ProductTypeCatalog: Send + Sync {
    async fn list_all(&self) -> Result<Vec<CatalogEntry>, ServiceError>;
}

#[async_trait]
pub trait UserGroupCatalog: Send + Sync {
    async fn list_all(&self) -> Result<Vec<CatalogEntry>, ServiceError>;
}

/// Fixed list of entries, usable as any of the catalogs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: Vec<CatalogEntry>,
}

impl InMemoryCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn list_all(&self) -> Result<Vec<CatalogEntry>, ServiceError> {
        Ok(self.entries.clone())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<CatalogEntry>, ServiceError> {
        Ok(self.entries.iter().find(|entry| entry.id == id).cloned())
    }
}

#[async_trait]
impl ProductTypeCatalog for InMemoryCatalog {
    async fn list_all(&self) -> Result<Vec<CatalogEntry>, ServiceError> {
        Ok(self.entries.clone())
    }
}

#[async_trait]
impl UserGroupCatalog for InMemoryCatalog {
    async fn list_all(&self) -> Result<Vec<CatalogEntry>, ServiceError> {
        Ok(self.entries.clone())
    }
}
