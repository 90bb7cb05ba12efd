//! In-memory backends
//!
//! Process-local implementations of [`BlobService`] and [`DocumentService`].
//! They follow the same contracts as the remote providers (absent lookups
//! are `None`, duplicate creates are `AlreadyExists`) and are what the
//! walkthroughs run against with `--backend memory` and in tests.

use crate::blob::{BlobInfo, BlobService, ContainerAccess, ContainerInfo, validate_container_name};
use crate::document::{
    CollectionInfo, CollectionSpec, DatabaseInfo, DatabaseSpec, DocumentService, document_id,
};
use crate::error::{CloudError, Result};
use crate::query::QuerySpec;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock cannot leave these maps half-updated
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct MemoryContainer {
    access: ContainerAccess,
    blobs: HashMap<String, Vec<u8>>,
}

/// In-memory blob storage
#[derive(Debug, Default)]
pub struct MemoryBlobService {
    containers: Mutex<HashMap<String, MemoryContainer>>,
}

impl MemoryBlobService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container_count(&self) -> usize {
        lock(&self.containers).len()
    }
}

#[async_trait]
impl BlobService for MemoryBlobService {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find_container(&self, name: &str) -> Result<Option<ContainerInfo>> {
        validate_container_name(name)?;
        Ok(lock(&self.containers).get(name).map(|c| ContainerInfo {
            name: name.to_string(),
            access: c.access,
            etag: None,
        }))
    }

    async fn create_container(&self, name: &str) -> Result<ContainerInfo> {
        validate_container_name(name)?;
        let mut containers = lock(&self.containers);
        if containers.contains_key(name) {
            return Err(CloudError::AlreadyExists(format!("container {}", name)));
        }
        containers.insert(name.to_string(), MemoryContainer::default());
        tracing::info!("Created container: {}", name);
        Ok(ContainerInfo::new(name))
    }

    async fn set_container_access(&self, name: &str, access: ContainerAccess) -> Result<()> {
        validate_container_name(name)?;
        let mut containers = lock(&self.containers);
        let container = containers
            .get_mut(name)
            .ok_or_else(|| CloudError::NotFound(format!("container {}", name)))?;
        container.access = access;
        Ok(())
    }

    async fn delete_container(&self, name: &str) -> Result<()> {
        validate_container_name(name)?;
        lock(&self.containers)
            .remove(name)
            .map(|_| tracing::info!("Deleted container: {}", name))
            .ok_or_else(|| CloudError::NotFound(format!("container {}", name)))
    }

    async fn upload_blob(&self, container: &str, blob: &str, data: Vec<u8>) -> Result<BlobInfo> {
        validate_container_name(container)?;
        let mut containers = lock(&self.containers);
        let target = containers
            .get_mut(container)
            .ok_or_else(|| CloudError::NotFound(format!("container {}", container)))?;
        let size = data.len() as u64;
        target.blobs.insert(blob.to_string(), data);
        tracing::debug!("Stored blob {}/{} ({} bytes)", container, blob, size);
        Ok(BlobInfo {
            container: container.to_string(),
            name: blob.to_string(),
            size,
        })
    }

    async fn download_blob(&self, container: &str, blob: &str) -> Result<Vec<u8>> {
        validate_container_name(container)?;
        let containers = lock(&self.containers);
        containers
            .get(container)
            .ok_or_else(|| CloudError::NotFound(format!("container {}", container)))?
            .blobs
            .get(blob)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(format!("blob {}/{}", container, blob)))
    }
}

#[derive(Debug)]
struct MemoryCollection {
    partition_key_path: String,
    // Ordered by id so query results are deterministic
    documents: BTreeMap<String, Value>,
}

#[derive(Debug, Default)]
struct MemoryDatabase {
    collections: HashMap<String, MemoryCollection>,
}

/// In-memory document database
#[derive(Debug, Default)]
pub struct MemoryDocumentService {
    databases: Mutex<HashMap<String, MemoryDatabase>>,
}

impl MemoryDocumentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection, `None` if it does not exist
    pub fn document_count(&self, database: &str, collection: &str) -> Option<usize> {
        lock(&self.databases)
            .get(database)?
            .collections
            .get(collection)
            .map(|c| c.documents.len())
    }
}

#[async_trait]
impl DocumentService for MemoryDocumentService {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find_database(&self, id: &str) -> Result<Option<DatabaseInfo>> {
        Ok(lock(&self.databases)
            .contains_key(id)
            .then(|| DatabaseInfo::new(id)))
    }

    async fn create_database(&self, spec: &DatabaseSpec) -> Result<DatabaseInfo> {
        let mut databases = lock(&self.databases);
        if databases.contains_key(&spec.id) {
            return Err(CloudError::AlreadyExists(format!("database {}", spec.id)));
        }
        databases.insert(spec.id.clone(), MemoryDatabase::default());
        tracing::info!("Created database: {}", spec.id);
        Ok(DatabaseInfo::new(&spec.id))
    }

    async fn delete_database(&self, id: &str) -> Result<()> {
        lock(&self.databases)
            .remove(id)
            .map(|_| tracing::info!("Deleted database: {}", id))
            .ok_or_else(|| CloudError::NotFound(format!("database {}", id)))
    }

    async fn find_collection(&self, database: &str, id: &str) -> Result<Option<CollectionInfo>> {
        Ok(lock(&self.databases)
            .get(database)
            .and_then(|db| db.collections.get(id))
            .map(|c| CollectionInfo {
                id: id.to_string(),
                partition_key_path: c.partition_key_path.clone(),
            }))
    }

    async fn create_collection(
        &self,
        database: &str,
        spec: &CollectionSpec,
    ) -> Result<CollectionInfo> {
        let mut databases = lock(&self.databases);
        let db = databases
            .get_mut(database)
            .ok_or_else(|| CloudError::NotFound(format!("database {}", database)))?;
        if db.collections.contains_key(&spec.id) {
            return Err(CloudError::AlreadyExists(format!(
                "collection {}/{}",
                database, spec.id
            )));
        }
        db.collections.insert(
            spec.id.clone(),
            MemoryCollection {
                partition_key_path: spec.partition_key_path.clone(),
                documents: BTreeMap::new(),
            },
        );
        tracing::info!("Created collection: {}/{}", database, spec.id);
        Ok(CollectionInfo {
            id: spec.id.clone(),
            partition_key_path: spec.partition_key_path.clone(),
        })
    }

    async fn find_document(
        &self,
        database: &str,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>> {
        Ok(lock(&self.databases)
            .get(database)
            .and_then(|db| db.collections.get(collection))
            .and_then(|c| c.documents.get(id))
            .cloned())
    }

    async fn create_document(
        &self,
        database: &str,
        collection: &str,
        document: Value,
    ) -> Result<Value> {
        let id = document_id(&document)?.to_string();
        let mut databases = lock(&self.databases);
        let target = databases
            .get_mut(database)
            .and_then(|db| db.collections.get_mut(collection))
            .ok_or_else(|| {
                CloudError::NotFound(format!("collection {}/{}", database, collection))
            })?;
        if target.documents.contains_key(&id) {
            return Err(CloudError::AlreadyExists(format!("document {}", id)));
        }
        target.documents.insert(id.clone(), document.clone());
        tracing::info!("Created document: {}/{}/{}", database, collection, id);
        Ok(document)
    }

    async fn query_documents(
        &self,
        database: &str,
        collection: &str,
        query: &QuerySpec,
    ) -> Result<Vec<Value>> {
        let databases = lock(&self.databases);
        let target = databases
            .get(database)
            .and_then(|db| db.collections.get(collection))
            .ok_or_else(|| {
                CloudError::NotFound(format!("collection {}/{}", database, collection))
            })?;
        Ok(query.evaluate(target.documents.values()))
    }
}
