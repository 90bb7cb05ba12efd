//! Document database trait definition

use crate::error::{CloudError, Result};
use crate::query::{Doc, Filter, Projection, QuerySpec};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document database abstraction
///
/// Three-level hierarchy: database, collection, document. Documents are JSON
/// objects identified by a string `id` unique within their collection.
/// Looking up anything under a database or collection that no longer exists
/// returns `None`.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Returns the backend name (e.g., "memory", "azure")
    fn name(&self) -> &str;

    async fn find_database(&self, id: &str) -> Result<Option<DatabaseInfo>>;

    async fn create_database(&self, spec: &DatabaseSpec) -> Result<DatabaseInfo>;

    /// Delete a database with all of its collections and documents
    async fn delete_database(&self, id: &str) -> Result<()>;

    async fn find_collection(&self, database: &str, id: &str) -> Result<Option<CollectionInfo>>;

    async fn create_collection(&self, database: &str, spec: &CollectionSpec)
    -> Result<CollectionInfo>;

    async fn find_document(
        &self,
        database: &str,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>>;

    /// Insert a document; fails with `AlreadyExists` on a duplicate id
    async fn create_document(&self, database: &str, collection: &str, document: Value)
    -> Result<Value>;

    /// Run a read query over one collection
    ///
    /// Every query form ends up here, so they cannot disagree on results.
    async fn query_documents(
        &self,
        database: &str,
        collection: &str,
        query: &QuerySpec,
    ) -> Result<Vec<Value>>;
}

/// Database to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSpec {
    pub id: String,
}

impl DatabaseSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Existing database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub id: String,
    #[serde(rename = "_rid", default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
    #[serde(rename = "_etag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl DatabaseInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rid: None,
            etag: None,
        }
    }
}

/// Collection to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub id: String,
    /// Path of the property documents are partitioned on
    pub partition_key_path: String,
}

impl CollectionSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            partition_key_path: "/id".to_string(),
        }
    }
}

/// Existing collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    pub partition_key_path: String,
}

/// Check that `document` is an object with a non-empty string `id` and return it
pub fn document_id(document: &Value) -> Result<&str> {
    if !document.is_object() {
        return Err(CloudError::InvalidDocument(
            "document must be a JSON object".to_string(),
        ));
    }
    match document.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id),
        Some(_) => Err(CloudError::InvalidDocument(
            "document 'id' must be a non-empty string".to_string(),
        )),
        None => Err(CloudError::InvalidDocument(
            "document has no 'id' property".to_string(),
        )),
    }
}

/// Handle to one collection, threaded through the steps that use it
///
/// Carries the service and the database/collection ids so callers never
/// rebuild resource paths by hand. The three query entry points differ only
/// in how the [`QuerySpec`] is built.
#[derive(Clone, Copy)]
pub struct Collection<'a> {
    service: &'a dyn DocumentService,
    database: &'a str,
    id: &'a str,
}

impl<'a> Collection<'a> {
    pub fn new(service: &'a dyn DocumentService, database: &'a str, id: &'a str) -> Self {
        Self {
            service,
            database,
            id,
        }
    }

    pub fn database(&self) -> &str {
        self.database
    }

    pub fn id(&self) -> &str {
        self.id
    }

    pub async fn find<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        match self.service.find_document(self.database, self.id, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn insert<T: Serialize + DeserializeOwned>(&self, document: &T) -> Result<T> {
        let value = serde_json::to_value(document)?;
        let created = self
            .service
            .create_document(self.database, self.id, value)
            .await?;
        Ok(serde_json::from_value(created)?)
    }

    /// Query with a query-language string
    pub async fn query_sql<T: DeserializeOwned>(&self, query: &str) -> Result<Vec<T>> {
        self.run(&QuerySpec::parse_sql(query)?).await
    }

    /// Query with a declarative filter, returning whole documents
    pub async fn query_filter<T: DeserializeOwned>(&self, filter: Filter) -> Result<Vec<T>> {
        self.run(&QuerySpec::filtered(filter)).await
    }

    /// Query with a filter closure and a projection closure
    pub async fn query_fn<T, F, P>(&self, filter: F, select: P) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: FnOnce(&Doc) -> Filter,
        P: FnOnce(&Doc) -> Projection,
    {
        self.run(&QuerySpec::new().filter_by(filter).select_with(select))
            .await
    }

    async fn run<T: DeserializeOwned>(&self, query: &QuerySpec) -> Result<Vec<T>> {
        let rows = self
            .service
            .query_documents(self.database, self.id, query)
            .await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(CloudError::from))
            .collect()
    }
}
