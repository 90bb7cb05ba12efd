//! Azure Cosmos DB (SQL API) provider
//!
//! Wraps the `azure_data_cosmos` client with key authorization. Lookups are
//! reads or parameterized queries; query feeds are drained until the SDK
//! runs out of continuation pages.

use crate::connection_string::CosmosAccount;
use crate::error::{Action, AzureError, Result, absent, classify};
use async_trait::async_trait;
use azure_data_cosmos::models::ContainerProperties;
use azure_data_cosmos::{CosmosClient, PartitionKey, Query};
use cloudseed_cloud::{
    CollectionInfo, CollectionSpec, DatabaseInfo, DatabaseSpec, DocumentService, Filter, QuerySpec,
    SqlQuery, document_id,
};
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

const SERVICE: &str = "Cosmos DB";
/// Alias queries are rendered with
const QUERY_ALIAS: &str = "f";

/// Document service backed by a Cosmos DB account
pub struct CosmosDocumentService {
    client: CosmosClient,
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    id: String,
    #[serde(rename = "partitionKey", default)]
    partition_key: Option<RawPartitionKey>,
}

#[derive(Debug, Deserialize)]
struct RawPartitionKey {
    #[serde(default)]
    paths: Vec<String>,
}

impl From<RawCollection> for CollectionInfo {
    fn from(raw: RawCollection) -> Self {
        let partition_key_path = raw
            .partition_key
            .and_then(|pk| pk.paths.into_iter().next())
            .unwrap_or_else(|| "/id".to_string());
        CollectionInfo {
            id: raw.id,
            partition_key_path,
        }
    }
}

fn collection_info(properties: &ContainerProperties) -> Result<CollectionInfo> {
    let raw: RawCollection = serde_json::from_value(serde_json::to_value(properties)?)?;
    Ok(raw.into())
}

fn database_resource(id: &str) -> String {
    format!("database {}", id)
}

fn collection_resource(database: &str, collection: &str) -> String {
    format!("collection {}/{}", database, collection)
}

fn cosmos_error<E>(action: Action, resource: String, status: Option<u16>, source: E) -> AzureError
where
    E: std::error::Error + Send + Sync + 'static,
{
    classify(SERVICE, action, resource, status, None, source)
}

/// Value at a partition key path such as `/address/city`
fn partition_key_value<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.trim_start_matches('/')
        .split('/')
        .try_fold(document, |value, segment| value.get(segment))
}

/// Partition key of a document; only string keys are supported
fn partition_key(document: &Value, path: &str) -> Result<PartitionKey> {
    match partition_key_value(document, path) {
        Some(Value::String(key)) => Ok(PartitionKey::from(key.clone())),
        Some(_) => Err(AzureError::InvalidDocument(format!(
            "partition key {} must be a string",
            path
        ))),
        None => Err(AzureError::InvalidDocument(format!(
            "document has no value at partition key {}",
            path
        ))),
    }
}

fn cosmos_query(sql: &SqlQuery) -> Result<Query> {
    sql.parameters
        .iter()
        .try_fold(Query::from(sql.query.clone()), |query, parameter| {
            query
                .with_parameter(parameter.name.clone(), &parameter.value)
                .map_err(|e| AzureError::InvalidQuery(format!("{}: {}", parameter.name, e)))
        })
}

fn by_id(id: &str) -> Result<Query> {
    Query::from("SELECT * FROM root r WHERE r.id = @id")
        .with_parameter("@id", id)
        .map_err(|e| AzureError::InvalidQuery(e.to_string()))
}

impl CosmosDocumentService {
    pub fn new(account: CosmosAccount) -> Result<Self> {
        let client = CosmosClient::with_key(account.endpoint.as_str(), account.key.into(), None)
            .map_err(|e| AzureError::InvalidKey(e.to_string()))?;
        debug!(endpoint = %account.endpoint, "Cosmos DB client configured");
        Ok(Self { client })
    }

    pub async fn get_database(&self, id: &str) -> Result<Option<DatabaseInfo>> {
        let read = self
            .client
            .database_client(id)
            .read(None)
            .await
            .map_err(|e| {
                let status = e.http_status().map(u16::from);
                cosmos_error(Action::Read, database_resource(id), status, e)
            });
        Ok(absent(read)?.map(|_| DatabaseInfo::new(id)))
    }

    pub async fn post_database(&self, spec: &DatabaseSpec) -> Result<DatabaseInfo> {
        self.client
            .create_database(&spec.id, None)
            .await
            .map_err(|e| {
                let status = e.http_status().map(u16::from);
                cosmos_error(Action::Create, database_resource(&spec.id), status, e)
            })?;

        info!(database = %spec.id, "Database created");
        Ok(DatabaseInfo::new(&spec.id))
    }

    pub async fn remove_database(&self, id: &str) -> Result<()> {
        self.client
            .database_client(id)
            .delete(None)
            .await
            .map_err(|e| {
                let status = e.http_status().map(u16::from);
                cosmos_error(Action::Modify, database_resource(id), status, e)
            })?;

        info!(database = id, "Database deleted");
        Ok(())
    }

    /// Missing database or collection both come back as `None`
    pub async fn get_collection(
        &self,
        database: &str,
        id: &str,
    ) -> Result<Option<CollectionInfo>> {
        let resource = collection_resource(database, id);
        let mut containers = self
            .client
            .database_client(database)
            .query_containers(by_id(id)?, None)
            .map_err(|e| {
                let status = e.http_status().map(u16::from);
                cosmos_error(Action::Read, resource.clone(), status, e)
            })?;
        let first = containers.try_next().await.map_err(|e| {
            let status = e.http_status().map(u16::from);
            cosmos_error(Action::Read, resource.clone(), status, e)
        });

        match absent(first)?.flatten() {
            Some(properties) => Ok(Some(collection_info(&properties)?)),
            None => Ok(None),
        }
    }

    pub async fn post_collection(
        &self,
        database: &str,
        spec: &CollectionSpec,
    ) -> Result<CollectionInfo> {
        let properties = ContainerProperties {
            id: spec.id.clone().into(),
            partition_key: spec.partition_key_path.clone().into(),
            ..Default::default()
        };
        self.client
            .database_client(database)
            .create_container(properties, None)
            .await
            .map_err(|e| {
                let status = e.http_status().map(u16::from);
                cosmos_error(
                    Action::Create,
                    collection_resource(database, &spec.id),
                    status,
                    e,
                )
            })?;

        info!(database, collection = %spec.id, "Collection created");
        Ok(CollectionInfo {
            id: spec.id.clone(),
            partition_key_path: spec.partition_key_path.clone(),
        })
    }

    pub async fn post_document(
        &self,
        database: &str,
        collection: &str,
        document: Value,
    ) -> Result<Value> {
        let coll = self
            .get_collection(database, collection)
            .await?
            .ok_or_else(|| AzureError::NotFound(collection_resource(database, collection)))?;
        let key = partition_key(&document, &coll.partition_key_path)?;
        let id = document
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default();

        self.client
            .database_client(database)
            .container_client(collection)
            .create_item(key, &document, None)
            .await
            .map_err(|e| {
                let status = e.http_status().map(u16::from);
                cosmos_error(
                    Action::Create,
                    format!("document {}/{}/{}", database, collection, id),
                    status,
                    e,
                )
            })?;

        info!(database, collection, id, "Document created");
        Ok(document)
    }

    /// Run a query across partitions and collect every row
    pub async fn query(
        &self,
        database: &str,
        collection: &str,
        query: &SqlQuery,
    ) -> Result<Vec<Value>> {
        let resource = collection_resource(database, collection);
        let rows = self
            .client
            .database_client(database)
            .container_client(collection)
            .query_items::<Value>(cosmos_query(query)?, PartitionKey::EMPTY, None)
            .map_err(|e| {
                let status = e.http_status().map(u16::from);
                cosmos_error(Action::Read, resource.clone(), status, e)
            })?;

        let documents: Vec<Value> = rows
            .map_err(|e| {
                let status = e.http_status().map(u16::from);
                cosmos_error(Action::Read, resource.clone(), status, e)
            })
            .try_collect()
            .await?;
        debug!(rows = documents.len(), "Query drained");
        Ok(documents)
    }
}

#[async_trait]
impl DocumentService for CosmosDocumentService {
    fn name(&self) -> &str {
        "azure"
    }

    async fn find_database(&self, id: &str) -> cloudseed_cloud::Result<Option<DatabaseInfo>> {
        Ok(self.get_database(id).await?)
    }

    async fn create_database(&self, spec: &DatabaseSpec) -> cloudseed_cloud::Result<DatabaseInfo> {
        Ok(self.post_database(spec).await?)
    }

    async fn delete_database(&self, id: &str) -> cloudseed_cloud::Result<()> {
        Ok(self.remove_database(id).await?)
    }

    async fn find_collection(
        &self,
        database: &str,
        id: &str,
    ) -> cloudseed_cloud::Result<Option<CollectionInfo>> {
        Ok(self.get_collection(database, id).await?)
    }

    async fn create_collection(
        &self,
        database: &str,
        spec: &CollectionSpec,
    ) -> cloudseed_cloud::Result<CollectionInfo> {
        Ok(self.post_collection(database, spec).await?)
    }

    async fn find_document(
        &self,
        database: &str,
        collection: &str,
        id: &str,
    ) -> cloudseed_cloud::Result<Option<Value>> {
        let query = QuerySpec::filtered(Filter::eq("id", id)).to_sql(QUERY_ALIAS);
        let rows = absent(self.query(database, collection, &query).await)?;
        Ok(rows.and_then(|rows| rows.into_iter().next()))
    }

    async fn create_document(
        &self,
        database: &str,
        collection: &str,
        document: Value,
    ) -> cloudseed_cloud::Result<Value> {
        document_id(&document)?;
        Ok(self.post_document(database, collection, document).await?)
    }

    async fn query_documents(
        &self,
        database: &str,
        collection: &str,
        query: &QuerySpec,
    ) -> cloudseed_cloud::Result<Vec<Value>> {
        let sql = query.to_sql(QUERY_ALIAS);
        debug!(query = %sql.query, "Rendered query");
        Ok(self.query(database, collection, &sql).await?)
    }
}
