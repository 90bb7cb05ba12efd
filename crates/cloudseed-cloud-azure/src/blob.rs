//! Azure Blob Storage provider
//!
//! Wraps the `azure_storage_blobs` service client with Shared Key
//! credentials from a storage connection string. Works against a real
//! account or a local Azurite emulator.

use crate::connection_string::StorageAccount;
use crate::error::{Action, AzureError, Result, absent, classify};
use async_trait::async_trait;
use azure_core::error::ErrorKind;
use azure_storage::{CloudLocation, StorageCredentials};
use azure_storage_blobs::container::PublicAccess;
use azure_storage_blobs::prelude::{BlobServiceClient, ClientBuilder};
use cloudseed_cloud::{
    BlobInfo, BlobService, ContainerAccess, ContainerInfo, validate_container_name,
};
use tracing::{debug, info};

const SERVICE: &str = "Blob Storage";

/// Blob service backed by an Azure storage account
pub struct AzureBlobService {
    client: BlobServiceClient,
}

impl AzureBlobService {
    pub fn new(account: StorageAccount) -> Self {
        let credentials = StorageCredentials::access_key(account.name.clone(), account.key);
        let location = CloudLocation::Custom {
            account: account.name,
            uri: account.blob_endpoint.as_str().trim_end_matches('/').to_string(),
        };
        debug!(endpoint = %account.blob_endpoint, "Blob Storage client configured");
        Self {
            client: ClientBuilder::with_location(location, credentials).blob_service_client(),
        }
    }

    /// Create from a storage connection string
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        Ok(Self::new(StorageAccount::parse(connection_string)?))
    }

    pub async fn get_container_properties(&self, name: &str) -> Result<Option<ContainerInfo>> {
        let properties = self
            .client
            .container_client(name)
            .get_properties()
            .await
            .map_err(blob_error(Action::Read, container_resource(name)));

        Ok(absent(properties)?.map(|response| ContainerInfo {
            name: name.to_string(),
            access: container_access(response.container.public_access),
            etag: Some(response.container.e_tag),
        }))
    }

    pub async fn put_container(&self, name: &str) -> Result<ContainerInfo> {
        self.client
            .container_client(name)
            .create()
            .await
            .map_err(blob_error(Action::Create, container_resource(name)))?;

        info!(container = name, "Container created");
        Ok(ContainerInfo::new(name))
    }

    pub async fn put_container_acl(&self, name: &str, access: ContainerAccess) -> Result<()> {
        self.client
            .container_client(name)
            .set_acl(public_access(access))
            .await
            .map_err(blob_error(Action::Modify, container_resource(name)))?;

        info!(container = name, %access, "Container access level set");
        Ok(())
    }

    pub async fn remove_container(&self, name: &str) -> Result<()> {
        self.client
            .container_client(name)
            .delete()
            .await
            .map_err(blob_error(Action::Modify, container_resource(name)))?;

        info!(container = name, "Container deleted");
        Ok(())
    }

    pub async fn put_block_blob(
        &self,
        container: &str,
        blob: &str,
        data: Vec<u8>,
    ) -> Result<BlobInfo> {
        let size = data.len() as u64;
        let mut upload = self
            .client
            .container_client(container)
            .blob_client(blob)
            .put_block_blob(data);
        if let Some(content_type) = content_type_for(blob) {
            upload = upload.content_type(content_type);
        }
        // 404 here means the container is missing
        upload
            .await
            .map_err(blob_error(Action::Modify, container_resource(container)))?;

        info!(container, blob, size, "Blob uploaded");
        Ok(BlobInfo {
            container: container.to_string(),
            name: blob.to_string(),
            size,
        })
    }

    pub async fn get_blob(&self, container: &str, blob: &str) -> Result<Vec<u8>> {
        let data = self
            .client
            .container_client(container)
            .blob_client(blob)
            .get_content()
            .await
            .map_err(blob_error(
                Action::Read,
                format!("blob {}/{}", container, blob),
            ))?;

        info!(container, blob, size = data.len(), "Blob downloaded");
        Ok(data)
    }
}

#[async_trait]
impl BlobService for AzureBlobService {
    fn name(&self) -> &str {
        "azure"
    }

    async fn find_container(&self, name: &str) -> cloudseed_cloud::Result<Option<ContainerInfo>> {
        validate_container_name(name)?;
        Ok(self.get_container_properties(name).await?)
    }

    async fn create_container(&self, name: &str) -> cloudseed_cloud::Result<ContainerInfo> {
        validate_container_name(name)?;
        Ok(self.put_container(name).await?)
    }

    async fn set_container_access(
        &self,
        name: &str,
        access: ContainerAccess,
    ) -> cloudseed_cloud::Result<()> {
        validate_container_name(name)?;
        Ok(self.put_container_acl(name, access).await?)
    }

    async fn delete_container(&self, name: &str) -> cloudseed_cloud::Result<()> {
        validate_container_name(name)?;
        Ok(self.remove_container(name).await?)
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        data: Vec<u8>,
    ) -> cloudseed_cloud::Result<BlobInfo> {
        validate_container_name(container)?;
        Ok(self.put_block_blob(container, blob, data).await?)
    }

    async fn download_blob(&self, container: &str, blob: &str) -> cloudseed_cloud::Result<Vec<u8>> {
        validate_container_name(container)?;
        Ok(self.get_blob(container, blob).await?)
    }
}

fn container_resource(name: &str) -> String {
    format!("container {}", name)
}

/// Error mapper for one SDK call
fn blob_error(action: Action, resource: String) -> impl FnOnce(azure_core::Error) -> AzureError {
    move |err| {
        let (status, code) = match err.kind() {
            ErrorKind::HttpResponse {
                status, error_code, ..
            } => (Some(u16::from(*status)), error_code.clone()),
            _ => (None, None),
        };
        classify(SERVICE, action, resource, status, code, err)
    }
}

fn public_access(access: ContainerAccess) -> PublicAccess {
    match access {
        ContainerAccess::Private => PublicAccess::None,
        ContainerAccess::Blob => PublicAccess::Blob,
        ContainerAccess::Container => PublicAccess::Container,
    }
}

fn container_access(access: PublicAccess) -> ContainerAccess {
    match access {
        PublicAccess::Blob => ContainerAccess::Blob,
        PublicAccess::Container => ContainerAccess::Container,
        _ => ContainerAccess::Private,
    }
}

/// Content type stored with an uploaded blob, by file extension
fn content_type_for(blob: &str) -> Option<&'static str> {
    let (_, ext) = blob.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "txt" => Some("text/plain"),
        "json" => Some("application/json"),
        _ => None,
    }
}
