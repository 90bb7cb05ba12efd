//! Blob service trait definition

use crate::error::{CloudError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Blob storage abstraction
///
/// Containers are addressed by a DNS-safe name, blobs by a name within their
/// container. Lookups report absence as `None`; only the operations that
/// need an existing resource fail with [`CloudError::NotFound`].
#[async_trait]
pub trait BlobService: Send + Sync {
    /// Returns the backend name (e.g., "memory", "azure")
    fn name(&self) -> &str;

    /// Look up a container by name
    async fn find_container(&self, name: &str) -> Result<Option<ContainerInfo>>;

    /// Create a container; fails if it already exists
    async fn create_container(&self, name: &str) -> Result<ContainerInfo>;

    /// Change who may read the container without the account key
    async fn set_container_access(&self, name: &str, access: ContainerAccess) -> Result<()>;

    /// Delete a container and every blob in it
    async fn delete_container(&self, name: &str) -> Result<()>;

    /// Upload bytes as a block blob, replacing any existing blob of that name
    async fn upload_blob(&self, container: &str, blob: &str, data: Vec<u8>) -> Result<BlobInfo>;

    /// Download the full contents of a blob
    async fn download_blob(&self, container: &str, blob: &str) -> Result<Vec<u8>>;
}

/// Container information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub access: ContainerAccess,
    pub etag: Option<String>,
}

impl ContainerInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access: ContainerAccess::Private,
            etag: None,
        }
    }
}

/// Blob information returned by an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub container: String,
    pub name: String,
    pub size: u64,
}

/// Anonymous read access level of a container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerAccess {
    /// Account key required for every request
    #[default]
    Private,
    /// Blobs are publicly readable, the container listing is not
    Blob,
    /// Blobs and the container listing are publicly readable
    Container,
}

impl std::fmt::Display for ContainerAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerAccess::Private => write!(f, "private"),
            ContainerAccess::Blob => write!(f, "blob"),
            ContainerAccess::Container => write!(f, "container"),
        }
    }
}

/// Check that a container name is a valid DNS label for blob storage
///
/// 3-63 characters of lowercase letters, digits and hyphens, starting and
/// ending with a letter or digit, with no two hyphens in a row.
pub fn validate_container_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(CloudError::InvalidName(format!(
            "container name '{}' {}",
            name, reason
        )))
    };

    if !(3..=63).contains(&name.len()) {
        return invalid("must be 3 to 63 characters long");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return invalid("may only contain lowercase letters, digits and hyphens");
    }
    if name.starts_with('-') || name.ends_with('-') {
        return invalid("must start and end with a letter or digit");
    }
    if name.contains("--") {
        return invalid("must not contain consecutive hyphens");
    }
    Ok(())
}
