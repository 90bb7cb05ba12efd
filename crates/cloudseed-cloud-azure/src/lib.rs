//! Azure provider for cloudseed
//!
//! This crate implements the `BlobService` and `DocumentService` traits
//! against Azure on top of the `azure_storage_blobs` and `azure_data_cosmos`
//! clients.
//!
//! # Features
//!
//! - Blob Storage: containers, public access level, block blob upload and download
//! - Cosmos DB (SQL API): databases, collections, documents, parameterized queries
//!
//! # Requirements
//!
//! - Blob Storage: a storage account connection string
//!   (`UseDevelopmentStorage=true` targets a local Azurite emulator)
//! - Cosmos DB: the account endpoint URL and a primary or secondary key
//!
//! # Example
//!
//! ```ignore
//! use cloudseed_cloud::BlobService;
//! use cloudseed_cloud_azure::{AzureBlobService, StorageAccount};
//!
//! let account: StorageAccount = std::env::var("AZURE_STORAGE_CONNECTION_STRING")?.parse()?;
//! let blobs = AzureBlobService::new(account);
//!
//! if blobs.find_container("photos").await?.is_none() {
//!     blobs.create_container("photos").await?;
//! }
//! ```

pub mod blob;
pub mod connection_string;
pub mod cosmos;
pub mod error;

pub use blob::AzureBlobService;
pub use connection_string::{CosmosAccount, StorageAccount};
pub use cosmos::CosmosDocumentService;
pub use error::{AzureError, Result};
