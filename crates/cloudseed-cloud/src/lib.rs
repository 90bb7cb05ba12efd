//! cloudseed cloud abstraction
//!
//! This crate provides the collaborator abstraction for cloudseed: the blob
//! service and document database traits, the idempotent ensure-exists
//! operation every walkthrough step is built on, and the query model shared
//! by all three query forms.
//!
//! # Supported Backends
//!
//! - **Memory**: in-process blob and document stores (this crate)
//! - **Azure**: Blob Storage and Cosmos DB over REST (`cloudseed-cloud-azure`)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  cloudseed CLI                   │
//! │             (cloudseed blob/documents)           │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                cloudseed-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   trait BlobService / DocumentService     │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │    ensure    │  │ Query model  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │    memory     │ │     azure     │
//! │   backends    │ │   provider    │
//! └───────────────┘ └───────────────┘
//! ```

pub mod blob;
pub mod document;
pub mod ensure;
pub mod error;
pub mod memory;
pub mod query;
pub mod report;

// Re-exports
pub use blob::{BlobInfo, BlobService, ContainerAccess, ContainerInfo, validate_container_name};
pub use document::{
    Collection, CollectionInfo, CollectionSpec, DatabaseInfo, DatabaseSpec, DocumentService,
    document_id,
};
pub use ensure::{Provisioned, ensure};
pub use error::{CloudError, Result};
pub use memory::{MemoryBlobService, MemoryDocumentService};
pub use query::{
    CompareOp, Doc, Field, FieldPath, Filter, Projection, QuerySpec, SqlParameter, SqlQuery,
};
pub use report::{
    CleanupPolicy, Outcome, ResourceRef, RunReport, RunSummary, StepFailure, StepRecord,
};
