//! Azure provider error types

use cloudseed_cloud::CloudError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Invalid account key: {0}")]
    InvalidKey(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("{service} returned HTTP {status}{} for {resource}", fmt_code(.code))]
    Api {
        service: &'static str,
        status: u16,
        code: Option<String>,
        resource: String,
        #[source]
        source: BoxError,
    },

    #[error("{service} request for {resource} failed")]
    Request {
        service: &'static str,
        resource: String,
        #[source]
        source: BoxError,
    },
}

fn fmt_code(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" ({})", c))
        .unwrap_or_default()
}

/// What a failed SDK call was doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Reading or listing a resource
    Read,
    /// Creating a resource that must not exist yet
    Create,
    /// Changing or removing an existing resource
    Modify,
}

/// Map a failed SDK call onto `AzureError` by HTTP status
///
/// 404 is always `NotFound`; 409 is only a `Conflict` when creating.
/// Failures that never got a response become `Request`.
pub(crate) fn classify<E>(
    service: &'static str,
    action: Action,
    resource: String,
    status: Option<u16>,
    code: Option<String>,
    source: E,
) -> AzureError
where
    E: std::error::Error + Send + Sync + 'static,
{
    match status {
        Some(404) => AzureError::NotFound(resource),
        Some(409) if action == Action::Create => AzureError::Conflict(resource),
        Some(status) => AzureError::Api {
            service,
            status,
            code,
            resource,
            source: Box::new(source),
        },
        None => AzureError::Request {
            service,
            resource,
            source: Box::new(source),
        },
    }
}

/// Lookup result with `NotFound` folded into `None`
pub(crate) fn absent<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AzureError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl From<AzureError> for CloudError {
    fn from(err: AzureError) -> Self {
        match err {
            AzureError::NotFound(what) => CloudError::NotFound(what),
            AzureError::Conflict(what) => CloudError::AlreadyExists(what),
            AzureError::InvalidQuery(msg) => CloudError::InvalidQuery(msg),
            AzureError::InvalidDocument(msg) => CloudError::InvalidDocument(msg),
            AzureError::Api {
                status: 401 | 403,
                source,
                ..
            } => CloudError::AuthenticationFailed(source.to_string()),
            other => CloudError::backend(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AzureError>;
