//! Account credentials parsed from Azure connection strings

use crate::error::{AzureError, Result};
use reqwest::Url;
use std::collections::HashMap;
use std::str::FromStr;

/// Account name of the local storage emulator
pub const DEVELOPMENT_ACCOUNT_NAME: &str = "devstoreaccount1";

/// Well-known key of the local storage emulator
pub const DEVELOPMENT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

const DEVELOPMENT_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// Split `Key=Value;Key=Value` pairs; values may contain `=`
fn parse_pairs(input: &str) -> Result<HashMap<String, String>> {
    let mut pairs = HashMap::new();
    for part in input.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = part.split_once('=').ok_or_else(|| {
            AzureError::InvalidConnectionString(format!("expected Key=Value, got '{}'", part))
        })?;
        pairs.insert(key.trim().to_string(), value.trim().to_string());
    }
    if pairs.is_empty() {
        return Err(AzureError::InvalidConnectionString(
            "connection string is empty".to_string(),
        ));
    }
    Ok(pairs)
}

fn parse_url(value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| AzureError::InvalidUrl(format!("{}: {}", value, e)))
}

fn required<'a>(pairs: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    pairs
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AzureError::InvalidConnectionString(format!("missing {}", key)))
}

/// Storage account the blob service talks to
#[derive(Clone)]
pub struct StorageAccount {
    pub name: String,
    /// Base64 account key
    pub key: String,
    pub blob_endpoint: Url,
}

impl StorageAccount {
    /// Account served by a local Azurite emulator
    pub fn development() -> Result<Self> {
        Ok(Self {
            name: DEVELOPMENT_ACCOUNT_NAME.to_string(),
            key: DEVELOPMENT_ACCOUNT_KEY.to_string(),
            blob_endpoint: parse_url(DEVELOPMENT_BLOB_ENDPOINT)?,
        })
    }

    /// Parse a storage connection string
    ///
    /// Accepts `UseDevelopmentStorage=true` or the
    /// `DefaultEndpointsProtocol=...;AccountName=...;AccountKey=...` form with
    /// an optional `EndpointSuffix` or explicit `BlobEndpoint`.
    pub fn parse(connection_string: &str) -> Result<Self> {
        let pairs = parse_pairs(connection_string)?;

        if pairs
            .get("UseDevelopmentStorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Self::development();
        }

        let name = required(&pairs, "AccountName")?.to_string();
        let key = required(&pairs, "AccountKey")?.to_string();

        let blob_endpoint = match pairs.get("BlobEndpoint") {
            Some(endpoint) => parse_url(endpoint)?,
            None => {
                let protocol = pairs
                    .get("DefaultEndpointsProtocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = pairs
                    .get("EndpointSuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                parse_url(&format!("{}://{}.blob.{}", protocol, name, suffix))?
            }
        };

        Ok(Self {
            name,
            key,
            blob_endpoint,
        })
    }
}

impl FromStr for StorageAccount {
    type Err = AzureError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Debug for StorageAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAccount")
            .field("name", &self.name)
            .field("key", &"***")
            .field("blob_endpoint", &self.blob_endpoint.as_str())
            .finish()
    }
}

/// Cosmos DB account endpoint and key
#[derive(Clone)]
pub struct CosmosAccount {
    pub endpoint: Url,
    /// Base64 primary or secondary key
    pub key: String,
}

impl CosmosAccount {
    pub fn new(endpoint: &str, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(AzureError::InvalidKey("account key is empty".to_string()));
        }
        Ok(Self {
            endpoint: parse_url(endpoint)?,
            key,
        })
    }

    /// Parse `AccountEndpoint=...;AccountKey=...`
    pub fn parse(connection_string: &str) -> Result<Self> {
        let pairs = parse_pairs(connection_string)?;
        Self::new(
            required(&pairs, "AccountEndpoint")?,
            required(&pairs, "AccountKey")?,
        )
    }
}

impl FromStr for CosmosAccount {
    type Err = AzureError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Debug for CosmosAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmosAccount")
            .field("endpoint", &self.endpoint.as_str())
            .field("key", &"***")
            .finish()
    }
}
