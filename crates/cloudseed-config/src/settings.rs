//! Connection settings for the storage and document services

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const STORAGE_CONNECTION_STRING_ENV: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const COSMOS_ENDPOINT_ENV: &str = "COSMOS_ENDPOINT";
pub const COSMOS_KEY_ENV: &str = "COSMOS_KEY";

/// Resolved configuration
///
/// ```yaml
/// storage:
///   connection_string: UseDevelopmentStorage=true
///   container: photos
/// documents:
///   endpoint: https://localhost:8081/
///   key: <primary key>
///   database: FamilyRegistry
///   collection: FamilyCollection
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub documents: DocumentSettings,
    /// File the settings were read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub connection_string: Option<String>,
    pub container: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            connection_string: None,
            container: "photos".to_string(),
        }
    }
}

impl StorageSettings {
    pub fn connection_string(&self) -> Result<&str> {
        self.connection_string
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSetting {
                setting: "storage.connection_string",
                env: STORAGE_CONNECTION_STRING_ENV,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub endpoint: Option<String>,
    pub key: Option<String>,
    pub database: String,
    pub collection: String,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            key: None,
            database: "FamilyRegistry".to_string(),
            collection: "FamilyCollection".to_string(),
        }
    }
}

impl DocumentSettings {
    pub fn endpoint(&self) -> Result<&str> {
        self.endpoint
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSetting {
                setting: "documents.endpoint",
                env: COSMOS_ENDPOINT_ENV,
            })
    }

    pub fn key(&self) -> Result<&str> {
        self.key
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSetting {
                setting: "documents.key",
                env: COSMOS_KEY_ENV,
            })
    }
}

impl Settings {
    /// Load settings
    ///
    /// Reads `explicit` if given, else the discovered config file, else
    /// starts from defaults. Environment variables override the file.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match crate::find_config_file() {
                Ok(path) => Self::from_file(&path)?,
                Err(ConfigError::ConfigFileNotFound) => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
                Err(e) => return Err(e),
            },
        };
        settings.apply_env();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut settings = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        settings.source = Some(path.to_path_buf());
        Ok(settings)
    }

    fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Overlay credentials from the environment
    pub fn apply_env(&mut self) {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(value) = var(STORAGE_CONNECTION_STRING_ENV) {
            self.storage.connection_string = Some(value);
        }
        if let Some(value) = var(COSMOS_ENDPOINT_ENV) {
            self.documents.endpoint = Some(value);
        }
        if let Some(value) = var(COSMOS_KEY_ENV) {
            self.documents.key = Some(value);
        }
    }
}

/// Hide a secret for display, keeping a short prefix
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    const ENV_VARS: [&str; 3] = [STORAGE_CONNECTION_STRING_ENV, COSMOS_ENDPOINT_ENV, COSMOS_KEY_ENV];

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.storage.container, "photos");
        assert_eq!(settings.documents.database, "FamilyRegistry");
        assert_eq!(settings.documents.collection, "FamilyCollection");
        assert!(matches!(
            settings.storage.connection_string(),
            Err(ConfigError::MissingSetting { env: STORAGE_CONNECTION_STRING_ENV, .. })
        ));
        assert!(settings.documents.endpoint().is_err());
        assert!(settings.documents.key().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml(
            "storage:\n  connection_string: UseDevelopmentStorage=true\ndocuments:\n  database: Registry2\n",
        )
        .unwrap();
        assert_eq!(
            settings.storage.connection_string().unwrap(),
            "UseDevelopmentStorage=true"
        );
        assert_eq!(settings.storage.container, "photos");
        assert_eq!(settings.documents.database, "Registry2");
        assert_eq!(settings.documents.collection, "FamilyCollection");
    }

    #[test]
    fn test_empty_file_is_defaults() {
        assert_eq!(Settings::from_yaml("").unwrap(), Settings::default());
    }

    #[test]
    fn test_parse_error_names_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("cloudseed.yaml");
        fs::write(&path, "storage: 42").unwrap();

        let err = Settings::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("cloudseed.yaml"));
    }

    #[test]
    #[serial]
    fn test_load_explicit_path_with_env_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("seed.yaml");
        fs::write(
            &path,
            "documents:\n  endpoint: https://file.documents.azure.com/\n  key: ZmlsZQ==\n",
        )
        .unwrap();

        let settings = temp_env::with_vars(
            [
                (STORAGE_CONNECTION_STRING_ENV, None),
                (COSMOS_ENDPOINT_ENV, None),
                (COSMOS_KEY_ENV, Some("ZW52")),
            ],
            || Settings::load(Some(&path)),
        )
        .unwrap();

        assert_eq!(
            settings.documents.endpoint().unwrap(),
            "https://file.documents.azure.com/"
        );
        assert_eq!(settings.documents.key().unwrap(), "ZW52");
        assert_eq!(settings.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    #[serial]
    fn test_load_without_file_uses_env() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_vars(
            [
                (crate::CONFIG_PATH_ENV, None),
                (STORAGE_CONNECTION_STRING_ENV, Some("UseDevelopmentStorage=true")),
                (COSMOS_ENDPOINT_ENV, None),
                (COSMOS_KEY_ENV, None),
            ],
            || Settings::load(None),
        );
        std::env::set_current_dir(original_dir).unwrap();

        let settings = result.unwrap();
        assert_eq!(
            settings.storage.connection_string().unwrap(),
            "UseDevelopmentStorage=true"
        );
        if settings.source.is_none() {
            assert!(settings.documents.endpoint().is_err());
        }
    }

    #[test]
    #[serial]
    fn test_load_missing_explicit_path_fails() {
        let result = temp_env::with_vars_unset(ENV_VARS, || {
            Settings::load(Some(Path::new("/nonexistent/cloudseed.yaml")))
        });
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(
            mask_secret("C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw=="),
            "C2y6****"
        );
    }
}
