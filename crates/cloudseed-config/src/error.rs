use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Config file not found. Looked in:\n\
        - current directory: cloudseed.local.yaml, .cloudseed.local.yaml, cloudseed.yaml, .cloudseed.yaml\n\
        - ./.cloudseed/ directory\n\
        - ~/.config/cloudseed/cloudseed.yaml\n\
        Set CLOUDSEED_CONFIG_PATH to point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Missing setting '{setting}' (set it in the config file or via {env})")]
    MissingSetting {
        setting: &'static str,
        env: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
