pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{DocumentSettings, Settings, StorageSettings, mask_secret};

use std::path::PathBuf;

/// Environment variable naming a config file directly
pub const CONFIG_PATH_ENV: &str = "CLOUDSEED_CONFIG_PATH";

const CANDIDATES: [&str; 4] = [
    "cloudseed.local.yaml",
    ".cloudseed.local.yaml",
    "cloudseed.yaml",
    ".cloudseed.yaml",
];

/// cloudseed's global config directory (`~/.config/cloudseed`)
///
/// Only resolves the path; nothing is created on disk.
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("cloudseed"))
}

/// Locate the project's config file
///
/// Search order:
/// 1. `CLOUDSEED_CONFIG_PATH` (direct path)
/// 2. current directory: cloudseed.local.yaml, .cloudseed.local.yaml, cloudseed.yaml, .cloudseed.yaml
/// 3. `./.cloudseed/` with the same names
/// 4. `~/.config/cloudseed/cloudseed.yaml` (global)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_dir = current_dir.join(".cloudseed");
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Ok(dir) = config_dir() {
        let global_config = dir.join("cloudseed.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}
