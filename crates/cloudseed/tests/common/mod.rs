#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! once assert_cmd 2.1 is the floor

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Scratch directory the binary runs in, isolated from any real config
pub struct TestDir {
    pub root: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// `cloudseed` with no inherited credentials, colors or log filter
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("cloudseed").unwrap();
        cmd.current_dir(self.root.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("CLOUDSEED_CONFIG_PATH")
            .env_remove("CLOUDSEED_BACKEND")
            .env_remove("AZURE_STORAGE_CONNECTION_STRING")
            .env_remove("COSMOS_ENDPOINT")
            .env_remove("COSMOS_KEY");
        cmd
    }
}
