use anyhow::Context;
use sealbid_core::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "sealbid.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub db_file: String,
    pub verbose: bool,
    /// Defaults for games created without explicit parameters
    pub registry: RegistryConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("sealbid"),
            db_file: "sealbid.db".to_string(),
            verbose: false,
            registry: RegistryConfig::default(),
        }
    }
}

impl CliConfig {
    /// Read `sealbid.json` from the data directory, if there is one
    pub async fn load(data_dir: Option<PathBuf>, verbose: bool) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }

        let path = config.data_dir.join(CONFIG_FILE);
        if tokio::fs::try_exists(&path).await? {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let stored: CliConfig = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid config in {}", path.display()))?;
            config.db_file = stored.db_file;
            config.registry = stored.registry;
        }

        config.verbose = verbose;
        config.registry.validate()?;
        Ok(config)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    pub fn config_path(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }
}
