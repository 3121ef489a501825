use std::path::Path;

use sqlmigrate_common::{Error, Result};
use tracing::{debug, info};

use crate::model::MigrateConfig;

/// Reads a [`MigrateConfig`] from a YAML or TOML file.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> Result<MigrateConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let config = Self::parse(path, &contents)?;
        config.validate()?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Like [`ConfigLoader::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<MigrateConfig> {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(MigrateConfig::default());
        }
        Self::load(path)
    }

    fn parse(path: &Path, contents: &str) -> Result<MigrateConfig> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "yml" | "yaml" => serde_yaml::from_str(contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}"))),
            "toml" => toml::from_str(contents)
                .map_err(|e| Error::Config(format!("TOML parse error: {e}"))),
            other => Err(Error::Config(format!("unsupported config extension: {other}"))),
        }
    }
}
