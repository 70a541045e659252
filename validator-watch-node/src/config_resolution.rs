use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;

/// Picks the config file from either a direct path or a node directory holding `config.json`.
pub fn resolve_config_path(config: Option<PathBuf>, node_dir: Option<PathBuf>) -> Result<PathBuf> {
    match (config, node_dir) {
        (Some(config_path), None) => Ok(config_path),
        (None, Some(node_dir_path)) => {
            let config_path = node_dir_path.join("config.json");
            if !config_path.exists() {
                anyhow::bail!(
                    "Config file not found at {:?}. Expected config.json in node directory {:?}",
                    config_path,
                    node_dir_path
                );
            }
            Ok(config_path)
        }
        (Some(_), Some(_)) => anyhow::bail!("Cannot specify both --config and --dir. Use one or the other."),
        (None, None) => anyhow::bail!("Must specify either --config or --dir"),
    }
}

/// With a node directory, storage and logs always live in `storage/` and `logs/` inside it.
pub fn load_config_with_node_dir(config: Option<PathBuf>, node_dir: Option<PathBuf>) -> Result<Config> {
    let config_path = resolve_config_path(config, node_dir.clone())?;
    let mut config = Config::from_filepath(&config_path)?;

    if let Some(node_dir_path) = node_dir {
        config.storage_path = Some(node_dir_path.join("storage"));
        config.logs_path = Some(node_dir_path.join("logs"));
    }

    Ok(config)
}
