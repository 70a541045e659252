pub mod check;
pub mod poll_once;
pub mod run;
pub mod subscribe;
pub mod subscribed;

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use validator_watch_node::config_resolution::load_config_with_node_dir;
use validator_watch_node::logging::init_logging;
use validator_watch_node::{Config, Node};

#[derive(Debug, Args)]
pub struct NodeOpts {
    /// Path to the node configuration file
    #[clap(long, env = "VALIDATOR_WATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Node directory containing config.json (defaults to current directory)
    #[clap(long, env = "VALIDATOR_WATCH_DIR")]
    pub dir: Option<PathBuf>,
}

impl NodeOpts {
    pub fn load_config(&self) -> Result<Config> {
        let dir = if self.config.is_none() && self.dir.is_none() {
            Some(std::env::current_dir()?)
        } else {
            self.dir.clone()
        };
        load_config_with_node_dir(self.config.clone(), dir)
    }

    /// For one-shot commands: terminal only, quiet unless the config asks otherwise.
    pub async fn open_quiet(&self) -> Result<Node> {
        let config = self.load_config()?;
        let level = config.log_level.clone().unwrap_or_else(|| "warn".to_string());
        init_logging(None, Some(false), Some(level))?;
        Node::from_config(config).await
    }
}
