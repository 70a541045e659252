use anyhow::Result;
use clap::Parser;

use validator_watch_node::logging::init_logging;
use validator_watch_node::Node;

use super::NodeOpts;

#[derive(Debug, Parser)]
#[command(about = "Run the watcher until Ctrl+C")]
pub struct Opts {
    #[command(flatten)]
    node: NodeOpts,
}

pub async fn run(opts: &Opts) -> Result<()> {
    let config = opts.node.load_config()?;
    init_logging(config.logs_path.clone(), config.logs_enabled, config.log_level.clone())?;

    let node = Node::from_config(config).await?;
    log::info!(
        "Watching {} every {}s",
        node.watch_config.source_base_url,
        node.watch_config.poll_interval.as_secs()
    );
    node.run().await
}
