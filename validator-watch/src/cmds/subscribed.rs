use anyhow::Result;
use clap::Parser;

use super::NodeOpts;

#[derive(Debug, Parser)]
pub struct Opts {
    #[command(flatten)]
    node: NodeOpts,

    /// Observer identifier, as the chat transport knows it
    #[clap(long)]
    observer: String,
}

pub async fn run(opts: &Opts) -> Result<()> {
    let node = opts.node.open_quiet().await?;
    match node.registry.get_subscription(&opts.observer).await? {
        Some(address) => println!("{} follows {}", opts.observer, address),
        None => println!("{} is not subscribed to any validator", opts.observer),
    }
    Ok(())
}
