use anyhow::Result;
use clap::Parser;

use super::NodeOpts;

#[derive(Debug, Parser)]
pub struct Opts {
    #[command(flatten)]
    node: NodeOpts,

    /// Operator address of the validator
    address: String,
}

pub async fn run(opts: &Opts) -> Result<()> {
    let node = opts.node.open_quiet().await?;
    println!("{}", node.status.check_message(&opts.address).await);
    Ok(())
}
