use anyhow::{anyhow, Result};
use clap::Parser;

use validator_watch_engine::TickOutcome;

use super::NodeOpts;

#[derive(Debug, Parser)]
pub struct Opts {
    #[command(flatten)]
    node: NodeOpts,
}

pub async fn run(opts: &Opts) -> Result<()> {
    let node = opts.node.open_quiet().await?;
    match node.poll_once().await {
        TickOutcome::Completed(summary) => {
            println!("records processed:    {}", summary.records);
            println!("changes detected:     {}", summary.changes);
            println!("validators notified:  {}", summary.notified_validators);
            println!("alerts dispatched:    {}", summary.alerts_dispatched);
            println!("store failures:       {}", summary.store_failures);
            Ok(())
        }
        TickOutcome::Skipped => Err(anyhow!("Another poll cycle is still running")),
        TickOutcome::Aborted(err) => Err(anyhow!("Poll cycle aborted: {}", err)),
    }
}
