mod cmds;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "validator-watch")]
#[command(version)]
#[command(about = "Watch validators and alert subscribers when they change", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll on an interval and deliver alerts until Ctrl+C
    Run(cmds::run::Opts),

    /// Show a validator's live status and recent signing history
    Check(cmds::check::Opts),

    /// Subscribe an observer to a validator
    Subscribe(cmds::subscribe::Opts),

    /// Show which validator an observer follows
    Subscribed(cmds::subscribed::Opts),

    /// Run a single poll cycle and exit
    #[command(alias = "poll_once")]
    PollOnce(cmds::poll_once::Opts),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Run(opts) => cmds::run::run(opts).await?,
        Commands::Check(opts) => cmds::check::run(opts).await?,
        Commands::Subscribe(opts) => cmds::subscribe::run(opts).await?,
        Commands::Subscribed(opts) => cmds::subscribed::run(opts).await?,
        Commands::PollOnce(opts) => cmds::poll_once::run(opts).await?,
    }

    Ok(())
}
