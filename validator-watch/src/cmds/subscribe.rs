use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use validator_watch_engine::{ConfirmOutcome, SubscribeOutcome, UnchangedReason};

use super::NodeOpts;

#[derive(Debug, Parser)]
pub struct Opts {
    #[command(flatten)]
    node: NodeOpts,

    /// Observer identifier, as the chat transport knows it
    #[clap(long)]
    observer: String,

    /// Operator address to follow
    address: String,

    /// Answer yes to the overwrite question without asking
    #[clap(long)]
    yes: bool,
}

pub async fn run(opts: &Opts) -> Result<()> {
    let node = opts.node.open_quiet().await?;

    let existing_address = match node.registry.subscribe(&opts.observer, &opts.address).await? {
        SubscribeOutcome::Created => {
            println!("✅ {} now follows {}", opts.observer, opts.address);
            return Ok(());
        }
        SubscribeOutcome::AlreadySubscribed => {
            println!("{} already follows {}", opts.observer, opts.address);
            return Ok(());
        }
        SubscribeOutcome::PendingConfirmation { existing_address, .. } => existing_address,
    };

    let accepted = opts.yes
        || prompt_yes_no(&format!(
            "{} already follows {}. Overwrite it with {}? (yes/no) ",
            opts.observer, existing_address, opts.address
        ))
        .await?;

    match node.registry.confirm_overwrite(&opts.observer, &opts.address, accepted).await? {
        ConfirmOutcome::Updated { previous_address, current_address } => {
            println!("✅ {} moved from {} to {}", opts.observer, previous_address, current_address)
        }
        ConfirmOutcome::Unchanged(UnchangedReason::Declined) => println!("Subscription not changed"),
        ConfirmOutcome::Unchanged(UnchangedReason::NoPendingRequest) => {
            return Err(anyhow!("The overwrite request expired before it was answered"))
        }
    }
    Ok(())
}

async fn prompt_yes_no(question: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(question.as_bytes()).await?;
        stdout.flush().await?;
        let line = lines
            .next_line()
            .await
            .context("Failed to read answer")?
            .ok_or_else(|| anyhow!("No answer on stdin"))?;
        match line.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => return Ok(true),
            "no" | "n" => return Ok(false),
            _ => println!("Please respond with 'yes' or 'no'"),
        }
    }
}
