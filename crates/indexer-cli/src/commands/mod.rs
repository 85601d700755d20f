mod seed;
mod serve;

use miette::Result;

use crate::cli::Cli;

pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        crate::cli::Command::Serve => serve::run().await,
        crate::cli::Command::Seed { action } => seed::run(action).await,
    }
}
