use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use pricebook::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = cli::Cli::parse();

    // Initialize tracing/logging early
    init_tracing();

    // Dispatch to appropriate command handler
    match args.get_command() {
        cli::Commands::Start => {
            commands::start::execute().await?;
        }
        cli::Commands::Quote { file, cycle } => {
            commands::quote::execute(&file, &cycle)?;
        }
        cli::Commands::Reconcile { file } => {
            commands::reconcile::execute(&file)?;
        }
        cli::Commands::Test => {
            commands::test::execute()?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show()?,
            cli::ConfigCommands::Validate => commands::config::validate()?,
        },
        cli::Commands::Version => {
            println!("pricebook v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
