use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod error;
mod pending;
mod runtime;

#[cfg(test)]
mod testing;

use cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        cli::Commands::Init { path } => {
            cli::init::write_default_config(&path)?;
            println!("Configuration file created at {}", path.display());
        }
        cli::Commands::Validate { path } => match cli::validate::validate(&path) {
            Ok(()) => println!("✓ {} is a valid pending-state snapshot", path.display()),
            Err(e) => {
                eprintln!("✗ {:#}", e);
                std::process::exit(1);
            }
        },
        cli::Commands::Inspect { path } => {
            let summary = cli::inspect::inspect(&path)?;
            print!("{summary}");
        }
    }

    Ok(())
}
