use anyhow::Result;
use clap::Parser;
use colored::*;
use seoscan::cli::Cli;
use seoscan::run;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    tokio::select! {
        result = run(args) => {
            if let Err(e) = result {
                eprintln!("{} {}", "Error:".bright_red().bold(), e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("{}", "Analysis interrupted by user".yellow());
            std::process::exit(130);
        }
    }

    Ok(())
}
