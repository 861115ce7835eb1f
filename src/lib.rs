pub mod aggregator;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod link_checker;
pub mod models;
pub mod performance;
pub mod reporter;
pub mod robots;
pub mod scoring;
pub mod seo_analyzer;
pub mod sitemap;

use analyzer::{AnalysisOptions, SiteAnalyzer, secs_to_duration};
use anyhow::Result;
use cli::Cli;
use colored::*;
use config::Config;
use error::AnalysisError;
use models::AnalysisReport;
use reporter::Reporter;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the stderr log subscriber. `RUST_LOG` wins over `verbose`.
/// Calling it again is a no-op.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "seoscan=info" } else { "seoscan=warn" };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub fn options_from_cli(args: &Cli) -> AnalysisOptions {
    AnalysisOptions {
        timeout: Duration::from_secs(args.timeout),
        batch_size: args.workers.max(1),
        limit: args.limit,
        skip_links: args.skip_links,
        keyword: args.keyword.clone(),
        show_progress: args.output != "json",
        ..Default::default()
    }
    .with_delay(secs_to_duration(args.delay))
}

async fn analyze(url: &str, options: AnalysisOptions) -> Result<AnalysisReport, AnalysisError> {
    SiteAnalyzer::new(url, options)?.run().await
}

pub async fn run(args: Cli) -> Result<()> {
    let args = Config::resolve(&args)?;
    init_tracing(args.verbose);

    let json_output = args.output == "json";
    let options = options_from_cli(&args);

    if !json_output {
        println!(
            "{}",
            "seoscan - Sitemap-driven SEO Analyzer".bright_cyan().bold()
        );
        println!("{}", "=".repeat(50).bright_blue());
        println!();
        println!("{} {}", "Site:".bright_white().bold(), args.url);
        println!("{} {}s", "Timeout:".bright_white().bold(), args.timeout);
        println!("{} {}s", "Delay:".bright_white().bold(), args.delay);
        if let Some(limit) = args.limit {
            println!("{} {}", "Limit:".bright_white().bold(), limit);
        }
        println!(
            "{} {}",
            "Link checks:".bright_white().bold(),
            if args.skip_links { "skipped" } else { "enabled" }
        );
        println!();
    }

    let report = match analyze(&args.url, options).await {
        Ok(report) => report,
        Err(e) => {
            if json_output {
                println!("{}", serde_json::to_string_pretty(&e.to_response())?);
            }
            return Err(e.into());
        }
    };

    if json_output {
        println!("{}", Reporter::to_json(&report)?);
    } else {
        println!(
            "{} {} pages analyzed",
            "Success:".bright_green().bold(),
            report.results.len()
        );
        Reporter::print_text_report(&report, &args.url);
    }

    if let Some(filename) = &args.save {
        Reporter::save_json_report(&report, filename)?;
        if !json_output {
            println!("Report saved to: {}", filename.bright_green());
        }
    }

    Ok(())
}
