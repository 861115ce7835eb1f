use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "seoscan")]
#[command(
    about = "A sitemap-driven SEO auditor: scores every page a site's sitemap lists",
    long_about = None
)]
pub struct Cli {
    /// The site to analyze (its sitemap is discovered automatically)
    #[arg(value_name = "URL")]
    pub url: String,

    /// Per-request timeout in seconds (default: 10)
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,

    /// Delay before each page fetch in seconds (default: 0.5)
    #[arg(short, long, default_value_t = 0.5)]
    pub delay: f64,

    /// Maximum number of sitemap URLs to analyze
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Skip broken link and image validation
    #[arg(long)]
    pub skip_links: bool,

    /// Number of links checked concurrently per batch (default: 5)
    #[arg(short, long, default_value_t = 5)]
    pub workers: usize,

    /// Target keyword used for keyword density
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub output: String,

    /// Save the JSON report to a file
    #[arg(short, long)]
    pub save: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to configuration file (JSON, TOML, or YAML)
    #[arg(long)]
    pub config: Option<String>,
}
