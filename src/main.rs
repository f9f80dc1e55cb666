//! reconnoiter - crawl-and-deduplicate web reconnaissance CLI

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing_subscriber::EnvFilter;

use reconnoiter::config::{self, CliOverrides};
use reconnoiter::crawler::browser::BrowserFetcher;
use reconnoiter::crawler::fetcher::{HttpFetcher, PageFetcher};
use reconnoiter::crawler::Crawler;
use reconnoiter::http::HttpClient;
use reconnoiter::models::{CrawlReport, ScanConfig};
use reconnoiter::report::{ConsoleSink, JsonlSink};

/// reconnoiter - web asset discovery with near-duplicate suppression
#[derive(Parser)]
#[command(name = "reconnoiter", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl one or more targets and report novel pages
    Scan {
        /// Seed URL (repeatable; scheme defaults to https)
        #[arg(short, long = "url")]
        urls: Vec<String>,

        /// File with one seed URL per line
        #[arg(short, long)]
        batch: Option<PathBuf>,

        /// Maximum crawl depth (seeds are depth 0)
        #[arg(short, long)]
        depth: Option<u32>,

        /// Number of concurrent fetches
        #[arg(short, long)]
        threads: Option<usize>,

        /// URLs fetched per batch within a depth
        #[arg(long)]
        batch_size: Option<usize>,

        /// Per-page timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// HTTP/HTTPS/SOCKS proxy URL
        #[arg(short, long)]
        proxy: Option<String>,

        /// Max requests per second (HTTP fetcher)
        #[arg(long)]
        rate_limit: Option<u32>,

        /// Custom headers (format: "Key: Value")
        #[arg(short = 'H', long)]
        header: Vec<String>,

        /// File with extra in-scope root domains, one per line
        #[arg(short, long)]
        whitelist: Option<PathBuf>,

        /// Enable or disable the per-domain title test
        #[arg(long)]
        title_dedup: Option<bool>,

        /// Treat pages with the same byte length on a domain as duplicates
        #[arg(long)]
        length_dedup: bool,

        /// Content similarity threshold (0-100)
        #[arg(long)]
        content_threshold: Option<u8>,

        /// DOM structure similarity threshold (0-100)
        #[arg(long)]
        dom_threshold: Option<u8>,

        /// JSONL file receiving one record per accepted page
        #[arg(short, long)]
        output: Option<String>,

        /// Load pages in headless Chromium (requires the `browser` feature)
        #[arg(long)]
        render: bool,

        /// Show the browser window while rendering
        #[arg(long)]
        visible: bool,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print the default configuration as TOML
    Config,
}

fn print_banner() {
    let banner = r#"
    ╔═══════════════════════════════════════╗
    ║  RECONNOITER v0.1.0                   ║
    ║  Crawl, discover, deduplicate         ║
    ╚═══════════════════════════════════════╝
    "#;
    println!("{}", banner.cyan());
}

fn print_summary(report: &CrawlReport, requests: Option<u64>) {
    println!("\n{}", "  Crawl Summary".bold());
    println!("  {}", "─".repeat(35));

    let mut builder = Builder::default();
    builder.push_record(["Metric", "Count"]);
    builder.push_record(["Pages accepted".to_string(), report.pages.len().to_string()]);
    builder.push_record(["Duplicates".to_string(), report.duplicates.to_string()]);
    builder.push_record(["Filtered".to_string(), report.filtered.to_string()]);
    builder.push_record(["Failed".to_string(), report.failed.len().to_string()]);
    for (depth, frontier) in report.frontiers.iter().enumerate() {
        builder.push_record([
            format!("Scheduled for depth {}", depth + 1),
            frontier.len().to_string(),
        ]);
    }
    if let Some(requests) = requests {
        builder.push_record(["HTTP requests".to_string(), requests.to_string()]);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");

    let flagged = report.pages.iter().filter(|p| !p.markers.is_empty()).count();
    if flagged > 0 {
        println!(
            "\n  {} {}",
            format!("{flagged}").magenta().bold(),
            "pages expose login, registration, reset or form flows".magenta()
        );
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            urls,
            batch,
            depth,
            threads,
            batch_size,
            timeout,
            proxy,
            rate_limit,
            header,
            whitelist,
            title_dedup,
            length_dedup,
            content_threshold,
            dom_threshold,
            output,
            render,
            visible,
            config: config_path,
            verbose,
        } => {
            let filter = if verbose {
                "reconnoiter=debug"
            } else {
                "reconnoiter=info"
            };
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
                )
                .with_target(false)
                .init();

            print_banner();

            let mut scan_config = if let Some(ref path) = config_path {
                config::load_config(path)?
            } else {
                let default_path = Path::new("config/default.toml");
                if default_path.exists() {
                    config::load_config(default_path)?
                } else {
                    ScanConfig::default()
                }
            };

            let mut targets = urls;
            if let Some(ref path) = batch {
                targets.extend(config::read_lines(path)?);
            }
            let whitelist = match whitelist {
                Some(ref path) => config::read_lines(path)?,
                None => Vec::new(),
            };

            config::merge_cli_args(
                &mut scan_config,
                CliOverrides {
                    targets,
                    whitelist,
                    threads,
                    timeout,
                    max_depth: depth,
                    batch_size,
                    proxy,
                    rate_limit,
                    headers: header,
                    title_dedup,
                    length_dedup,
                    content_threshold,
                    dom_threshold,
                    output,
                    render,
                    visible,
                },
            );

            if scan_config.targets.is_empty() {
                eprintln!(
                    "  {} no targets given (use -u/--url, -b/--batch or [scope].targets)",
                    "Error:".red().bold()
                );
                std::process::exit(2);
            }

            println!(
                "  {} {}",
                "Targets:".bold(),
                scan_config.targets.join(", ").green()
            );
            println!(
                "  {} {}",
                "Depth:".bold(),
                scan_config.max_depth.to_string().cyan()
            );
            println!(
                "  {} {}",
                "Threads:".bold(),
                scan_config.threads.to_string().cyan()
            );
            println!(
                "  {} {}\n",
                "Fetcher:".bold(),
                if scan_config.render { "headless browser" } else { "http" }.cyan()
            );

            let mut http_client = None;
            let fetcher: Arc<dyn PageFetcher> = if scan_config.render {
                Arc::new(BrowserFetcher::launch(&scan_config).await?)
            } else {
                let client = HttpClient::from_config(&scan_config)?;
                http_client = Some(client.clone());
                Arc::new(HttpFetcher::new(client).with_body_limit(scan_config.max_fetch_bytes))
            };

            let seeds = scan_config.targets.clone();
            let mut crawler = Crawler::new(scan_config.clone(), fetcher)
                .with_sink(Arc::new(ConsoleSink))
                .with_progress(!verbose);
            if let Some(ref path) = scan_config.output {
                crawler = crawler.with_sink(Arc::new(JsonlSink::create(Path::new(path))?));
            }

            let report = crawler.crawl(&seeds).await;

            print_summary(&report, http_client.as_ref().map(HttpClient::request_count));
            if let Some(ref path) = scan_config.output {
                println!("\n  {} {}", "Records saved to:".bold(), path.green());
            }
        }
        Commands::Config => {
            print!("{}", config::to_toml(&ScanConfig::default())?);
        }
    }

    Ok(())
}
