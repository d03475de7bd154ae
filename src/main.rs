//! # alt-scan CLI
//!
//! Command-line front end for the alt text audit pipeline.
//!
//! ## Subcommands
//!
//! - `scan`: sample pages from one input, review every image found and write
//!   a CSV report
//! - `generate`: add suggested alt text to a report produced by `scan`
//!
//! Progress of long-running stages is drawn with indicatif from events the
//! library sends over a channel.

mod logging;

use std::path::PathBuf;

use alt_scan::generation::{self, BackendKind, GenerationBackend, generate_csv};
use alt_scan::progress::ProgressEvent;
use alt_scan::scan::{ScanConfig, Scanner};
use alt_scan::sources::UrlSource;
use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

#[derive(Parser)]
#[command(author, version, about = "Audit website images for WCAG 1.1.1 alt text", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan pages for images and write an alt text report
    Scan(ScanArgs),

    /// Generate alt text for every image in a report
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// CSV file with a `URL` column
    #[arg(long)]
    csv: Option<PathBuf>,

    /// JSON file with a list of URLs
    #[arg(long)]
    json: Option<PathBuf>,

    /// RSS or Atom feed URL
    #[arg(long)]
    rss: Option<String>,

    /// Sitemap URL
    #[arg(long)]
    sitemap: Option<String>,

    /// Site to discover through its sitemap or by crawling
    #[arg(long)]
    domain: Option<String>,
}

impl InputArgs {
    fn into_source(self) -> Option<UrlSource> {
        self.csv
            .map(UrlSource::Csv)
            .or_else(|| self.json.map(UrlSource::Json))
            .or_else(|| self.rss.map(UrlSource::Rss))
            .or_else(|| self.sitemap.map(UrlSource::Sitemap))
            .or_else(|| self.domain.map(UrlSource::Domain))
    }
}

#[derive(Args, Debug)]
struct ScanArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Number of pages to sample
    #[arg(short, long, default_value = "100")]
    sample_size: usize,

    /// Initial delay between requests in seconds
    #[arg(short, long, default_value = "1")]
    throttle: u64,

    /// Crawl the domain without looking for a sitemap
    #[arg(long)]
    crawl_only: bool,

    /// Words per sentence above which simpler alt text is suggested
    #[arg(long, default_value = "20")]
    readability_threshold: f64,

    /// Directory for the report
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Do not pause the scan while the network is unreachable
    #[arg(long)]
    no_connectivity_check: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Report CSV produced by `scan`
    #[arg(long, required = true)]
    csv: PathBuf,

    /// Backend producing the alt text
    #[arg(long, value_enum, default_value = "local")]
    model: BackendKind,

    /// Extra instructions for the model
    #[arg(short = 'g', long, default_value = generation::DEFAULT_INSTRUCTIONS)]
    instructions: String,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            logging::setup_logging(args.log_file.as_deref())?;
            scan_command(args).await?;
        }
        Commands::Generate(args) => {
            logging::setup_logging(args.log_file.as_deref())?;
            generate_command(args).await?;
        }
    }

    Ok(())
}

#[instrument(skip(args))]
async fn scan_command(args: ScanArgs) -> anyhow::Result<()> {
    let source = args
        .input
        .into_source()
        .context("One of --csv, --json, --rss, --sitemap or --domain is required")?;

    let config = ScanConfig::builder()
        .sample_size(args.sample_size)
        .throttle_secs(args.throttle)
        .crawl_only(args.crawl_only)
        .readability_threshold(args.readability_threshold)
        .output_dir(args.output_dir)
        .connectivity_check(!args.no_connectivity_check)
        .build();

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let scanner = Scanner::new(config).context("Failed to create scanner")?;

    let (progress_sender, progress_receiver) = mpsc::channel(100);
    let progress_handle = spawn_progress(progress_receiver);

    let start_time = std::time::Instant::now();
    let result = scanner.run(&source, Some(&progress_sender)).await;

    drop(progress_sender);
    let _ = progress_handle.await;

    let summary = result.with_context(|| format!("Scan of {} failed", source))?;
    info!(
        "Found {} URLs, processed {} pages and {} images in {:.2?}",
        summary.urls_found,
        summary.pages_processed,
        summary.records.len(),
        start_time.elapsed()
    );
    match summary.report {
        Some(path) => println!("Report written to {}", path.display()),
        None => println!("No images found, no report written"),
    }

    Ok(())
}

#[instrument(skip(args))]
async fn generate_command(args: GenerateArgs) -> anyhow::Result<()> {
    let backend = GenerationBackend::from_env(args.model).map_err(alt_scan::Error::from)?;
    info!("Generating alt text with {}", backend);

    let output = generation::output_path(&args.csv, Local::now().naive_local());

    let (progress_sender, progress_receiver) = mpsc::channel(100);
    let progress_handle = spawn_progress(progress_receiver);

    let result = generate_csv(
        &args.csv,
        &output,
        &backend,
        &args.instructions,
        Some(&progress_sender),
    )
    .await;

    drop(progress_sender);
    let _ = progress_handle.await;

    let summary = result.with_context(|| format!("Failed to process {}", args.csv.display()))?;
    println!(
        "Generated alt text for {} of {} rows ({} failed). Saved to {}",
        summary.generated,
        summary.rows,
        summary.failed,
        output.display()
    );

    Ok(())
}

/// Draw one progress bar per stage until every sender is dropped
fn spawn_progress(mut progress_receiver: mpsc::Receiver<ProgressEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut progress_bar: Option<ProgressBar> = None;

        while let Some(event) = progress_receiver.recv().await {
            match event {
                ProgressEvent::Started { stage, total } => {
                    let bar = ProgressBar::new(total);
                    if let Ok(style) = ProgressStyle::default_bar()
                        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")
                    {
                        bar.set_style(style.progress_chars("##-"));
                    }
                    bar.set_message(stage);
                    progress_bar = Some(bar);
                }
                ProgressEvent::PageCrawled(url) | ProgressEvent::PageProcessed(url) => {
                    if let Some(bar) = &progress_bar {
                        bar.inc(1);
                        bar.set_message(url);
                    }
                }
                ProgressEvent::Finished { stage } => {
                    if let Some(bar) = progress_bar.take() {
                        bar.finish_with_message(format!("{} completed", stage));
                    }
                }
            }
        }

        if let Some(bar) = progress_bar {
            bar.abandon();
        }
    })
}
