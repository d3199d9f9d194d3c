//! Harvest command implementation

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{Cli, CliError, OutputFormat};
use crate::fetcher::youtube_http::{build_http_client, YouTubeHttpClient};
use crate::harvester::config::{
    HarvestConfig, BATCH_SIZE, INITIAL_BACKOFF_MS, MAX_PAGES, MAX_RETRIES, MAX_WINDOW_MONTHS,
    PAGE_DELAY_MS, PAGE_SIZE, REFERENCE_OFFSET_HOURS,
};
use crate::harvester::credentials::{self, Credential, CredentialPool};
use crate::harvester::job::{reference_offset, HarvestJob, HarvestPeriod};
use crate::harvester::runner::{HarvestRunner, RunReport};
use crate::input::read_channel_list;
use crate::output::csv::CsvSummaryWriter;
use crate::output::OutputWriter;
use crate::shutdown::SharedShutdown;
use crate::MembersCategory;

/// Validate batch size (1..=PAGE_SIZE)
fn parse_batch_size(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value == 0 || value > PAGE_SIZE {
        return Err(format!("batch size must be between 1 and {PAGE_SIZE}, got {value}"));
    }
    Ok(value)
}

/// Arguments for a harvest run
#[derive(Parser, Debug)]
pub struct HarvestArgs {
    /// Channel list CSV (column `channel_url`, or the first column)
    #[arg(long)]
    pub input: PathBuf,

    /// Summary CSV to write
    #[arg(long, default_value = "channel_stats.csv")]
    pub output: PathBuf,

    /// First day of the upload period (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub from: String,

    /// Last day of the upload period (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub to: String,

    /// Trailing windows for members-only statistics, in 30-day months
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [1u32, 2u32],
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_WINDOW_MONTHS))
    )]
    pub window_months: Vec<u32>,

    /// Members-only playlist category: all, videos, shorts or live
    #[arg(long, default_value = "all")]
    pub members_category: MembersCategory,

    /// Reference time zone for trailing windows (hours east of UTC)
    #[arg(
        long,
        default_value_t = REFERENCE_OFFSET_HOURS,
        allow_hyphen_values = true,
        value_parser = clap::value_parser!(i32).range(-12..=14)
    )]
    pub reference_offset_hours: i32,

    /// Hard ceiling on pages per listing
    #[arg(long, default_value_t = MAX_PAGES)]
    pub max_pages: usize,

    /// Delay between consecutive pages and detail batches (milliseconds)
    #[arg(long, default_value_t = PAGE_DELAY_MS)]
    pub page_delay_ms: u64,

    /// Video ids per detail request (max 50)
    #[arg(long, default_value_t = BATCH_SIZE, value_parser = parse_batch_size)]
    pub batch_size: usize,

    /// Retries after a transient failure
    #[arg(long, default_value_t = MAX_RETRIES, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub max_retries: u32,

    /// Backoff base; retry n waits base * 2^n (milliseconds)
    #[arg(long, default_value_t = INITIAL_BACKOFF_MS)]
    pub backoff_base_ms: u64,

    /// JSON file holding API keys
    #[arg(long, default_value = "environment.json")]
    pub credentials_file: PathBuf,

    /// Entry of the credentials file holding a key or a list of keys
    #[arg(long, default_value = "api_keys")]
    pub credentials_key: String,

    /// Comma-separated API keys; take precedence over the credentials file
    #[arg(long, env = "HARVEST_API_KEYS", hide_env_values = true)]
    pub api_keys: Option<String>,

    /// Expose Prometheus metrics on this address (e.g., 127.0.0.1:9090)
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl HarvestArgs {
    /// Tunables from the command line
    pub fn harvest_config(&self) -> HarvestConfig {
        let delay = Duration::from_millis(self.page_delay_ms);
        HarvestConfig {
            max_pages: self.max_pages,
            page_delay: delay,
            batch_size: self.batch_size,
            batch_delay: delay,
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }

    /// Job settings from the command line
    pub fn build_job(&self) -> Result<HarvestJob, CliError> {
        let period = HarvestPeriod::parse(&self.from, &self.to)?;
        let job = HarvestJob::new(period)
            .with_window_months(&self.window_months)?
            .with_members_category(self.members_category)
            .with_reference_offset(reference_offset(self.reference_offset_hours)?)
            .with_config(self.harvest_config());
        Ok(job)
    }

    /// Credentials from `--api-keys`/`HARVEST_API_KEYS`, else the credentials file
    pub fn load_credentials(&self) -> Result<Vec<Credential>, CliError> {
        let credentials = match &self.api_keys {
            Some(raw) => credentials::parse_key_list(raw)?,
            None => credentials::load_from_json(&self.credentials_file, &self.credentials_key)?,
        };
        if credentials.is_empty() {
            return Err(CliError::ConfigurationError(
                "no API keys configured".to_string(),
            ));
        }
        Ok(credentials)
    }

    /// Execute the harvest command
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        if let Some(addr) = self.metrics_addr {
            crate::metrics::init_metrics(addr)
                .await
                .map_err(|e| CliError::ConfigurationError(e.to_string()))?;
        }

        let job = self.build_job()?;
        let credentials = self.load_credentials()?;
        let references = read_channel_list(&self.input)?;

        let http = build_http_client()?;
        let pool = CredentialPool::new(credentials, move |credential: &Credential| {
            YouTubeHttpClient::new(http.clone(), credential.clone())
        })?;

        let mut writer = CsvSummaryWriter::new(&self.output, &job.windows)?;

        let progress = create_progress_bar(references.len() as u64, cli.output_format);
        let runner = HarvestRunner::new(Arc::new(pool), job)
            .with_shutdown(shutdown)
            .with_progress(progress.clone());

        info!(
            input = %self.input.display(),
            output = %self.output.display(),
            "Harvest started"
        );
        let result = runner.run(&references, &mut writer).await;
        progress.finish_and_clear();

        // Close even after a failed run so completed rows reach the disk.
        let closed = writer.close();
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                error!("Harvest failed: {}", e);
                if let Err(close_err) = closed {
                    warn!("Failed to close output: {}", close_err);
                }
                return Err(e.into());
            }
        };
        closed?;

        match cli.output_format {
            OutputFormat::Json => output_json(self, &report)?,
            OutputFormat::Human => output_human(self, &report),
        }
        Ok(())
    }
}

fn output_json(args: &HarvestArgs, report: &RunReport) -> Result<(), CliError> {
    let output = serde_json::json!({
        "success": report.is_complete(),
        "output_path": args.output.display().to_string(),
        "from": args.from,
        "to": args.to,
        "total": report.total,
        "processed": report.processed,
        "skipped": report.skipped,
        "unprocessed": report.unprocessed(),
        "stop_reason": report.stop_reason,
    });
    let rendered = serde_json::to_string(&output)
        .map_err(|e| CliError::InvalidArgument(format!("Failed to render report: {e}")))?;
    println!("{rendered}");
    Ok(())
}

fn output_human(args: &HarvestArgs, report: &RunReport) {
    match report.stop_reason {
        None => println!("\nHarvest completed successfully!"),
        Some(reason) => println!("\nHarvest stopped early: {reason}"),
    }
    println!("Period: {} to {}", args.from, args.to);
    println!("Output: {}", args.output.display());
    println!("Channels written: {}/{}", report.processed, report.total);
    if !report.skipped.is_empty() {
        println!("Channels skipped: {}", report.skipped.len());
        for skipped in &report.skipped {
            println!("  - {}: {}", skipped.reference, skipped.reason);
        }
    }
    if report.unprocessed() > 0 {
        println!("Channels not reached: {}", report.unprocessed());
    }
}

/// Create progress bar with style; hidden for JSON output
fn create_progress_bar(total: u64, format: OutputFormat) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
