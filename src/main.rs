//! CLI entry point for the GTFS-RT to XES converter.
//!
//! Converts collected vehicle-position snapshots of one or more feeds into
//! XES event logs, or inspects what a conversion would read.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gtfs_rt_xes::config::ConvertConfig;
use gtfs_rt_xes::convert::{convert_feed, inspect_feed};
use gtfs_rt_xes::output::{SummaryFormat, append_summary_row, log_summary};
use gtfs_rt_xes::publish::{LocalDirSink, LogSink, S3Sink, publish};
use gtfs_rt_xes::stats::RunStats;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_xes")]
#[command(about = "Turn collected GTFS-RT vehicle snapshots into XES event logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FeedArgs {
    /// Feed name, e.g. ToeiBus (repeat for several feeds)
    #[arg(short, long = "feed", value_name = "NAME", required = true)]
    feeds: Vec<String>,

    /// Directory containing the collected .jsonl snapshot files
    #[arg(short, long, env = "INPUT_DIR", default_value = "data")]
    input_dir: PathBuf,

    /// Directory containing a `<feed>-static` GTFS directory per feed
    #[arg(short, long, env = "STATIC_ROOT", default_value = ".")]
    static_root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert snapshot files into one XES log per feed
    Convert {
        #[command(flatten)]
        feeds: FeedArgs,

        /// Directory to write `<feed>.xes` files to. Must exist and differ from
        /// --input-dir, since input selection by feed name would match the logs
        #[arg(short, long, env = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Maximum number of feeds converted at the same time
        #[arg(short, long, default_value_t = 1)]
        concurrency: usize,

        /// Optional: CSV file to append per-feed run statistics to
        #[arg(long)]
        summary_csv: Option<PathBuf>,

        /// Log each feed's run statistics as JSON at info level
        #[arg(long, default_value_t = false)]
        json_summary: bool,

        /// Optional: S3 bucket to mirror the XES files to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Optional: Gzip compress XES files before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Show the input files and reference data a conversion would use
    Inspect {
        #[command(flatten)]
        feeds: FeedArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_rt_xes.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_xes.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            feeds,
            output_dir,
            concurrency,
            summary_csv,
            json_summary,
            s3_bucket,
            gzip,
        } => {
            let configs: Vec<ConvertConfig> = feeds
                .feeds
                .iter()
                .map(|feed| {
                    ConvertConfig::for_feed(feed, &feeds.input_dir, &feeds.static_root, &output_dir)
                })
                .collect();

            // Configuration problems abort before any feed is read
            for config in &configs {
                config
                    .validate()
                    .with_context(|| format!("invalid configuration for feed {}", config.feed_name))?;
            }

            let mut sinks: Vec<Box<dyn LogSink>> = vec![Box::new(LocalDirSink::new(&output_dir))];
            if let Some(ref bucket) = s3_bucket {
                info!(bucket = %bucket, gzip, "S3 upload enabled");
                sinks.push(Box::new(S3Sink::from_env(bucket, gzip).await));
            }

            let summary = Summary {
                csv: summary_csv,
                format: if json_summary {
                    SummaryFormat::Json
                } else {
                    SummaryFormat::Debug
                },
            };
            convert_all_feeds(configs, concurrency, Arc::new(sinks), summary).await?;
        }
        Commands::Inspect { feeds } => {
            let mut failed = 0;
            for feed in &feeds.feeds {
                let config =
                    ConvertConfig::for_feed(feed, &feeds.input_dir, &feeds.static_root, Path::new(""));
                match inspect_feed(&config) {
                    Ok(inspection) => {
                        for file in &inspection.input_files {
                            info!(feed = %feed, file = %file.display(), "Input file");
                        }
                        info!(
                            feed = %feed,
                            kind = ?config.feed_kind(),
                            input_files = inspection.input_files.len(),
                            trips = inspection.trips,
                            routes = inspection.routes,
                            stops = inspection.stops,
                            stop_times = inspection.stop_times,
                            translations = inspection.translations,
                            duplicate_keys = inspection.duplicates.total(),
                            "Feed summary"
                        );
                    }
                    Err(e) => {
                        let message = format!("{e:#}");
                        error!(feed = %feed, error = %message, "Feed inspection failed");
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} feed(s) could not be inspected");
            }
        }
    }

    Ok(())
}

/// Where and how per-feed statistics are reported.
struct Summary {
    csv: Option<PathBuf>,
    format: SummaryFormat,
}

/// Converts every feed independently, at most `concurrency` at a time, and
/// publishes each finished log to all `sinks`.
#[tracing::instrument(skip_all, fields(feeds = configs.len(), concurrency = concurrency))]
async fn convert_all_feeds(
    configs: Vec<ConvertConfig>,
    concurrency: usize,
    sinks: Arc<Vec<Box<dyn LogSink>>>,
    summary: Summary,
) -> Result<()> {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));

    let mut tasks = vec![];

    for config in configs {
        let sem = semaphore.clone();
        let sinks = sinks.clone();
        let feed_name = config.feed_name.clone();

        let feed_span = tracing::info_span!("convert_feed", feed = %config.feed_name);

        let task = tokio::spawn(
            async move {
                let _permit = sem.acquire_owned().await?;
                info!("Starting conversion");

                let name = config.output_file_name();
                let span = tracing::Span::current();
                let conversion =
                    tokio::task::spawn_blocking(move || span.in_scope(|| convert_feed(&config)))
                        .await??;

                publish(&sinks, &name, conversion.document.clone()).await?;
                Ok::<RunStats, anyhow::Error>(conversion.stats)
            }
            .instrument(feed_span),
        );

        tasks.push((feed_name, task));
    }

    let mut failed = 0;

    // Wait for all tasks to complete
    for (feed_name, task) in tasks {
        let stats = match task.await {
            Ok(Ok(stats)) => {
                if let Err(e) = log_summary(&stats, summary.format) {
                    error!(feed = %feed_name, error = %e, "Failed to log run summary");
                }
                stats
            }
            Ok(Err(e)) => {
                failed += 1;
                let message = format!("{e:#}");
                error!(feed = %feed_name, error = %message, "Feed conversion failed");
                RunStats::from_error(&feed_name, "conversion_error", &message)
            }
            Err(e) => {
                failed += 1;
                error!(feed = %feed_name, error = %e, "Feed conversion task panicked");
                RunStats::from_error(&feed_name, "task_error", &e.to_string())
            }
        };

        if let Some(path) = &summary.csv {
            if let Err(e) = append_summary_row(path, &stats) {
                error!(error = %e, "Failed to write run summary");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} feed(s) failed to convert");
    }

    info!("Finished converting all feeds");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_output_dir_help_mentions_input_dir() {
        let cli = Cli::command();
        let convert = cli.find_subcommand("convert").unwrap();
        let output_dir = convert
            .get_arguments()
            .find(|arg| arg.get_id() == "output_dir")
            .unwrap();
        let help = output_dir.get_help().unwrap().to_string();

        assert!(help.contains("Must exist"), "{help}");
        assert!(help.contains("--input-dir"), "{help}");
    }

    #[test]
    fn test_json_summary_flag() {
        let cli = Cli::try_parse_from([
            "gtfs_rt_xes",
            "convert",
            "--feed",
            "ToeiBus",
            "--output-dir",
            "out",
            "--json-summary",
        ])
        .unwrap();

        match cli.command {
            Commands::Convert {
                json_summary,
                output_dir,
                ..
            } => {
                assert!(json_summary);
                assert_eq!(output_dir, PathBuf::from("out"));
            }
            Commands::Inspect { .. } => panic!("expected convert"),
        }
    }
}
