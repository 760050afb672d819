use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::style;
use img_jpeg::{
    heic_to_jpeg, DEFAULT_OUTPUT_DIR, DEFAULT_QUALITY, DEFAULT_REPORT_NAME, SOURCE_EXTENSION,
    SOURCE_LABEL, TARGET_EXTENSION, TARGET_LABEL,
};
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::progress::set_quiet_mode;
use shared_utils::{
    aggregate, create_progress_bar, list_directory, print_summary_report, resolve_worker_count,
    BatchLayout, ReportWriter, WorkerPool,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "img-jpeg")]
#[command(version, about = "Batch HEIC to JPEG converter that keeps EXIF metadata", long_about = None)]
struct Cli {
    /// Directory holding the .heic files (default: current directory)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Where converted files and the report go (default: INPUT/jpegs)
    #[arg(short, long, value_name = "OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Worker threads (default: logical CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    #[arg(short, long, default_value_t = DEFAULT_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Report file name inside the output directory
    #[arg(long, default_value = DEFAULT_REPORT_NAME)]
    report_name: String,

    /// Leave converted files with the current time instead of the source's
    #[arg(long)]
    no_preserve_timestamps: bool,

    #[arg(short = 'f', long, value_enum, default_value = "human")]
    format: OutputFormat,

    #[arg(short, long)]
    verbose: bool,

    /// Directory for the rolling log file (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::default()
        .with_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_stderr(cli.verbose);
    if let Some(dir) = &cli.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    if let Err(e) = init_logging("img_jpeg", log_config) {
        eprintln!("⚠️  Logging disabled: {:#}", e);
    }

    if cli.format == OutputFormat::Json {
        set_quiet_mode(true);
    }

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let input = match cli.input {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let output_dir = cli
        .output
        .unwrap_or_else(|| input.join(DEFAULT_OUTPUT_DIR));
    let layout = BatchLayout::new(&input, &output_dir, SOURCE_EXTENSION, TARGET_EXTENSION)
        .with_labels(SOURCE_LABEL, TARGET_LABEL);
    let workers = resolve_worker_count(cli.jobs);

    let entries = list_directory(&input)?;
    let matching = entries.iter().filter(|e| layout.matches(&e.name)).count();

    let pool = WorkerPool::new(Arc::new(heic_to_jpeg(cli.quality)), layout.clone(), workers)
        .preserve_timestamps(!cli.no_preserve_timestamps);
    info!(
        input = %input.display(),
        entries = entries.len(),
        matching,
        workers = pool.workers(),
        quality = cli.quality,
        "Starting batch"
    );
    pool.prepare_output_dir()?;

    let report_path = output_dir.join(&cli.report_name);
    let report_writer = ReportWriter::create(&report_path)?;

    let started = Instant::now();
    let batch = pool.submit(entries)?;
    let pb = create_progress_bar(matching as u64, "HEIC → JPG");
    let report = aggregate(batch.outcomes(), &layout, started, Some(&pb));
    pb.finish_and_clear();

    let crashed = batch.join();
    if crashed > 0 {
        warn!(crashed, "Some workers did not exit cleanly");
    }

    report_writer
        .write(&report)
        .with_context(|| format!("Failed to write report {}", report_path.display()))?;
    info!(
        converted = report.summary.succeeded,
        failed = report.summary.failed,
        report = %report_path.display(),
        "Batch finished"
    );

    match cli.format {
        OutputFormat::Human => {
            print_summary_report(&report, "HEIC → JPG");
            println!();
            println!("📝 Report: {}", style(report_path.display()).cyan());
        }
        OutputFormat::Json => {
            let json = report.to_json().context("Failed to serialize summary")?;
            println!("{}", json);
        }
    }

    Ok(())
}
