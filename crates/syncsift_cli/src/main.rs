//! Syncsift command line interface.
//!
//! Chunks a source recording, scores each chunk with the configured
//! sync oracle, sorts the chunks into quality partitions and writes a
//! JSON batch report.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use syncsift_core::batch::BatchScheduler;
use syncsift_core::config::{ConfigManager, Settings};
use syncsift_core::extract::{probe_source, FfmpegExtractor};
use syncsift_core::models::ThresholdPreset;
use syncsift_core::oracle::SyncNetOracle;
use syncsift_core::organize::{OutputOrganizer, ACCEPTED_DIR, REJECTED_DIR};
use syncsift_core::planner::plan_chunks;
use syncsift_core::report::{save_report, REPORT_FILE_NAME};

#[derive(Parser, Debug)]
#[command(name = "syncsift", version)]
#[command(about = "Quality-gated AV sync filtering for training data", long_about = None)]
struct Args {
    /// Source recording to chunk and filter
    input: PathBuf,

    /// Output directory for quality partitions and the report
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Config file (created with defaults if missing)
    #[arg(short, long, default_value = "syncsift.toml")]
    config: PathBuf,

    /// Chunk duration in seconds
    #[arg(long)]
    chunk_secs: Option<f64>,

    /// Overlap between consecutive chunks in seconds
    #[arg(long)]
    overlap_secs: Option<f64>,

    /// Threshold preset: strict, high, medium, relaxed, none
    #[arg(short, long)]
    preset: Option<ThresholdPreset>,

    /// Override the minimum confidence gate
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Override the maximum absolute offset gate, in frames
    #[arg(long)]
    max_abs_offset: Option<i64>,

    /// Upper bound on concurrent workers
    #[arg(long)]
    max_workers: Option<usize>,

    /// Keep per-chunk scratch directories after processing
    #[arg(long)]
    keep_scratch: bool,

    /// Score and report without moving artifacts into partitions
    #[arg(long)]
    report_only: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ConfigManager::new(&args.config);
    config
        .load_or_create()
        .with_context(|| format!("load config {}", args.config.display()))?;
    apply_overrides(config.settings_mut(), &args);

    let settings = config.settings().clone();
    let _log_guard = init_tracing(&settings, args.verbose, &config.logs_folder())?;
    info!("syncsift v{}", syncsift_core::version());

    let extract_timeout = Duration::from_secs(settings.extract.timeout_secs);
    let source = probe_source(&settings.extract.ffprobe, &args.input, extract_timeout)
        .with_context(|| format!("probe {}", args.input.display()))?;
    info!(
        "source {}: {:.2}s",
        source.path.display(),
        source.duration_secs
    );

    let chunks: Vec<_> = plan_chunks(
        source.duration_secs,
        settings.planner.chunk_secs,
        settings.planner.overlap_secs,
    )?
    .collect();
    if chunks.is_empty() {
        bail!("{} has no usable duration to chunk", args.input.display());
    }
    info!(
        "planned {} chunks of {:.1}s with {:.1}s overlap",
        chunks.len(),
        settings.planner.chunk_secs,
        settings.planner.overlap_secs
    );

    let extractor = FfmpegExtractor::new(&settings.extract.ffmpeg).with_timeout(extract_timeout);
    let oracle = SyncNetOracle::new(&settings.oracle.command)
        .with_extra_args(settings.oracle.extra_args.clone())
        .with_timeout(Duration::from_secs(settings.oracle.timeout_secs))
        .with_min_face_size(settings.oracle.min_face_size)
        .with_min_track(settings.oracle.min_track)
        .with_preserve_outputs(settings.oracle.preserve_outputs);

    let output_root = PathBuf::from(&settings.paths.output_folder);
    let mut scheduler = BatchScheduler::new(
        Box::new(extractor),
        Box::new(oracle),
        settings.filter.resolve(),
        &settings.paths.scratch_folder,
    )
    .with_max_workers(settings.scheduler.max_workers)
    .with_keep_scratch(settings.scheduler.keep_scratch);
    if !args.report_only {
        scheduler = scheduler.with_organizer(OutputOrganizer::new(&output_root));
    }

    let report = scheduler.run(&source, chunks)?;

    fs::create_dir_all(&output_root)
        .with_context(|| format!("create output dir {}", output_root.display()))?;
    let report_path = output_root.join(REPORT_FILE_NAME);
    save_report(&report, &report_path)?;

    println!();
    println!(
        "Processed {} chunks from {}",
        report.total_chunks,
        source.path.display()
    );
    println!("  accepted:          {}", report.accepted);
    println!("  rejected:          {}", report.rejected);
    println!("  no face detected:  {}", report.no_faces_detected);
    println!("  processing failed: {}", report.processing_failed);
    if !args.report_only {
        println!(
            "Partitions: {} and {}",
            output_root.join(ACCEPTED_DIR).display(),
            output_root.join(REJECTED_DIR).display()
        );
    }
    println!("Report: {}", report_path.display());

    Ok(())
}

/// Fold command line flags over the loaded settings.
fn apply_overrides(settings: &mut Settings, args: &Args) {
    if let Some(output_dir) = &args.output_dir {
        settings.paths.output_folder = output_dir.to_string_lossy().into_owned();
    }
    if let Some(chunk_secs) = args.chunk_secs {
        settings.planner.chunk_secs = chunk_secs;
    }
    if let Some(overlap_secs) = args.overlap_secs {
        settings.planner.overlap_secs = overlap_secs;
    }
    if let Some(preset) = args.preset {
        settings.filter.preset = preset;
    }
    if let Some(min_confidence) = args.min_confidence {
        settings.filter.min_confidence = Some(min_confidence);
    }
    if let Some(max_abs_offset) = args.max_abs_offset {
        settings.filter.max_abs_offset = Some(max_abs_offset);
    }
    if let Some(max_workers) = args.max_workers {
        settings.scheduler.max_workers = max_workers;
    }
    if args.keep_scratch {
        settings.scheduler.keep_scratch = true;
    }
}

/// Initialize the tracing subscriber.
///
/// Logs go to stderr; with `log_to_file` enabled they also go to
/// `syncsift.log` in the logs folder through a non-blocking writer
/// whose guard must stay alive for the life of the process.
fn init_tracing(
    settings: &Settings,
    verbose: bool,
    logs_folder: &Path,
) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose {
        "debug"
    } else {
        settings.logging.level.as_str()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if settings.logging.log_to_file {
        fs::create_dir_all(logs_folder)
            .with_context(|| format!("create logs dir {}", logs_folder.display()))?;
        let appender = tracing_appender::rolling::never(logs_folder, "syncsift.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        Ok(None)
    }
}
