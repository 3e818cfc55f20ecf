//! Gaze Pipeline CLI Application
//!
//! This is the command-line interface for the gaze pipeline.
//! It uses the gaze-pipeline library and adds:
//! - TOML configuration of the experiment and every pipeline stage
//! - Loading recordings from JSON files
//! - Processing many recordings in parallel
//! - Report generation (JSON/TXT)

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

mod config;
mod dataset;
mod report;

use config::AppConfig;
use dataset::Dataset;
use report::{OutputFormat, Report};

/// Gaze Pipeline - Detect and measure saccades in eye-tracking recordings
#[derive(Parser, Debug)]
#[command(name = "gaze-cli")]
#[command(about = "Detect saccades in eye-tracking recordings and compute their properties", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Recording file(s) in addition to those in the config (can be repeated)
    #[arg(short, long, value_name = "FILE")]
    input: Vec<PathBuf>,

    /// Report file (default: [output] path of the config, else stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Report format (default: inferred from the report file extension, else json)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Gaze Pipeline CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using pipeline library v{}", gaze_pipeline::VERSION);

    log::info!("Loading configuration from: {:?}", args.config);
    let config = config::load_config(&args.config)?;
    log::debug!("Configuration loaded successfully");

    run(&args, &config)
}

/// Run every pipeline stage over all recordings and write the report
fn run(args: &Args, config: &AppConfig) -> Result<()> {
    let mut inputs = config.input.files.clone();
    inputs.extend(args.input.iter().cloned());
    if inputs.is_empty() {
        bail!("No recordings given. Use --input or [input] files in {:?}", args.config);
    }

    let experiment = config.experiment.to_experiment()?;
    let velocity = config.velocity.resolve()?;
    let detection = &config.detection;

    let mut dataset = Dataset::load(&inputs, experiment)?;
    dataset
        .pix2deg()?
        .pos2vel(&velocity)?
        .detect_events(&detection.params, detection.eye, detection.clear)?;

    if !config.properties.names.is_empty() {
        dataset.compute_event_properties(&config.properties.names, detection.eye)?;
    }

    let report = Report::from_dataset(&dataset);
    log::info!(
        "Processed {} recordings, {} events",
        dataset.len(),
        report.total_events
    );

    let output = args.output.as_ref().or(config.output.path.as_ref());
    let format = match (args.format, config.output.format, output) {
        (Some(format), _, _) | (None, Some(format), _) => format,
        (None, None, Some(path)) => OutputFormat::from_path(path)?,
        (None, None, None) => OutputFormat::Json,
    };

    report
        .write(output.map(PathBuf::as_path), format)
        .with_context(|| format!("Failed to write {:?} report", format))?;

    if let Some(path) = output {
        log::info!("Report written to {:?}", path);
    }
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
