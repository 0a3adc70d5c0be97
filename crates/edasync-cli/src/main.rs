use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edasync_lib::{
    align::window_range,
    config::{load_config, IngestSettings, PipelineConfig},
    io::video::start_time_from_filename,
    metrics::stats::summarize,
    pipeline::{ingest_bytes, process_upload, UploadRequest},
};
use env_logger::Env;
use log::info;
use serde_json::json;
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "edasync",
    version,
    about = "EDA recording normalization and video alignment"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// TOML pipeline configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the display zone (IANA name, e.g. US/Eastern)
    #[arg(long, global = true)]
    zone: Option<String>,

    /// Override the suffix printed after display times
    #[arg(long, global = true)]
    zone_label: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a CSV recording and align an optional video; prints the payload JSON
    Process {
        /// CSV file; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
        /// Original filename of the companion video
        #[arg(long)]
        video_name: Option<String>,
        /// Manual video start time (HH:MM or HH:MM:SS)
        #[arg(long)]
        video_start: Option<String>,
        /// Video playback length in seconds, to scope window statistics
        #[arg(long)]
        video_duration: Option<f64>,
    },
    /// Extract the start time embedded in a video filename
    VideoStart {
        #[arg(long)]
        filename: String,
    },
    /// Statistics for the samples inside [offset, offset + duration] seconds
    Window {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, allow_hyphen_values = true)]
        offset: f64,
        #[arg(long)]
        duration: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    let settings = load_settings(&cli)?;
    match cli.command {
        Commands::Process {
            input,
            video_name,
            video_start,
            video_duration,
        } => cmd_process(
            &settings,
            input.as_deref(),
            video_name.as_deref(),
            video_start.as_deref(),
            video_duration,
        )?,
        Commands::VideoStart { filename } => cmd_video_start(&filename)?,
        Commands::Window {
            input,
            offset,
            duration,
        } => cmd_window(&settings, input.as_deref(), offset, duration)?,
    }
    Ok(())
}

fn load_settings(cli: &Cli) -> Result<IngestSettings> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(zone) = &cli.zone {
        config.display_zone = zone.clone();
    }
    if let Some(label) = &cli.zone_label {
        config.zone_label = label.clone();
    }
    Ok(config.resolve()?)
}

fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    match input {
        Some(path) => fs::read(path).with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn cmd_process(
    settings: &IngestSettings,
    input: Option<&Path>,
    video_name: Option<&str>,
    video_start: Option<&str>,
    video_duration: Option<f64>,
) -> Result<()> {
    let csv = read_input(input)?;
    let request = UploadRequest {
        csv: &csv,
        video_filename: video_name,
        video_start_time: video_start,
        video_duration_seconds: video_duration,
    };
    let response = process_upload(&request, settings)?;
    info!("{} data points", response.data_points);
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

fn cmd_video_start(filename: &str) -> Result<()> {
    let start_time = start_time_from_filename(filename);
    println!(
        "{}",
        json!({ "filename": filename, "start_time": start_time })
    );
    Ok(())
}

fn cmd_window(
    settings: &IngestSettings,
    input: Option<&Path>,
    offset: f64,
    duration: f64,
) -> Result<()> {
    let csv = read_input(input)?;
    let ingested = ingest_bytes(&csv, settings)?;
    let range = window_range(&ingested.series, offset, duration);
    let stats = summarize(&ingested.series, range.clone());
    println!(
        "{}",
        json!({
            "start_index": range.start,
            "end_index": range.end,
            "stats": stats,
        })
    );
    Ok(())
}
