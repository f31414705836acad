use anyhow::Result;
use clap::{Arg, Command};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

mod config;
mod error;
mod events;
mod extract;
mod ledger;
mod locate;
mod pipeline;
mod probe;
mod report;
mod timestamp;

use crate::config::Config;
use crate::extract::FfmpegCutter;
use crate::pipeline::Pipeline;
use crate::probe::FfprobeProber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("snippet_extractor=info,warn")
        .init();

    let matches = Command::new("Event Snippet Extractor")
        .version("0.1.0")
        .about("Cuts video snippets around spreadsheet-listed event timestamps")
        .arg(
            Arg::new("video-dir")
                .short('d')
                .long("video-dir")
                .value_name("DIR")
                .help("Directory tree searched recursively for video files")
                .required(true),
        )
        .arg(
            Arg::new("events-file")
                .short('e')
                .long("events-file")
                .value_name("FILE")
                .help("Workbook with event timestamps (xlsx/xls/ods)")
                .required(true),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory for snippets and the report"),
        )
        .arg(
            Arg::new("sheets")
                .short('s')
                .long("sheets")
                .value_name("SELECTION")
                .help("Sheets to process: 'all', or 1-based indices/ranges like '1,3-5'")
                .default_value("all"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Explicit configuration file, bypassing the default search paths"),
        )
        .arg(
            Arg::new("lead")
                .long("lead")
                .value_name("SECONDS")
                .help("Seconds of clip included before each event"),
        )
        .arg(
            Arg::new("trail")
                .long("trail")
                .value_name("SECONDS")
                .help("Seconds of clip included after each event"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let video_dir = PathBuf::from(matches.get_one::<String>("video-dir").unwrap());
    let events_file = PathBuf::from(matches.get_one::<String>("events-file").unwrap());
    let sheets = matches.get_one::<String>("sheets").unwrap().clone();

    if matches.get_flag("verbose") {
        info!("Verbose logging enabled");
    }

    // Load configuration, then apply CLI overrides. An explicit --config
    // path must load; only the search-path fallback degrades to defaults.
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(Path::new(path))?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            Config::from_env()
        }),
    };

    if let Some(output_dir) = matches.get_one::<String>("output-dir") {
        config.output.base_dir = PathBuf::from(output_dir);
    }
    if let Some(lead) = matches.get_one::<String>("lead") {
        config.extraction.lead_seconds = lead.parse()?;
    }
    if let Some(trail) = matches.get_one::<String>("trail") {
        config.extraction.trail_seconds = trail.parse()?;
    }
    config.validate()?;

    info!("🚀 Event Snippet Extractor starting...");
    info!("📁 Video directory: {}", video_dir.display());
    info!("📄 Events file: {}", events_file.display());
    info!("📂 Output directory: {}", config.output.base_dir.display());

    if !video_dir.exists() {
        error!("Video directory does not exist: {}", video_dir.display());
        return Err(anyhow::anyhow!("Video directory not found"));
    }
    if !events_file.exists() {
        error!("Events file does not exist: {}", events_file.display());
        return Err(anyhow::anyhow!("Events file not found"));
    }

    let cutter = Box::new(FfmpegCutter::new(config.extraction.cutter_timeout_seconds));
    let mut pipeline = Pipeline::new(config, cutter, Box::new(FfprobeProber));

    let summary = pipeline.run(&events_file, &video_dir, &sheets).await?;

    info!("✅ Snippets created: {}", summary.done);
    info!("⏭️  Skipped (already done): {}", summary.skipped);
    if summary.not_found > 0 {
        warn!("❓ Videos not found: {}", summary.not_found);
    }
    if summary.ambiguous > 0 {
        warn!("⚠️  Ambiguous matches: {}", summary.ambiguous);
    }
    if summary.invalid_rows > 0 {
        warn!("🚫 Invalid rows excluded: {}", summary.invalid_rows);
    }
    if let Some(report_path) = &summary.report_path {
        info!("📊 Report: {}", report_path.display());
    }

    // Best-effort batch: every row was attempted, but reflect failures in
    // the exit status.
    if summary.has_failures() {
        error!("❌ Failed rows: {}", summary.failed);
        std::process::exit(1);
    }

    Ok(())
}
