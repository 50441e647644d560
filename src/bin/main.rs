//! CLI binary for the GPMF parser
//!
//! Provides the `gpmf2gpx` command line: extract GPX tracks from GoPro
//! MP4 files in a directory, and merge previously written GPX files.

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, Command};
use glob::glob;
use gpmf_parser::{decode_gpmf, export, mp4};
use log::{info, warn};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let matches = Command::new("gpmf2gpx")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract and merge GPX telemetry from GoPro videos (GPMF).")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("extract")
                .about("Extract GPX tracks from all GoPro .MP4 files in a directory")
                .arg(
                    Arg::new("dir")
                        .help("Directory containing .MP4 files (each produces one .gpx)")
                        .required(true)
                        .value_name("DIR"),
                )
                .arg(
                    Arg::new("output-dir")
                        .long("output-dir")
                        .help("Directory for GPX output files (default: DIR/outputs)")
                        .value_name("DIR"),
                ),
        )
        .subcommand(
            Command::new("merge")
                .about("Merge .gpx files in a directory into a single multi-segment track")
                .arg(
                    Arg::new("dir")
                        .help("Directory containing .gpx files to merge")
                        .required(true)
                        .value_name("DIR"),
                )
                .arg(
                    Arg::new("optimize")
                        .long("optimize")
                        .help("Strip points to lat/lon only")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match matches.subcommand() {
        Some(("extract", sub)) => {
            let dir = PathBuf::from(sub.get_one::<String>("dir").expect("required arg"));
            let output_dir = sub
                .get_one::<String>("output-dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| dir.join("outputs"));
            cmd_extract(&dir, &output_dir)
        }
        Some(("merge", sub)) => {
            let dir = PathBuf::from(sub.get_one::<String>("dir").expect("required arg"));
            cmd_merge(&dir, sub.get_flag("optimize"))
        }
        _ => unreachable!("subcommand required"),
    }
}

fn cmd_extract(dir: &Path, output_dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("directory not found: {}", dir.display());
    }

    let pattern = format!("{}/*.[mM][pP]4", dir.display());
    let mut videos: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("invalid glob pattern '{pattern}'"))?
        .filter_map(|entry| entry.ok())
        .collect();
    videos.sort();

    if videos.is_empty() {
        bail!("no MP4 files found in {}", dir.display());
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create output directory {}", output_dir.display()))?;

    let mut written = 0usize;
    for video in &videos {
        match extract_one(video, output_dir) {
            Ok(Some(gpx_path)) => {
                info!("wrote {}", gpx_path.display());
                written += 1;
            }
            Ok(None) => warn!("no GPMF stream found in {}", video.display()),
            Err(e) => warn!("failed to process {}: {e:#}; continuing", video.display()),
        }
    }

    if written == 0 {
        bail!(
            "no GPX files produced from {} video(s) in {}",
            videos.len(),
            dir.display()
        );
    }
    info!("wrote {written} GPX file(s) to {}", output_dir.display());
    Ok(())
}

fn extract_one(video: &Path, output_dir: &Path) -> Result<Option<PathBuf>> {
    let Some(stream_index) = mp4::find_gpmf_stream(video)? else {
        return Ok(None);
    };
    let data = mp4::extract_gpmf_stream(video, stream_index)?;
    let decoded = decode_gpmf(&data)
        .with_context(|| format!("decoding GPMF from {}", video.display()))?;

    if let Some(name) = &decoded.device.name {
        info!("{}: recorded by {}", video.display(), name.trim());
    }
    for warning in &decoded.warnings {
        warn!("{}: {}", video.display(), warning);
    }

    let base = video
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    let gpx_path = output_dir.join(format!("{base}.gpx"));
    export::write_gpx(&decoded.track, &gpx_path)?;
    Ok(Some(gpx_path))
}

fn cmd_merge(dir: &Path, optimize: bool) -> Result<()> {
    if !dir.is_dir() {
        bail!("directory not found: {}", dir.display());
    }
    let output_path = export::merge_gpx_dir(dir, optimize)
        .with_context(|| format!("merging GPX files in {}", dir.display()))?;
    info!("merged GPX written to {}", output_path.display());
    Ok(())
}
