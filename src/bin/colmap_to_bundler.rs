//! colmap-to-bundler: Convert a COLMAP sparse model to Bundler v0.3 files
//!
//! Usage:
//!   colmap-to-bundler --sparse-dir path/to/sparse/0 --bundle bundle.out --lists list.txt

use anyhow::Context;
use bundler_export::io::{load_colmap_reconstruction, write_bundler_files};
use bundler_export::CameraIntrinsicsPrior;
use clap::{Parser, ValueEnum};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "colmap-to-bundler", version, about = "Export a COLMAP sparse model as Bundler files")]
struct CliArgs {
    /// COLMAP sparse model directory (cameras.bin, images.bin, points3D.bin).
    #[arg(long, value_name = "DIR")]
    sparse_dir: PathBuf,
    /// Output bundle file.
    #[arg(long, value_name = "FILE", default_value = "bundle.out")]
    bundle: PathBuf,
    /// Output image list file.
    #[arg(long, value_name = "FILE", default_value = "list.txt")]
    lists: PathBuf,
    /// Write each calibrated focal length into the image list.
    #[arg(long)]
    focal_priors: bool,
    /// Log verbosity level (overrides RUST_LOG).
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logger(&resolve_log_level(&args));

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> anyhow::Result<()> {
    info!("colmap-to-bundler v{}", bundler_export::VERSION);

    let mut reconstruction = load_colmap_reconstruction(&args.sparse_dir)
        .with_context(|| format!("failed to load COLMAP model from {}", args.sparse_dir.display()))?;
    info!(
        "Loaded {} images and {} points from {}",
        reconstruction.num_views(),
        reconstruction.num_tracks(),
        args.sparse_dir.display()
    );

    if args.focal_priors {
        for view_id in reconstruction.view_ids() {
            if let Some(view) = reconstruction.view_mut(view_id) {
                let prior = CameraIntrinsicsPrior {
                    focal_length: Some(view.camera().focal_length()),
                    ..view.camera_intrinsics_prior().clone()
                };
                view.set_camera_intrinsics_prior(prior);
            }
        }
    }

    write_bundler_files(&reconstruction, &args.lists, &args.bundle)
        .context("failed to export Bundler files")?;
    Ok(())
}

fn resolve_log_level(args: &CliArgs) -> String {
    if let Some(level) = args.log_level {
        return level.as_str().to_string();
    }

    if let Ok(level) = std::env::var("RUST_LOG") {
        if !level.trim().is_empty() {
            return level;
        }
    }

    "info".to_string()
}

fn init_logger(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder.target(env_logger::Target::Stderr);
    builder.filter_level(log::LevelFilter::Info);
    builder.parse_filters(level);

    if let Err(err) = builder.try_init() {
        eprintln!("Failed to initialize logger: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["colmap-to-bundler", "--sparse-dir", "sparse/0"]);
        assert_eq!(args.sparse_dir, PathBuf::from("sparse/0"));
        assert_eq!(args.bundle, PathBuf::from("bundle.out"));
        assert_eq!(args.lists, PathBuf::from("list.txt"));
        assert!(!args.focal_priors);
    }

    #[test]
    fn test_log_level_flag_wins() {
        let args = CliArgs::parse_from([
            "colmap-to-bundler",
            "--sparse-dir",
            "s",
            "--log-level",
            "debug",
        ]);
        assert_eq!(resolve_log_level(&args), "debug");
    }

    #[test]
    fn test_sparse_dir_is_required() {
        assert!(CliArgs::try_parse_from(["colmap-to-bundler"]).is_err());
    }
}
