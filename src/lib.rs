//! # bundler-export: Bundler v0.3 export for structure-from-motion reconstructions
//!
//! This crate writes a reconstruction (cameras, 3D points and their image
//! observations) as the legacy Bundler file pair read by dense
//! reconstruction tools such as PMVS and CMVS:
//!
//! - `bundle.out`: camera intrinsics and poses, then points with observations
//! - `list.txt`: one image name per camera, with an optional focal prior
//!
//! ## Architecture
//!
//! - `core`: Reconstruction data structures (views, tracks, cameras)
//! - `io`: COLMAP parsing and Bundler export
//!
//! Export is a three stage pipeline: select the estimated part of the scene,
//! write the image list, write the bundle file (converting to Bundler's
//! camera and pixel conventions on the way).

// Core data structures
pub mod core;

// I/O operations (COLMAP, Bundler)
pub mod io;

// Re-export commonly used types at crate root for convenience
pub use crate::core::{Camera, CameraIntrinsicsPrior, Reconstruction, Track, View};
pub use crate::io::{write_bundler_files, ExportError, ExportSummary, LoadError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
