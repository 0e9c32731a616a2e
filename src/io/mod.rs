//! I/O operations for loading and exporting reconstructions.
//!
//! This module handles all file format parsing and export:
//! - COLMAP binary format (cameras, images, points3D) as input
//! - Bundler v0.3 bundle file and image list as output

pub mod bundler;
mod colmap;
pub mod text;

// Re-export public types and functions
pub use bundler::{
    create_estimated_subreconstruction, write_bundle_file, write_bundler_files, write_lists_file,
    ExportError, ExportSummary,
};
pub use colmap::{load_colmap_reconstruction, LoadError};
