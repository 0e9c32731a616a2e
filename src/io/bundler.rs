//! Bundler v0.3 export (bundle file + image list file).
//!
//! Bundler is read positionally by dense reconstruction tools (PMVS, CMVS),
//! so the layout below must be reproduced line for line:
//!
//! ```text
//! # Bundle file v0.3
//! <num_cameras> <num_points>
//! <camera 0>                      5 lines each:
//!   <f> <k1> <k2>
//!   <R row 0>
//!   <R row 1>
//!   <R row 2>
//!   <t>
//! <point 0>                       3 lines each:
//!   <x> <y> <z>
//!   <r> <g> <b>
//!   <k> <camera> <key> <u> <v> ...
//! ```
//!
//! Bundler cameras look down -z with y up, and its pixel coordinates are
//! centered on the principal point with y up. Our cameras look down +z with
//! y down, so rotations and translations are flipped by diag(1, -1, -1) and
//! observations are re-centered with their y axis negated.

use crate::core::{Reconstruction, ViewId};
use crate::io::text::{default_precision, Full, Row};
use log::{debug, error, info};
use nalgebra::{Matrix3, Vector3};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// First line of every bundle file.
pub const BUNDLE_HEADER: &str = "# Bundle file v0.3";

/// Placeholder RGB; colors are not tracked.
const PLACEHOLDER_COLOR: &str = "255 255 255";

/// Placeholder for the SIFT keypoint count (list file) and keypoint
/// index (bundle file); keypoint files are not written.
const PLACEHOLDER_KEYPOINT: u32 = 0;

/// Minimum number of exported views a track needs to be written.
const MIN_TRACK_VIEWS: usize = 2;

/// Errors that can occur when writing Bundler files.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot open {} for writing: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// What `write_bundler_files` exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub num_views: usize,
    pub num_tracks: usize,
}

/// Axis flip from our camera convention to Bundler's.
pub fn to_bundler_axes() -> Matrix3<f64> {
    Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0))
}

/// Copy of `reconstruction` holding only what Bundler can represent.
///
/// Keeps estimated views, then keeps estimated tracks that are still
/// observed by at least two of those views. The input is never modified.
pub fn create_estimated_subreconstruction(reconstruction: &Reconstruction) -> Reconstruction {
    let mut subreconstruction = reconstruction.clone();

    let mut removed_views = 0;
    for view_id in subreconstruction.view_ids() {
        let estimated = subreconstruction
            .view(view_id)
            .map_or(false, |view| view.is_estimated());
        if !estimated {
            subreconstruction.remove_view(view_id);
            removed_views += 1;
        }
    }

    let mut removed_tracks = 0;
    for track_id in subreconstruction.track_ids() {
        let usable = subreconstruction
            .track(track_id)
            .map_or(false, |track| {
                track.is_estimated() && track.num_views() >= MIN_TRACK_VIEWS
            });
        if !usable {
            subreconstruction.remove_track(track_id);
            removed_tracks += 1;
        }
    }

    debug!(
        "Estimated subreconstruction: kept {} views / {} tracks, dropped {} views / {} tracks",
        subreconstruction.num_views(),
        subreconstruction.num_tracks(),
        removed_views,
        removed_tracks
    );

    subreconstruction
}

/// Write the image list: one line per view, `<name>[ 0 <focal>]`.
///
/// The focal length is only written when the view's prior has one.
pub fn write_lists<W: Write>(reconstruction: &Reconstruction, out: &mut W) -> io::Result<()> {
    for (_, view) in reconstruction.views() {
        write!(out, "{}", view.name())?;
        if let Some(focal_length) = view.camera_intrinsics_prior().focal_length {
            write!(
                out,
                " {} {}",
                PLACEHOLDER_KEYPOINT,
                default_precision(focal_length)
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Write the bundle body for an already-filtered reconstruction.
///
/// # Panics
///
/// If a track is observed by a view that is not part of `reconstruction`,
/// or a view lacks the feature for a track it observes. Neither can happen
/// for the output of `create_estimated_subreconstruction`.
pub fn write_bundle<W: Write>(reconstruction: &Reconstruction, out: &mut W) -> io::Result<()> {
    let flip = to_bundler_axes();

    writeln!(out, "{}", BUNDLE_HEADER)?;
    writeln!(
        out,
        "{} {}",
        reconstruction.num_views(),
        reconstruction.num_tracks()
    )?;

    // Cameras first; their position in the file is the index points refer to.
    let mut view_index: HashMap<ViewId, usize> =
        HashMap::with_capacity(reconstruction.num_views());
    for (index, (view_id, view)) in reconstruction.views().enumerate() {
        view_index.insert(view_id, index);

        let camera = view.camera();
        writeln!(
            out,
            "{} {} {}",
            default_precision(camera.focal_length()),
            default_precision(camera.radial_distortion_1()),
            default_precision(camera.radial_distortion_2())
        )?;

        let rotation = flip * camera.rotation_matrix();
        for row in rotation.row_iter() {
            writeln!(out, "{}", Row(&[row[0], row[1], row[2]]))?;
        }

        let translation = flip * camera.translation();
        writeln!(out, "{}", Row(translation.as_slice()))?;
    }

    for (track_id, track) in reconstruction.tracks() {
        let position = track.position();
        writeln!(out, "{}", Row(position.as_slice()))?;
        writeln!(out, "{}", PLACEHOLDER_COLOR)?;

        write!(out, "{}", track.num_views())?;
        for &view_id in track.view_ids() {
            let index = *view_index.get(&view_id).unwrap_or_else(|| {
                panic!("track {track_id} is observed by view {view_id}, which was not exported")
            });
            let view = reconstruction.view(view_id).unwrap_or_else(|| {
                panic!("track {track_id} is observed by missing view {view_id}")
            });
            let feature = view.feature(track_id).unwrap_or_else(|| {
                panic!("view {view_id} has no feature for track {track_id} it observes")
            });

            let camera = view.camera();
            let u = feature.x - camera.principal_point_x();
            let v = -(feature.y - camera.principal_point_y());
            write!(
                out,
                " {} {} {} {}",
                index,
                PLACEHOLDER_KEYPOINT,
                Full(u),
                Full(v)
            )?;
        }
        writeln!(out)?;
    }

    Ok(())
}

/// Write the image list of `reconstruction` to `path`.
///
/// `reconstruction` is written as-is; filter it first with
/// `create_estimated_subreconstruction`.
pub fn write_lists_file(reconstruction: &Reconstruction, path: &Path) -> Result<(), ExportError> {
    let mut out = create(path)?;
    write_lists(reconstruction, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Write the bundle file of `reconstruction` to `path`.
///
/// `reconstruction` is written as-is; filter it first with
/// `create_estimated_subreconstruction`.
pub fn write_bundle_file(reconstruction: &Reconstruction, path: &Path) -> Result<(), ExportError> {
    let mut out = create(path)?;
    write_bundle(reconstruction, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Export the estimated part of `reconstruction` as a Bundler list/bundle pair.
///
/// The list file is written first; if it cannot be written the bundle file
/// is not attempted. Nothing is rolled back on failure.
pub fn write_bundler_files(
    reconstruction: &Reconstruction,
    lists_path: &Path,
    bundle_path: &Path,
) -> Result<ExportSummary, ExportError> {
    let estimated = create_estimated_subreconstruction(reconstruction);

    write_lists_file(&estimated, lists_path)?;
    write_bundle_file(&estimated, bundle_path)?;

    let summary = ExportSummary {
        num_views: estimated.num_views(),
        num_tracks: estimated.num_tracks(),
    };
    info!(
        "Wrote {} cameras and {} points to {} (image list: {})",
        summary.num_views,
        summary.num_tracks,
        bundle_path.display(),
        lists_path.display()
    );
    Ok(summary)
}

fn create(path: &Path) -> Result<BufWriter<File>, ExportError> {
    match File::create(path) {
        Ok(file) => Ok(BufWriter::new(file)),
        Err(source) => {
            error!("Cannot open the file: {} for writing.", path.display());
            Err(ExportError::Open {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}
