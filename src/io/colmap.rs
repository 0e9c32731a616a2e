//! COLMAP binary format parser.
//!
//! COLMAP stores sparse reconstruction in binary files:
//! - cameras.bin: Camera intrinsics
//! - images.bin: Camera poses (extrinsics) + 2D keypoints
//! - points3D.bin: 3D points and the keypoints observing them
//!
//! Format spec: https://colmap.github.io/format.html
//!
//! Every registered image becomes an estimated view and every 3D point an
//! estimated track, so a loaded model can be exported directly.

use crate::core::{Camera, Feature, Reconstruction, ReconstructionError, ViewId};
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};
use nalgebra::{Quaternion, UnitQuaternion, Vector3, Vector4};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when loading COLMAP data.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid COLMAP binary format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported camera model: {0}")]
    UnsupportedCameraModel(i32),

    #[error("Inconsistent reconstruction: {0}")]
    Reconstruction(#[from] ReconstructionError),
}

/// Per-image data from images.bin.
#[derive(Debug)]
struct ImageRecord {
    camera_id: u32,
    name: String,
    rotation: UnitQuaternion<f64>,
    translation: Vector3<f64>,
    keypoints: Vec<Feature>,
}

/// Per-point data from points3D.bin.
#[derive(Debug)]
struct PointRecord {
    position: Vector3<f64>,
    /// (image_id, point2d_idx) pairs
    track: Vec<(u32, u32)>,
}

/// Load a COLMAP sparse model as a reconstruction.
///
/// Expected directory structure:
/// ```text
/// sparse/0/
///   cameras.bin
///   images.bin
///   points3D.bin
/// ```
///
/// Views are added in ascending COLMAP image id order, tracks in ascending
/// point id order.
pub fn load_colmap_reconstruction(sparse_dir: &Path) -> Result<Reconstruction, LoadError> {
    let cameras = read_cameras_bin(&mut open(&sparse_dir.join("cameras.bin"))?)?;
    let images = read_images_bin(&mut open(&sparse_dir.join("images.bin"))?)?;
    let points = read_points3d_bin(&mut open(&sparse_dir.join("points3D.bin"))?)?;

    let mut reconstruction = Reconstruction::new();
    let mut view_ids: HashMap<u32, ViewId> = HashMap::with_capacity(images.len());

    let mut image_ids: Vec<u32> = images.keys().copied().collect();
    image_ids.sort_unstable();
    for image_id in image_ids {
        let image = &images[&image_id];
        let intrinsics = cameras.get(&image.camera_id).ok_or_else(|| {
            LoadError::InvalidFormat(format!(
                "image {} references unknown camera {}",
                image_id, image.camera_id
            ))
        })?;

        let view_id = reconstruction.add_view(&image.name)?;
        if let Some(view) = reconstruction.view_mut(view_id) {
            // COLMAP stores world-to-camera (R, t); the center is C = -Rᵀ t
            let rotation = image.rotation.to_rotation_matrix().into_inner();
            let position = -(rotation.transpose() * image.translation);

            let camera = view.camera_mut();
            *camera = intrinsics.clone();
            camera.set_pose(rotation, position);
            view.set_estimated(true);
        }
        view_ids.insert(image_id, view_id);
    }

    let mut point_ids: Vec<u64> = points.keys().copied().collect();
    point_ids.sort_unstable();
    for point_id in point_ids {
        let point = &points[&point_id];
        let track_id = reconstruction.add_track();
        if let Some(track) = reconstruction.track_mut(track_id) {
            track.set_point(Vector4::new(
                point.position.x,
                point.position.y,
                point.position.z,
                1.0,
            ));
            track.set_estimated(true);
        }

        for &(image_id, point2d_idx) in &point.track {
            let dangling = || {
                LoadError::InvalidFormat(format!(
                    "point {} references missing keypoint {} of image {}",
                    point_id, point2d_idx, image_id
                ))
            };
            let view_id = *view_ids.get(&image_id).ok_or_else(dangling)?;
            let feature = *images[&image_id]
                .keypoints
                .get(point2d_idx as usize)
                .ok_or_else(dangling)?;

            reconstruction.add_observation(view_id, track_id, feature)?;
        }
    }

    debug!(
        "Loaded COLMAP model from {}: {} cameras, {} views, {} tracks",
        sparse_dir.display(),
        cameras.len(),
        reconstruction.num_views(),
        reconstruction.num_tracks()
    );

    Ok(reconstruction)
}

fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    Ok(BufReader::new(File::open(path)?))
}

/// Read cameras.bin.
///
/// Binary format (little-endian):
/// - num_cameras: u64
/// - For each camera:
///   - camera_id: u32
///   - model_id: i32 (0=SIMPLE_PINHOLE, 1=PINHOLE, 2=SIMPLE_RADIAL, 3=RADIAL, 4=OPENCV)
///   - width: u64
///   - height: u64
///   - params: [f64; N] (N depends on model)
fn read_cameras_bin<R: Read>(reader: &mut R) -> Result<HashMap<u32, Camera>, LoadError> {
    let num_cameras = reader.read_u64::<LittleEndian>()?;
    let mut cameras = HashMap::new();

    for _ in 0..num_cameras {
        let camera_id = reader.read_u32::<LittleEndian>()?;
        let model_id = reader.read_i32::<LittleEndian>()?;
        let width = reader.read_u64::<LittleEndian>()? as u32;
        let height = reader.read_u64::<LittleEndian>()? as u32;

        let camera = match model_id {
            0 => {
                // SIMPLE_PINHOLE: f, cx, cy
                let [f, cx, cy] = read_params::<_, 3>(reader)?;
                Camera::new(f, cx, cy, width, height)
            }
            1 => {
                // PINHOLE: fx, fy, cx, cy
                let [fx, fy, cx, cy] = read_params::<_, 4>(reader)?;
                warn_anisotropic(camera_id, fx, fy);
                Camera::new(fx, cx, cy, width, height)
            }
            2 => {
                // SIMPLE_RADIAL: f, cx, cy, k
                let [f, cx, cy, k] = read_params::<_, 4>(reader)?;
                let mut camera = Camera::new(f, cx, cy, width, height);
                camera.set_radial_distortion(k, 0.0);
                camera
            }
            3 => {
                // RADIAL: f, cx, cy, k1, k2
                let [f, cx, cy, k1, k2] = read_params::<_, 5>(reader)?;
                let mut camera = Camera::new(f, cx, cy, width, height);
                camera.set_radial_distortion(k1, k2);
                camera
            }
            4 => {
                // OPENCV: fx, fy, cx, cy, k1, k2, p1, p2
                let [fx, fy, cx, cy, k1, k2, p1, p2] = read_params::<_, 8>(reader)?;
                warn_anisotropic(camera_id, fx, fy);
                if p1 != 0.0 || p2 != 0.0 {
                    warn!(
                        "Camera {}: tangential distortion ({}, {}) cannot be exported and is dropped",
                        camera_id, p1, p2
                    );
                }
                let mut camera = Camera::new(fx, cx, cy, width, height);
                camera.set_radial_distortion(k1, k2);
                camera
            }
            _ => return Err(LoadError::UnsupportedCameraModel(model_id)),
        };

        cameras.insert(camera_id, camera);
    }

    Ok(cameras)
}

fn read_params<R: Read, const N: usize>(reader: &mut R) -> Result<[f64; N], LoadError> {
    let mut params = [0.0; N];
    reader.read_f64_into::<LittleEndian>(&mut params)?;
    Ok(params)
}

fn warn_anisotropic(camera_id: u32, fx: f64, fy: f64) {
    if fx != fy {
        warn!(
            "Camera {}: fx={} and fy={} differ; exporting fx as the focal length",
            camera_id, fx, fy
        );
    }
}

/// Read images.bin.
///
/// Binary format (little-endian):
/// - num_images: u64
/// - For each image:
///   - image_id: u32
///   - qw, qx, qy, qz: f64 (rotation quaternion)
///   - tx, ty, tz: f64 (translation)
///   - camera_id: u32
///   - name: null-terminated string
///   - num_points2d: u64
///   - For each 2D point: x: f64, y: f64, point3d_id: u64 (u64::MAX if none)
fn read_images_bin<R: Read>(reader: &mut R) -> Result<HashMap<u32, ImageRecord>, LoadError> {
    let num_images = reader.read_u64::<LittleEndian>()?;
    let mut images = HashMap::new();

    for _ in 0..num_images {
        let image_id = reader.read_u32::<LittleEndian>()?;

        let [qw, qx, qy, qz] = read_params::<_, 4>(reader)?;
        let [tx, ty, tz] = read_params::<_, 3>(reader)?;
        let camera_id = reader.read_u32::<LittleEndian>()?;

        // Read null-terminated image name
        let mut name_bytes = Vec::new();
        loop {
            let byte = reader.read_u8()?;
            if byte == 0 {
                break;
            }
            name_bytes.push(byte);
        }
        let name = String::from_utf8(name_bytes)
            .map_err(|e| LoadError::InvalidFormat(format!("Invalid UTF-8 in image name: {}", e)))?;

        let num_points2d = reader.read_u64::<LittleEndian>()?;
        let mut keypoints = Vec::new();
        for _ in 0..num_points2d {
            let x = reader.read_f64::<LittleEndian>()?;
            let y = reader.read_f64::<LittleEndian>()?;
            // The point3d_id is recovered from points3D.bin instead
            reader.read_u64::<LittleEndian>()?;
            keypoints.push(Feature::new(x, y));
        }

        // nalgebra uses (w, x, y, z) order
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(qw, qx, qy, qz));

        let record = ImageRecord {
            camera_id,
            name,
            rotation,
            translation: Vector3::new(tx, ty, tz),
            keypoints,
        };
        if images.insert(image_id, record).is_some() {
            return Err(LoadError::InvalidFormat(format!(
                "duplicate image id {}",
                image_id
            )));
        }
    }

    Ok(images)
}

/// Read points3D.bin.
///
/// Binary format (little-endian):
/// - num_points: u64
/// - For each point:
///   - point_id: u64
///   - x, y, z: f64 (position)
///   - r, g, b: u8 (color, unused)
///   - error: f64 (reprojection error, unused)
///   - track_length: u64
///   - For each track element: image_id: u32, point2d_idx: u32
fn read_points3d_bin<R: Read>(reader: &mut R) -> Result<HashMap<u64, PointRecord>, LoadError> {
    let num_points = reader.read_u64::<LittleEndian>()?;
    let mut points = HashMap::new();

    for _ in 0..num_points {
        let point_id = reader.read_u64::<LittleEndian>()?;
        let [x, y, z] = read_params::<_, 3>(reader)?;

        let mut color = [0u8; 3];
        reader.read_exact(&mut color)?;
        reader.read_f64::<LittleEndian>()?;

        let track_length = reader.read_u64::<LittleEndian>()?;
        let mut track = Vec::new();
        for _ in 0..track_length {
            let image_id = reader.read_u32::<LittleEndian>()?;
            let point2d_idx = reader.read_u32::<LittleEndian>()?;
            track.push((image_id, point2d_idx));
        }

        points.insert(
            point_id,
            PointRecord {
                position: Vector3::new(x, y, z),
                track,
            },
        );
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use byteorder::WriteBytesExt;
    use std::io::Cursor;

    #[test]
    fn test_read_cameras_models() {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(2).unwrap();
        // RADIAL
        buf.write_u32::<LittleEndian>(7).unwrap();
        buf.write_i32::<LittleEndian>(3).unwrap();
        buf.write_u64::<LittleEndian>(640).unwrap();
        buf.write_u64::<LittleEndian>(480).unwrap();
        for p in [500.0, 320.0, 240.0, -0.1, 0.01] {
            buf.write_f64::<LittleEndian>(p).unwrap();
        }
        // PINHOLE
        buf.write_u32::<LittleEndian>(8).unwrap();
        buf.write_i32::<LittleEndian>(1).unwrap();
        buf.write_u64::<LittleEndian>(100).unwrap();
        buf.write_u64::<LittleEndian>(50).unwrap();
        for p in [80.0, 80.0, 50.0, 25.0] {
            buf.write_f64::<LittleEndian>(p).unwrap();
        }

        let cameras = read_cameras_bin(&mut Cursor::new(buf)).unwrap();
        let radial = &cameras[&7];
        assert_relative_eq!(radial.focal_length(), 500.0);
        assert_relative_eq!(radial.principal_point_x(), 320.0);
        assert_relative_eq!(radial.radial_distortion_1(), -0.1);
        assert_relative_eq!(radial.radial_distortion_2(), 0.01);
        assert_eq!((radial.width, radial.height), (640, 480));

        let pinhole = &cameras[&8];
        assert_relative_eq!(pinhole.principal_point_y(), 25.0);
        assert_eq!(pinhole.radial_distortion, [0.0, 0.0]);
    }

    #[test]
    fn test_unsupported_camera_model() {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(1).unwrap();
        buf.write_u32::<LittleEndian>(1).unwrap();
        buf.write_i32::<LittleEndian>(11).unwrap();
        buf.write_u64::<LittleEndian>(1).unwrap();
        buf.write_u64::<LittleEndian>(1).unwrap();

        let err = read_cameras_bin(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedCameraModel(11)));
    }

    #[test]
    fn test_truncated_points_file() {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(1).unwrap();
        buf.write_u64::<LittleEndian>(5).unwrap();
        buf.write_f64::<LittleEndian>(1.0).unwrap();

        let err = read_points3d_bin(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
