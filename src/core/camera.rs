//! Camera model (pinhole camera with radial distortion and a world pose).
//!
//! Conventions follow the reconstruction, not Bundler:
//! - `rotation` maps world directions into the camera frame
//! - `position` is the camera center in world coordinates
//! - camera frame is right-handed with x right, y down, z forward
//! - pixel origin is the top-left corner of the image

use nalgebra::{Matrix3, Vector2, Vector3};

/// A calibrated camera with intrinsic and extrinsic parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    // Intrinsic parameters
    /// Focal length (pixels)
    pub focal_length: f64,

    /// Principal point (pixels)
    pub principal_point: Vector2<f64>,

    /// Radial distortion coefficients k1, k2
    pub radial_distortion: [f64; 2],

    /// Image width (pixels)
    pub width: u32,

    /// Image height (pixels)
    pub height: u32,

    // Extrinsic parameters
    /// Rotation from world to camera coordinates
    pub rotation: Matrix3<f64>,

    /// Camera center in world coordinates
    pub position: Vector3<f64>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0, 0, 0)
    }
}

impl Camera {
    /// Create a distortion-free camera sitting at the world origin.
    pub fn new(focal_length: f64, cx: f64, cy: f64, width: u32, height: u32) -> Self {
        Self {
            focal_length,
            principal_point: Vector2::new(cx, cy),
            radial_distortion: [0.0, 0.0],
            width,
            height,
            rotation: Matrix3::identity(),
            position: Vector3::zeros(),
        }
    }

    /// Set the world-to-camera rotation and the camera center.
    pub fn set_pose(&mut self, rotation: Matrix3<f64>, position: Vector3<f64>) {
        self.rotation = rotation;
        self.position = position;
    }

    pub fn set_radial_distortion(&mut self, k1: f64, k2: f64) {
        self.radial_distortion = [k1, k2];
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn radial_distortion_1(&self) -> f64 {
        self.radial_distortion[0]
    }

    pub fn radial_distortion_2(&self) -> f64 {
        self.radial_distortion[1]
    }

    pub fn principal_point_x(&self) -> f64 {
        self.principal_point.x
    }

    pub fn principal_point_y(&self) -> f64 {
        self.principal_point.y
    }

    pub fn rotation_matrix(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    /// World-to-camera translation: t = -R * C
    pub fn translation(&self) -> Vector3<f64> {
        -(self.rotation * self.position)
    }

    /// Transform a point from world coordinates to camera coordinates.
    ///
    /// p_camera = R * (p_world - C)
    pub fn world_to_camera(&self, point_world: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * (point_world - self.position)
    }

    /// Project a world point to pixel coordinates.
    ///
    /// Returns None if the point is behind the camera (z <= 0).
    ///
    /// Projection: d = 1 + k1*r² + k2*r⁴, [u, v] = f * d * [x/z, y/z] + pp
    pub fn project(&self, point_world: &Vector3<f64>) -> Option<Vector2<f64>> {
        let point_camera = self.world_to_camera(point_world);
        if point_camera.z <= 0.0 {
            return None;
        }

        let normalized = Vector2::new(
            point_camera.x / point_camera.z,
            point_camera.y / point_camera.z,
        );
        let r_sq = normalized.norm_squared();
        let [k1, k2] = self.radial_distortion;
        let distortion = 1.0 + k1 * r_sq + k2 * r_sq * r_sq;

        Some(normalized * (self.focal_length * distortion) + self.principal_point)
    }
}

/// Optional calibration hints attached to a view (e.g. from EXIF).
///
/// An unset field is `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CameraIntrinsicsPrior {
    pub focal_length: Option<f64>,
    pub principal_point: Option<Vector2<f64>>,
}
