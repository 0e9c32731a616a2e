//! Core data structures of a structure-from-motion reconstruction.
//!
//! This module contains the types the exporters read:
//! - `Camera`: intrinsics plus world pose
//! - `View`: one image with its camera and 2D observations
//! - `Track`: one triangulated point with its observing views
//! - `Reconstruction`: the container keeping views and tracks consistent
//!
//! All types here are "pure data" - no I/O.

mod camera;
mod reconstruction;
mod track;
mod view;

use nalgebra::Vector2;

/// Identifier of a view within a reconstruction.
pub type ViewId = u32;

/// Identifier of a track within a reconstruction.
pub type TrackId = u32;

/// A 2D image observation in pixels (origin at the top-left corner, y down).
pub type Feature = Vector2<f64>;

// Re-export public types
pub use camera::{Camera, CameraIntrinsicsPrior};
pub use reconstruction::{Reconstruction, ReconstructionError};
pub use track::Track;
pub use view::View;
