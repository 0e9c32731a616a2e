//! A triangulated 3D point and the views that observe it.

use super::ViewId;
use nalgebra::{Vector3, Vector4};
use std::collections::BTreeSet;

#[derive(Clone, Debug)]
pub struct Track {
    /// Homogeneous world position
    point: Vector4<f64>,
    estimated: bool,
    view_ids: BTreeSet<ViewId>,
}

impl Default for Track {
    fn default() -> Self {
        Self::new()
    }
}

impl Track {
    pub fn new() -> Self {
        Self {
            point: Vector4::new(0.0, 0.0, 0.0, 1.0),
            estimated: false,
            view_ids: BTreeSet::new(),
        }
    }

    pub fn point(&self) -> &Vector4<f64> {
        &self.point
    }

    pub fn set_point(&mut self, point: Vector4<f64>) {
        self.point = point;
    }

    /// Dehomogenized position (x/w, y/w, z/w).
    pub fn position(&self) -> Vector3<f64> {
        self.point.xyz() / self.point.w
    }

    pub fn is_estimated(&self) -> bool {
        self.estimated
    }

    pub fn set_estimated(&mut self, estimated: bool) {
        self.estimated = estimated;
    }

    pub fn num_views(&self) -> usize {
        self.view_ids.len()
    }

    /// Observing views in ascending id order.
    pub fn view_ids(&self) -> &BTreeSet<ViewId> {
        &self.view_ids
    }

    pub(crate) fn add_view(&mut self, view_id: ViewId) -> bool {
        self.view_ids.insert(view_id)
    }

    pub(crate) fn remove_view(&mut self, view_id: ViewId) -> bool {
        self.view_ids.remove(&view_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_position_dehomogenizes() {
        let mut track = Track::new();
        track.set_point(Vector4::new(2.0, -4.0, 8.0, 2.0));
        assert_relative_eq!(track.position(), Vector3::new(1.0, -2.0, 4.0));
    }

    #[test]
    fn test_view_ids_are_ordered_and_unique() {
        let mut track = Track::new();
        assert!(track.add_view(7));
        assert!(track.add_view(3));
        assert!(!track.add_view(7));

        let ids: Vec<ViewId> = track.view_ids().iter().copied().collect();
        assert_eq!(ids, vec![3, 7]);
        assert_eq!(track.num_views(), 2);
    }
}
