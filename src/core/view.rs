//! A single image in a reconstruction.

use super::camera::{Camera, CameraIntrinsicsPrior};
use super::{Feature, TrackId};
use std::collections::HashMap;

/// One image: its name, camera, calibration prior and 2D observations.
#[derive(Clone, Debug)]
pub struct View {
    name: String,
    estimated: bool,
    camera: Camera,
    prior: CameraIntrinsicsPrior,

    /// Observed feature per track, in pixels
    features: HashMap<TrackId, Feature>,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            estimated: false,
            camera: Camera::default(),
            prior: CameraIntrinsicsPrior::default(),
            features: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the pose of this view has been solved.
    pub fn is_estimated(&self) -> bool {
        self.estimated
    }

    pub fn set_estimated(&mut self, estimated: bool) {
        self.estimated = estimated;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn camera_intrinsics_prior(&self) -> &CameraIntrinsicsPrior {
        &self.prior
    }

    pub fn set_camera_intrinsics_prior(&mut self, prior: CameraIntrinsicsPrior) {
        self.prior = prior;
    }

    /// The 2D feature observing `track_id`, if any.
    pub fn feature(&self, track_id: TrackId) -> Option<&Feature> {
        self.features.get(&track_id)
    }

    pub fn track_ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.features.keys().copied()
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    // Observations are edited through `Reconstruction` so that the
    // view and track sides stay in sync.
    pub(crate) fn add_feature(&mut self, track_id: TrackId, feature: Feature) -> bool {
        if self.features.contains_key(&track_id) {
            return false;
        }
        self.features.insert(track_id, feature);
        true
    }

    pub(crate) fn remove_feature(&mut self, track_id: TrackId) -> bool {
        self.features.remove(&track_id).is_some()
    }
}
