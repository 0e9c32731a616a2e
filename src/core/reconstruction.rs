//! Views, tracks and the observations linking them.
//!
//! Identifiers are assigned sequentially and never reused. Views and tracks
//! are kept in ordered maps so that `view_ids()` / `track_ids()` enumerate in
//! ascending id order, which is the order every exporter writes in.

use super::track::Track;
use super::view::View;
use super::{Feature, TrackId, ViewId};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Errors from editing a reconstruction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconstructionError {
    #[error("a view named {0:?} already exists")]
    DuplicateViewName(String),

    #[error("unknown view id {0}")]
    UnknownView(ViewId),

    #[error("unknown track id {0}")]
    UnknownTrack(TrackId),

    #[error("view {view_id} already observes track {track_id}")]
    DuplicateObservation { view_id: ViewId, track_id: TrackId },
}

/// A structure-from-motion reconstruction.
///
/// `Clone` produces a fully independent deep copy.
#[derive(Clone, Debug, Default)]
pub struct Reconstruction {
    views: BTreeMap<ViewId, View>,
    tracks: BTreeMap<TrackId, Track>,
    view_names: HashMap<String, ViewId>,
    next_view_id: ViewId,
    next_track_id: TrackId,
}

impl Reconstruction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an (unestimated) view. View names must be unique.
    pub fn add_view(&mut self, name: &str) -> Result<ViewId, ReconstructionError> {
        if self.view_names.contains_key(name) {
            return Err(ReconstructionError::DuplicateViewName(name.to_string()));
        }

        let view_id = self.next_view_id;
        self.next_view_id += 1;
        self.views.insert(view_id, View::new(name));
        self.view_names.insert(name.to_string(), view_id);
        Ok(view_id)
    }

    /// Add an empty, unestimated track.
    pub fn add_track(&mut self) -> TrackId {
        let track_id = self.next_track_id;
        self.next_track_id += 1;
        self.tracks.insert(track_id, Track::new());
        track_id
    }

    /// Record that `view_id` observes `track_id` at `feature`.
    pub fn add_observation(
        &mut self,
        view_id: ViewId,
        track_id: TrackId,
        feature: Feature,
    ) -> Result<(), ReconstructionError> {
        let view = self
            .views
            .get_mut(&view_id)
            .ok_or(ReconstructionError::UnknownView(view_id))?;
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or(ReconstructionError::UnknownTrack(track_id))?;

        if !view.add_feature(track_id, feature) {
            return Err(ReconstructionError::DuplicateObservation { view_id, track_id });
        }
        track.add_view(view_id);
        Ok(())
    }

    /// Remove a view and detach it from every track it observed.
    ///
    /// Returns false if the view does not exist.
    pub fn remove_view(&mut self, view_id: ViewId) -> bool {
        let Some(view) = self.views.remove(&view_id) else {
            return false;
        };

        for track_id in view.track_ids() {
            if let Some(track) = self.tracks.get_mut(&track_id) {
                track.remove_view(view_id);
            }
        }
        self.view_names.remove(view.name());
        true
    }

    /// Remove a track and the features observing it.
    ///
    /// Returns false if the track does not exist.
    pub fn remove_track(&mut self, track_id: TrackId) -> bool {
        let Some(track) = self.tracks.remove(&track_id) else {
            return false;
        };

        for view_id in track.view_ids() {
            if let Some(view) = self.views.get_mut(view_id) {
                view.remove_feature(track_id);
            }
        }
        true
    }

    pub fn view(&self, view_id: ViewId) -> Option<&View> {
        self.views.get(&view_id)
    }

    pub fn view_mut(&mut self, view_id: ViewId) -> Option<&mut View> {
        self.views.get_mut(&view_id)
    }

    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    pub fn track_mut(&mut self, track_id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(&track_id)
    }

    pub fn view_id_from_name(&self, name: &str) -> Option<ViewId> {
        self.view_names.get(name).copied()
    }

    /// View ids in ascending order.
    pub fn view_ids(&self) -> Vec<ViewId> {
        self.views.keys().copied().collect()
    }

    /// Track ids in ascending order.
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.keys().copied().collect()
    }

    /// Views in ascending id order.
    pub fn views(&self) -> impl Iterator<Item = (ViewId, &View)> {
        self.views.iter().map(|(id, view)| (*id, view))
    }

    /// Tracks in ascending id order.
    pub fn tracks(&self) -> impl Iterator<Item = (TrackId, &Track)> {
        self.tracks.iter().map(|(id, track)| (*id, track))
    }

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_views_one_track() -> (Reconstruction, ViewId, ViewId, TrackId) {
        let mut rec = Reconstruction::new();
        let v0 = rec.add_view("a.jpg").unwrap();
        let v1 = rec.add_view("b.jpg").unwrap();
        let t = rec.add_track();
        rec.add_observation(v0, t, Feature::new(1.0, 2.0)).unwrap();
        rec.add_observation(v1, t, Feature::new(3.0, 4.0)).unwrap();
        (rec, v0, v1, t)
    }

    #[test]
    fn test_add_view_rejects_duplicate_names() {
        let mut rec = Reconstruction::new();
        let id = rec.add_view("img.png").unwrap();
        assert_eq!(rec.view_id_from_name("img.png"), Some(id));
        assert_eq!(
            rec.add_view("img.png"),
            Err(ReconstructionError::DuplicateViewName("img.png".to_string()))
        );
        assert_eq!(rec.num_views(), 1);
    }

    #[test]
    fn test_add_observation_links_both_sides() {
        let (rec, v0, v1, t) = two_views_one_track();

        let track = rec.track(t).unwrap();
        assert_eq!(track.num_views(), 2);
        assert!(track.view_ids().contains(&v0));
        assert_eq!(rec.view(v1).unwrap().feature(t), Some(&Feature::new(3.0, 4.0)));
    }

    #[test]
    fn test_add_observation_errors() {
        let (mut rec, v0, _, t) = two_views_one_track();

        assert_eq!(
            rec.add_observation(99, t, Feature::zeros()),
            Err(ReconstructionError::UnknownView(99))
        );
        assert_eq!(
            rec.add_observation(v0, 42, Feature::zeros()),
            Err(ReconstructionError::UnknownTrack(42))
        );
        assert_eq!(
            rec.add_observation(v0, t, Feature::zeros()),
            Err(ReconstructionError::DuplicateObservation { view_id: v0, track_id: t })
        );
    }

    #[test]
    fn test_remove_view_detaches_from_tracks() {
        let (mut rec, v0, v1, t) = two_views_one_track();

        assert!(rec.remove_view(v0));
        assert!(!rec.remove_view(v0));
        assert_eq!(rec.track(t).unwrap().num_views(), 1);
        assert!(rec.track(t).unwrap().view_ids().contains(&v1));
        assert_eq!(rec.view_id_from_name("a.jpg"), None);
    }

    #[test]
    fn test_remove_track_drops_features() {
        let (mut rec, v0, v1, t) = two_views_one_track();

        assert!(rec.remove_track(t));
        assert!(rec.view(v0).unwrap().feature(t).is_none());
        assert_eq!(rec.view(v1).unwrap().num_features(), 0);
        assert_eq!(rec.num_tracks(), 0);
    }

    #[test]
    fn test_clone_is_independent() {
        let (rec, v0, _, t) = two_views_one_track();
        let mut copy = rec.clone();

        copy.view_mut(v0).unwrap().set_estimated(true);
        copy.remove_track(t);

        assert!(!rec.view(v0).unwrap().is_estimated());
        assert_eq!(rec.num_tracks(), 1);
        assert!(rec.view(v0).unwrap().feature(t).is_some());
    }

    #[test]
    fn test_ids_enumerate_in_ascending_order() {
        let mut rec = Reconstruction::new();
        for name in ["c", "a", "b"] {
            rec.add_view(name).unwrap();
        }
        rec.remove_view(1);
        assert_eq!(rec.view_ids(), vec![0, 2]);
    }
}
