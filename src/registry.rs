//! Tracked-face registry: per-face liveness state.
//!
//! Each tracked face goes through
//! `absent -> visible (created) -> visible (updated)* -> hidden (stale)`,
//! and a hidden face is re-created by its next observation. The registry is the
//! only owner of anchor handles and is driven exclusively from the presentation
//! thread, so it needs no locking of its own.

use crate::config::RegistryConfig;
use crate::geometry::WorldPoint;
use crate::renderer::{AnchorHandle, AnchorRenderer};
use crate::{Error, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How many faces are tracked at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// One slot; every observation updates the same face whatever its label
    #[default]
    Single,
    /// One face per label
    Multi,
}

/// What the expiry sweep does with a stale face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryAction {
    /// Hide the anchor and keep the entry until the face shows up again
    #[default]
    Hide,
    /// Remove the anchor and forget the face
    Remove,
}

/// A stabilized face position ready to be applied
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub label: String,
    pub position: WorldPoint,
    /// Session clock time of the frame the face was seen in
    pub timestamp: f64,
}

impl Observation {
    #[must_use]
    pub fn new(label: impl Into<String>, position: WorldPoint, timestamp: f64) -> Self {
        Self {
            label: label.into(),
            position,
            timestamp,
        }
    }
}

/// A face currently considered present in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedFace {
    label: String,
    anchor: AnchorHandle,
    position: WorldPoint,
    last_updated: f64,
    visible: bool,
}

impl TrackedFace {
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn anchor(&self) -> AnchorHandle {
        self.anchor
    }

    /// Last position the anchor was committed to
    #[must_use]
    pub fn position(&self) -> WorldPoint {
        self.position
    }

    #[must_use]
    pub fn last_updated(&self) -> f64 {
        self.last_updated
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn is_stale(&self, now: f64, window: f64) -> bool {
        now - self.last_updated > window
    }
}

/// Outcome of applying an observation or a sweep to one face
#[derive(Debug, Clone, PartialEq)]
pub enum FaceEvent {
    /// A new anchor was created
    Created { label: String, anchor: AnchorHandle },
    /// A hidden face was seen again and got a fresh anchor
    Revived { label: String, anchor: AnchorHandle },
    /// The anchor moved to the new position
    Moved { label: String, distance: f32 },
    /// The face was refreshed but stayed inside the movement threshold
    Refreshed { label: String, distance: f32 },
    /// The sweep hid a stale face
    Hidden { label: String },
    /// The sweep removed a stale face
    Removed { label: String },
    /// The renderer rejected the anchor; the entry is gone
    Dropped { label: String },
}

enum Slots {
    Single(Option<TrackedFace>),
    Keyed(HashMap<String, TrackedFace>),
}

impl Slots {
    fn get(&self, label: &str) -> Option<&TrackedFace> {
        match self {
            Self::Single(slot) => slot.as_ref(),
            Self::Keyed(faces) => faces.get(label),
        }
    }

    fn get_mut(&mut self, label: &str) -> Option<&mut TrackedFace> {
        match self {
            Self::Single(slot) => slot.as_mut(),
            Self::Keyed(faces) => faces.get_mut(label),
        }
    }

    fn insert(&mut self, face: TrackedFace) {
        match self {
            Self::Single(slot) => *slot = Some(face),
            Self::Keyed(faces) => {
                faces.insert(face.label.clone(), face);
            }
        }
    }

    fn remove(&mut self, label: &str) -> Option<TrackedFace> {
        match self {
            Self::Single(slot) => slot.take(),
            Self::Keyed(faces) => faces.remove(label),
        }
    }

    fn values(&self) -> Box<dyn Iterator<Item = &TrackedFace> + '_> {
        match self {
            Self::Single(slot) => Box::new(slot.iter()),
            Self::Keyed(faces) => Box::new(faces.values()),
        }
    }
}

/// Registry of tracked faces
pub struct FaceRegistry {
    slots: Slots,
    movement_threshold: f32,
    staleness_window: f64,
    expiry_action: ExpiryAction,
}

impl FaceRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new(mode: TrackingMode, movement_threshold: f32, staleness_window: f64, expiry_action: ExpiryAction) -> Self {
        let slots = match mode {
            TrackingMode::Single => Slots::Single(None),
            TrackingMode::Multi => Slots::Keyed(HashMap::new()),
        };
        Self {
            slots,
            movement_threshold,
            staleness_window,
            expiry_action,
        }
    }

    #[must_use]
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(
            config.mode,
            config.movement_threshold,
            config.staleness_window_secs,
            config.expiry_action,
        )
    }

    #[must_use]
    pub fn mode(&self) -> TrackingMode {
        match self.slots {
            Slots::Single(_) => TrackingMode::Single,
            Slots::Keyed(_) => TrackingMode::Multi,
        }
    }

    /// Face tracked under `label`; in single mode, the one face regardless of label
    #[must_use]
    pub fn face(&self, label: &str) -> Option<&TrackedFace> {
        self.slots.get(label)
    }

    /// Copy of every tracked face, hidden ones included
    #[must_use]
    pub fn faces(&self) -> Vec<TrackedFace> {
        self.slots.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.values().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply one observation: create, revive, move or refresh the matching face.
    pub fn observe(&mut self, observation: Observation, renderer: &mut dyn AnchorRenderer) -> FaceEvent {
        let threshold = self.movement_threshold;
        let outcome = match self.slots.get_mut(&observation.label) {
            None => return self.create(observation, renderer, false),
            Some(face) if !face.visible => return self.revive(observation, renderer),
            Some(face) => Self::update(face, &observation, threshold, renderer),
        };

        match outcome {
            Ok(event) => event,
            Err(e) => self.drop_face(&observation.label, &e, renderer),
        }
    }

    /// Hide or remove every visible face not observed within the staleness window.
    ///
    /// Faces that are already hidden are left alone, so repeated sweeps are no-ops.
    pub fn expire(&mut self, now: f64, renderer: &mut dyn AnchorRenderer) -> Vec<FaceEvent> {
        let stale: Vec<String> = self
            .slots
            .values()
            .filter(|face| face.visible && face.is_stale(now, self.staleness_window))
            .map(|face| face.label.clone())
            .collect();

        let mut events = Vec::with_capacity(stale.len());
        for label in stale {
            let event = match self.expiry_action {
                ExpiryAction::Hide => self.hide(&label, renderer),
                ExpiryAction::Remove => self.remove(&label, renderer),
            };
            events.extend(event);
        }
        events
    }

    fn create(&mut self, observation: Observation, renderer: &mut dyn AnchorRenderer, revived: bool) -> FaceEvent {
        let Observation {
            label,
            position,
            timestamp,
        } = observation;

        let anchor = match renderer.create_anchor(&label, position) {
            Ok(anchor) => anchor,
            Err(e) => {
                warn!("Could not create anchor for {}: {}", label, e);
                return FaceEvent::Dropped { label };
            }
        };
        if let Err(e) = renderer.show_anchor(anchor) {
            warn!("Could not show {} for {}: {}", anchor, label, e);
            let _ = renderer.remove_anchor(anchor);
            return FaceEvent::Dropped { label };
        }

        info!("Tracking {} at {:?} ({})", label, position, anchor);
        self.slots.insert(TrackedFace {
            label: label.clone(),
            anchor,
            position,
            last_updated: timestamp,
            visible: true,
        });

        if revived {
            FaceEvent::Revived { label, anchor }
        } else {
            FaceEvent::Created { label, anchor }
        }
    }

    fn revive(&mut self, observation: Observation, renderer: &mut dyn AnchorRenderer) -> FaceEvent {
        if let Some(old) = self.slots.remove(&observation.label) {
            if let Err(e) = renderer.remove_anchor(old.anchor) {
                debug!("Hidden anchor {} already gone: {}", old.anchor, e);
            }
        }
        self.create(observation, renderer, true)
    }

    fn update(
        face: &mut TrackedFace,
        observation: &Observation,
        threshold: f32,
        renderer: &mut dyn AnchorRenderer,
    ) -> Result<FaceEvent> {
        let distance = nalgebra::distance(&face.position, &observation.position);
        let moved = distance >= threshold;

        if moved {
            renderer.move_anchor(face.anchor, observation.position)?;
            face.position = observation.position;
        }
        if face.label != observation.label {
            renderer.relabel_anchor(face.anchor, &observation.label)?;
            debug!("Relabel {} -> {}", face.label, observation.label);
            face.label.clone_from(&observation.label);
        }
        face.last_updated = face.last_updated.max(observation.timestamp);

        let label = face.label.clone();
        Ok(if moved {
            FaceEvent::Moved { label, distance }
        } else {
            FaceEvent::Refreshed { label, distance }
        })
    }

    fn hide(&mut self, label: &str, renderer: &mut dyn AnchorRenderer) -> Option<FaceEvent> {
        let face = self.slots.get_mut(label)?;
        match renderer.hide_anchor(face.anchor) {
            Ok(()) => {
                info!("Hide node: {}", face.label);
                face.visible = false;
                Some(FaceEvent::Hidden {
                    label: face.label.clone(),
                })
            }
            Err(e) => Some(self.drop_face(label, &e, renderer)),
        }
    }

    fn remove(&mut self, label: &str, renderer: &mut dyn AnchorRenderer) -> Option<FaceEvent> {
        let face = self.slots.remove(label)?;
        match renderer.remove_anchor(face.anchor) {
            Ok(()) => {
                info!("Remove node: {}", face.label);
                Some(FaceEvent::Removed { label: face.label })
            }
            Err(e) => {
                warn!("Dropping {}: {}", face.label, e);
                Some(FaceEvent::Dropped { label: face.label })
            }
        }
    }

    /// Forget a face after the renderer rejected one of its commands.
    ///
    /// A stale handle means the node is already gone. Any other failure leaves
    /// the node in the scene, so it is removed before the entry is dropped.
    fn drop_face(&mut self, label: &str, error: &Error, renderer: &mut dyn AnchorRenderer) -> FaceEvent {
        let Some(face) = self.slots.remove(label) else {
            warn!("Dropping {}: {}", label, error);
            return FaceEvent::Dropped {
                label: label.to_string(),
            };
        };

        warn!("Dropping {}: {}", face.label, error);
        if !matches!(error, Error::StaleHandle(_)) {
            if let Err(e) = renderer.remove_anchor(face.anchor) {
                warn!("Could not remove {} for {}: {}", face.anchor, face.label, e);
            }
        }
        FaceEvent::Dropped { label: face.label }
    }
}

impl Default for FaceRegistry {
    fn default() -> Self {
        Self::from_config(&RegistryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{AnchorCommand, RecordingRenderer};

    fn registry(mode: TrackingMode, action: ExpiryAction) -> FaceRegistry {
        FaceRegistry::new(mode, 0.03, 1.5, action)
    }

    fn at(z: f32) -> WorldPoint {
        WorldPoint::new(0.0, 0.0, z)
    }

    #[test]
    fn test_first_observation_creates_and_shows() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Remove);

        let event = registry.observe(Observation::new("Johan", at(-1.0), 0.0), &mut renderer);
        let FaceEvent::Created { label, anchor } = event else {
            panic!("expected creation, got {event:?}");
        };
        assert_eq!(label, "Johan");

        assert_eq!(
            renderer.commands(),
            vec![
                AnchorCommand::Create {
                    handle: anchor,
                    label: "Johan".to_string(),
                    position: at(-1.0),
                },
                AnchorCommand::Show(anchor),
            ]
        );

        let face = registry.face("Johan").unwrap();
        assert!(face.is_visible());
        assert_eq!(face.position(), at(-1.0));
        assert_eq!(face.last_updated(), 0.0);
    }

    #[test]
    fn test_small_moves_are_gated() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Remove);

        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);
        let event = registry.observe(Observation::new("Johan", at(0.029), 0.6), &mut renderer);

        assert!(matches!(event, FaceEvent::Refreshed { .. }));
        assert_eq!(renderer.move_count(), 0);

        let face = registry.face("Johan").unwrap();
        assert_eq!(face.position(), at(0.0));
        assert_eq!(face.last_updated(), 0.6);
    }

    #[test]
    fn test_large_moves_update_anchor() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Remove);

        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);
        let event = registry.observe(Observation::new("Johan", at(0.031), 0.6), &mut renderer);

        assert!(matches!(event, FaceEvent::Moved { .. }));
        assert_eq!(renderer.move_count(), 1);
        assert_eq!(registry.face("Johan").unwrap().position(), at(0.031));
    }

    #[test]
    fn test_gate_measures_from_committed_position() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Remove);

        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);
        registry.observe(Observation::new("Johan", at(0.02), 0.6), &mut renderer);
        assert_eq!(renderer.move_count(), 0);

        // Measured from the committed position, not from the previous observation
        registry.observe(Observation::new("Johan", at(0.05), 1.2), &mut renderer);
        assert_eq!(renderer.move_count(), 1);
        assert_eq!(registry.face("Johan").unwrap().position(), at(0.05));
    }

    #[test]
    fn test_single_mode_relabels_without_moving() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Remove);

        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);
        registry.observe(Observation::new("Danny", at(0.0), 0.6), &mut renderer);

        assert_eq!(registry.len(), 1);
        assert!(registry.face("Johan").is_some_and(|f| f.label() == "Danny"));
        assert_eq!(renderer.move_count(), 0);
        assert!(renderer
            .commands()
            .iter()
            .any(|c| matches!(c, AnchorCommand::Relabel { label, .. } if label == "Danny")));
    }

    #[test]
    fn test_multi_mode_keys_by_label() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Multi, ExpiryAction::Remove);

        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);
        let event = registry.observe(Observation::new("Danny", at(1.0), 0.0), &mut renderer);

        assert!(matches!(event, FaceEvent::Created { .. }));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.face("Danny").unwrap().position(), at(1.0));
        assert_eq!(registry.face("Johan").unwrap().position(), at(0.0));
    }

    #[test]
    fn test_last_updated_never_goes_back() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Remove);

        registry.observe(Observation::new("Johan", at(0.0), 2.0), &mut renderer);
        registry.observe(Observation::new("Johan", at(0.0), 1.0), &mut renderer);

        assert_eq!(registry.face("Johan").unwrap().last_updated(), 2.0);
    }

    #[test]
    fn test_expire_respects_window() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Hide);
        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);

        assert!(registry.expire(1.4, &mut renderer).is_empty());
        assert!(registry.expire(1.5, &mut renderer).is_empty());
        assert!(registry.face("Johan").unwrap().is_visible());

        let events = registry.expire(1.5 + 1e-3, &mut renderer);
        assert_eq!(events, vec![FaceEvent::Hidden { label: "Johan".to_string() }]);
        assert!(!registry.face("Johan").unwrap().is_visible());
    }

    #[test]
    fn test_expire_twice_hides_once() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Hide);
        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);

        assert_eq!(registry.expire(2.0, &mut renderer).len(), 1);
        assert!(registry.expire(3.0, &mut renderer).is_empty());
        assert_eq!(renderer.hide_count(), 1);
    }

    #[test]
    fn test_expire_remove_forgets_face() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Remove);
        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);

        let events = registry.expire(2.0, &mut renderer);
        assert_eq!(events, vec![FaceEvent::Removed { label: "Johan".to_string() }]);
        assert!(registry.is_empty());
        assert!(registry.expire(3.0, &mut renderer).is_empty());
    }

    #[test]
    fn test_hidden_face_is_recreated() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Hide);
        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);
        let old = registry.face("Johan").unwrap().anchor();
        registry.expire(2.0, &mut renderer);

        let event = registry.observe(Observation::new("Danny", at(0.01), 3.0), &mut renderer);
        let FaceEvent::Revived { label, anchor } = event else {
            panic!("expected revival, got {event:?}");
        };
        assert_eq!(label, "Danny");
        assert_ne!(anchor, old);

        let face = registry.face("Danny").unwrap();
        assert!(face.is_visible());
        assert_eq!(face.position(), at(0.01));
        assert!(renderer.commands().contains(&AnchorCommand::Remove(old)));
    }

    #[test]
    fn test_stale_handle_drops_entry() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Hide);
        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);
        renderer.invalidate(registry.face("Johan").unwrap().anchor());

        let event = registry.observe(Observation::new("Johan", at(1.0), 0.6), &mut renderer);
        assert_eq!(event, FaceEvent::Dropped { label: "Johan".to_string() });
        assert!(registry.is_empty());

        // The next observation starts over
        let event = registry.observe(Observation::new("Johan", at(1.0), 1.2), &mut renderer);
        assert!(matches!(event, FaceEvent::Created { .. }));
    }

    #[test]
    fn test_stale_handle_during_sweep() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Hide);
        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);
        renderer.invalidate(registry.face("Johan").unwrap().anchor());

        let events = registry.expire(2.0, &mut renderer);
        assert_eq!(events, vec![FaceEvent::Dropped { label: "Johan".to_string() }]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_refresh_keeps_face_alive() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Hide);
        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);
        registry.observe(Observation::new("Johan", at(0.0), 1.2), &mut renderer);

        assert!(registry.expire(2.0, &mut renderer).is_empty());
        assert!(registry.face("Johan").unwrap().is_visible());
    }

    /// Renderer whose hide and move calls fail while the node stays in the scene
    struct BusyRenderer {
        inner: RecordingRenderer,
    }

    impl AnchorRenderer for BusyRenderer {
        fn create_anchor(&mut self, label: &str, position: WorldPoint) -> Result<AnchorHandle> {
            self.inner.create_anchor(label, position)
        }

        fn move_anchor(&mut self, _handle: AnchorHandle, _position: WorldPoint) -> Result<()> {
            Err(Error::Runtime("busy".to_string()))
        }

        fn show_anchor(&mut self, handle: AnchorHandle) -> Result<()> {
            self.inner.show_anchor(handle)
        }

        fn hide_anchor(&mut self, _handle: AnchorHandle) -> Result<()> {
            Err(Error::Runtime("busy".to_string()))
        }

        fn remove_anchor(&mut self, handle: AnchorHandle) -> Result<()> {
            self.inner.remove_anchor(handle)
        }
    }

    #[test]
    fn test_failed_hide_removes_live_anchor() {
        let recorder = RecordingRenderer::new();
        let mut renderer = BusyRenderer { inner: recorder.clone() };
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Hide);
        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);

        let events = registry.expire(2.0, &mut renderer);
        assert_eq!(events, vec![FaceEvent::Dropped { label: "Johan".to_string() }]);
        assert!(registry.is_empty());
        assert_eq!(recorder.live_anchors(), 0);
    }

    #[test]
    fn test_failed_move_does_not_leave_orphan_anchor() {
        let recorder = RecordingRenderer::new();
        let mut renderer = BusyRenderer { inner: recorder.clone() };
        let mut registry = registry(TrackingMode::Single, ExpiryAction::Hide);
        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);

        let event = registry.observe(Observation::new("Johan", at(1.0), 0.6), &mut renderer);
        assert_eq!(event, FaceEvent::Dropped { label: "Johan".to_string() });
        assert_eq!(recorder.live_anchors(), 0);

        registry.observe(Observation::new("Johan", at(1.0), 1.2), &mut renderer);
        assert_eq!(registry.len(), 1);
        assert_eq!(recorder.live_anchors(), 1);
    }

    #[test]
    fn test_default_registry_hides_stale_faces() {
        let mut renderer = RecordingRenderer::new();
        let mut registry = FaceRegistry::default();
        registry.observe(Observation::new("Johan", at(0.0), 0.0), &mut renderer);

        let events = registry.expire(2.0, &mut renderer);
        assert_eq!(events, vec![FaceEvent::Hidden { label: "Johan".to_string() }]);
        assert!(!registry.face("Johan").unwrap().is_visible());
        assert_eq!(renderer.live_anchors(), 1);
    }
}
