//! Scripted stand-ins for the session, detector and renderer.
//!
//! The demo binary and the integration tests drive the tracker through these
//! instead of a camera: a [`SimulatedScene`] holds the faces currently in view
//! and answers frames, detections and hit-tests from them, and a
//! [`RecordingRenderer`] keeps a log of every anchor command it accepted.

use crate::detection::{FaceDetection, FaceDetector};
use crate::geometry::{transform_bounding_box, NormalizedRect, ScreenPoint, ViewState, WorldPoint};
use crate::hud::TrackingState;
use crate::renderer::{AnchorHandle, AnchorRenderer};
use crate::session::{Frame, FrameSource, HitTestKind, HitTestResult};
use crate::{Error, Result};
use image::RgbImage;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Size of the placeholder camera image
const FRAME_WIDTH: u32 = 64;
const FRAME_HEIGHT: u32 = 48;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A face placed in the simulated scene
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedFace {
    /// Where the detector reports the face
    pub bbox: NormalizedRect,
    /// Feature point found under the face
    pub position: WorldPoint,
    /// Distance of that feature point from the camera
    pub distance: f32,
}

impl SimulatedFace {
    #[must_use]
    pub fn new(bbox: NormalizedRect, position: WorldPoint) -> Self {
        let distance = position.coords.norm();
        Self {
            bbox,
            position,
            distance,
        }
    }
}

#[derive(Debug)]
struct SceneState {
    faces: Vec<SimulatedFace>,
    manual_time: Option<f64>,
    frames_available: bool,
    detector_error: Option<String>,
    tracking: TrackingState,
}

/// Scene that acts as frame source and face detector at once
#[derive(Debug)]
pub struct SimulatedScene {
    view: Arc<ViewState>,
    started: Instant,
    state: Mutex<SceneState>,
}

impl SimulatedScene {
    #[must_use]
    pub fn new(view: Arc<ViewState>) -> Self {
        Self {
            view,
            started: Instant::now(),
            state: Mutex::new(SceneState {
                faces: Vec::new(),
                manual_time: None,
                frames_available: true,
                detector_error: None,
                tracking: TrackingState::Normal,
            }),
        }
    }

    pub fn set_faces(&self, faces: Vec<SimulatedFace>) {
        lock(&self.state).faces = faces;
    }

    #[must_use]
    pub fn faces(&self) -> Vec<SimulatedFace> {
        lock(&self.state).faces.clone()
    }

    /// Freeze the session clock at `time`; `None` follows the wall clock again
    pub fn set_time(&self, time: Option<f64>) {
        lock(&self.state).manual_time = time;
    }

    pub fn set_frames_available(&self, available: bool) {
        lock(&self.state).frames_available = available;
    }

    /// Make the detector fail with `message` until cleared
    pub fn set_detector_error(&self, message: Option<String>) {
        lock(&self.state).detector_error = message;
    }

    pub fn set_tracking_state(&self, state: TrackingState) {
        lock(&self.state).tracking = state;
    }
}

impl FrameSource for SimulatedScene {
    fn current_frame(&self) -> Option<Frame> {
        if !lock(&self.state).frames_available {
            return None;
        }
        Some(Frame::new(self.now(), RgbImage::new(FRAME_WIDTH, FRAME_HEIGHT)))
    }

    fn hit_test(&self, point: ScreenPoint, kind: HitTestKind) -> Vec<HitTestResult> {
        if kind != HitTestKind::FeaturePoint {
            return Vec::new();
        }
        let (bounds, orientation) = self.view.get();

        let mut hits: Vec<HitTestResult> = lock(&self.state)
            .faces
            .iter()
            .filter(|face| {
                let rect = transform_bounding_box(&face.bbox, bounds, orientation);
                point.x >= rect.x
                    && point.x <= rect.x + rect.width
                    && point.y >= rect.y
                    && point.y <= rect.y + rect.height
            })
            .map(|face| HitTestResult::at(face.position, face.distance))
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn now(&self) -> f64 {
        lock(&self.state)
            .manual_time
            .unwrap_or_else(|| self.started.elapsed().as_secs_f64())
    }

    fn tracking_state(&self) -> TrackingState {
        lock(&self.state).tracking
    }
}

impl FaceDetector for SimulatedScene {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<FaceDetection>> {
        let state = lock(&self.state);
        if let Some(message) = &state.detector_error {
            return Err(Error::Detector(message.clone()));
        }
        Ok(state
            .faces
            .iter()
            .map(|face| FaceDetection::new(face.bbox, 1.0))
            .collect())
    }
}

/// Anchor command accepted by a [`RecordingRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorCommand {
    Create {
        handle: AnchorHandle,
        label: String,
        position: WorldPoint,
    },
    Move {
        handle: AnchorHandle,
        position: WorldPoint,
    },
    Show(AnchorHandle),
    Hide(AnchorHandle),
    Remove(AnchorHandle),
    Relabel {
        handle: AnchorHandle,
        label: String,
    },
}

#[derive(Debug, Default)]
struct RenderState {
    next_id: u64,
    live: HashSet<AnchorHandle>,
    commands: Vec<AnchorCommand>,
}

/// Renderer that validates handles and records commands.
///
/// Clones share their log, so a test can keep one clone while the presentation
/// thread owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    state: Arc<Mutex<RenderState>>,
}

impl RecordingRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All accepted commands in order
    #[must_use]
    pub fn commands(&self) -> Vec<AnchorCommand> {
        lock(&self.state).commands.clone()
    }

    #[must_use]
    pub fn move_count(&self) -> usize {
        self.count(|c| matches!(c, AnchorCommand::Move { .. }))
    }

    #[must_use]
    pub fn create_count(&self) -> usize {
        self.count(|c| matches!(c, AnchorCommand::Create { .. }))
    }

    #[must_use]
    pub fn hide_count(&self) -> usize {
        self.count(|c| matches!(c, AnchorCommand::Hide(_)))
    }

    #[must_use]
    pub fn remove_count(&self) -> usize {
        self.count(|c| matches!(c, AnchorCommand::Remove(_)))
    }

    /// Anchors that exist in the scene right now
    #[must_use]
    pub fn live_anchors(&self) -> usize {
        lock(&self.state).live.len()
    }

    /// Forget a handle, as if the scene had dropped the node on its own
    pub fn invalidate(&self, handle: AnchorHandle) {
        lock(&self.state).live.remove(&handle);
    }

    fn count(&self, predicate: impl Fn(&AnchorCommand) -> bool) -> usize {
        lock(&self.state).commands.iter().filter(|c| predicate(c)).count()
    }

    fn apply(&self, handle: AnchorHandle, command: AnchorCommand) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.live.contains(&handle) {
            return Err(Error::StaleHandle(handle));
        }
        if matches!(command, AnchorCommand::Remove(_)) {
            state.live.remove(&handle);
        }
        state.commands.push(command);
        Ok(())
    }
}

impl AnchorRenderer for RecordingRenderer {
    fn create_anchor(&mut self, label: &str, position: WorldPoint) -> Result<AnchorHandle> {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let handle = AnchorHandle(state.next_id);
        state.live.insert(handle);
        state.commands.push(AnchorCommand::Create {
            handle,
            label: label.to_string(),
            position,
        });
        Ok(handle)
    }

    fn move_anchor(&mut self, handle: AnchorHandle, position: WorldPoint) -> Result<()> {
        self.apply(handle, AnchorCommand::Move { handle, position })
    }

    fn show_anchor(&mut self, handle: AnchorHandle) -> Result<()> {
        self.apply(handle, AnchorCommand::Show(handle))
    }

    fn hide_anchor(&mut self, handle: AnchorHandle) -> Result<()> {
        self.apply(handle, AnchorCommand::Hide(handle))
    }

    fn remove_anchor(&mut self, handle: AnchorHandle) -> Result<()> {
        self.apply(handle, AnchorCommand::Remove(handle))
    }

    fn relabel_anchor(&mut self, handle: AnchorHandle, label: &str) -> Result<()> {
        self.apply(
            handle,
            AnchorCommand::Relabel {
                handle,
                label: label.to_string(),
            },
        )
    }
}
