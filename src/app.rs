//! Application wiring: configuration, collaborators, presentation thread and
//! tracker, plus the scripted demo the binary runs.

use crate::config::Config;
use crate::geometry::{NormalizedRect, ViewState, WorldPoint};
use crate::gesture::{HoldToggleLabel, PressPhase};
use crate::hud::{HudController, LimitedReason, TrackingState};
use crate::pipeline::{DetectionPipeline, FaceTracker};
use crate::presentation::{Presentation, PresentationSender};
use crate::registry::{FaceRegistry, TrackedFace};
use crate::simulation::{RecordingRenderer, SimulatedFace, SimulatedScene};
use crate::Result;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Step between two updates of the demo script
const SCRIPT_STEP: Duration = Duration::from_millis(100);

/// Counts of what the renderer was asked to do during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub created: usize,
    pub moved: usize,
    pub hidden: usize,
    pub removed: usize,
    pub tracked_at_end: usize,
}

/// Tracker running against a simulated scene
pub struct TrackerApp {
    scene: Arc<SimulatedScene>,
    labels: Arc<HoldToggleLabel>,
    renderer: RecordingRenderer,
    presentation: Presentation,
    tracker: FaceTracker,
}

impl TrackerApp {
    /// Validate `config` and wire every component
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing tracker: {:?} mode, {} samples, threshold {}",
            config.registry.mode, config.normalizer.samples, config.registry.movement_threshold
        );

        let view = Arc::new(ViewState::new(config.view.bounds(), config.view.orientation));
        let scene = Arc::new(SimulatedScene::new(Arc::clone(&view)));
        let labels = Arc::new(HoldToggleLabel::from_config(&config.labels));
        let renderer = RecordingRenderer::new();

        let presentation = Presentation::spawn(
            FaceRegistry::from_config(&config.registry),
            Box::new(renderer.clone()),
            HudController::default(),
        )?;

        let pipeline = DetectionPipeline::from_config(config, scene.clone(), scene.clone(), labels.clone(), view);
        let tracker = FaceTracker::new(pipeline, presentation.sender(), &config.cadence);

        Ok(Self {
            scene,
            labels,
            renderer,
            presentation,
            tracker,
        })
    }

    #[must_use]
    pub fn presentation(&self) -> PresentationSender {
        self.presentation.sender()
    }

    /// Scene appeared: start both cadences
    pub fn resume(&mut self) -> Result<()> {
        self.tracker.start()
    }

    /// Scene disappeared: cancel both cadences
    pub fn pause(&mut self) {
        self.tracker.stop();
    }

    /// Run the scripted scene for `duration`.
    ///
    /// A face walks slowly across the view, the label gesture is held for a
    /// while, the face leaves long enough to expire and then comes back
    /// somewhere else.
    pub async fn run_demo(&mut self, duration: Duration) -> Result<RunSummary> {
        self.scene
            .set_tracking_state(TrackingState::Limited(LimitedReason::Initializing));
        self.resume()?;

        let start = Instant::now();
        let total = duration.as_secs_f64().max(f64::EPSILON);
        while start.elapsed() < duration {
            let progress = start.elapsed().as_secs_f64() / total;
            self.apply_script(progress);
            sleep(SCRIPT_STEP).await;
        }

        self.pause();
        let faces = self.presentation.sender().snapshot().await?;
        Ok(self.summary(&faces))
    }

    #[allow(clippy::cast_possible_truncation)] // script offsets are small
    fn apply_script(&self, progress: f64) {
        if progress > 0.1 {
            self.scene.set_tracking_state(TrackingState::Normal);
        }

        let held = (0.2..0.3).contains(&progress);
        if held != self.labels.is_held() {
            self.labels
                .handle(if held { PressPhase::Began } else { PressPhase::Ended });
        }

        let faces = if progress < 0.45 {
            let drift = (progress * 0.4) as f32;
            vec![SimulatedFace::new(
                NormalizedRect::new(0.4 + drift * 0.2, 0.4, 0.2, 0.2),
                WorldPoint::new(drift, 0.0, -1.2),
            )]
        } else if progress < 0.7 {
            Vec::new()
        } else {
            vec![SimulatedFace::new(
                NormalizedRect::new(0.1, 0.5, 0.2, 0.2),
                WorldPoint::new(-0.4, 0.1, -0.9),
            )]
        };
        self.scene.set_faces(faces);
    }

    fn summary(&self, faces: &[TrackedFace]) -> RunSummary {
        RunSummary {
            created: self.renderer.create_count(),
            moved: self.renderer.move_count(),
            hidden: self.renderer.hide_count(),
            removed: self.renderer.remove_count(),
            tracked_at_end: faces.iter().filter(|f| f.is_visible()).count(),
        }
    }

    /// Stop tracking and wait for the presentation thread to drain
    pub fn shutdown(mut self) -> Result<()> {
        self.tracker.stop();
        let Self { presentation, .. } = self;
        presentation.shutdown()
    }
}
