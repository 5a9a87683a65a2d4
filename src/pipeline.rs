//! Detection pipeline and its two cadences.
//!
//! [`DetectionPipeline::run_cycle`] is one detection tick: grab a frame, find
//! faces, map each box onto the screen and turn it into a stabilized world
//! position. It is pure computation plus blocking sampling delays, so the
//! [`FaceTracker`] runs it on tokio's blocking pool and only hands the
//! resulting observations to the presentation thread.
//!
//! The tracker owns two periodic tasks:
//! - detection, every 0.6 s by default; a tick never starts before the previous
//!   one delivered its observations
//! - staleness, every 1.0 s by default, queueing an expiry sweep
//!
//! Stopping aborts both tasks and advances the presentation epoch, so results
//! of a cycle that was still sampling are dropped.

use crate::config::{CadenceConfig, Config};
use crate::detection::{reorient, FaceDetector, ImageRotation};
use crate::geometry::{transform_bounding_box, ViewState};
use crate::gesture::LabelSource;
use crate::hud::TrackingState;
use crate::normalizer::CoordinateNormalizer;
use crate::presentation::PresentationSender;
use crate::registry::Observation;
use crate::session::FrameSource;
use crate::{Error, Result};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// One detection tick, from frame to observations
pub struct DetectionPipeline {
    source: Arc<dyn FrameSource>,
    detector: Arc<dyn FaceDetector>,
    labels: Arc<dyn LabelSource>,
    view: Arc<ViewState>,
    normalizer: CoordinateNormalizer,
    image_rotation: ImageRotation,
}

impl DetectionPipeline {
    #[must_use]
    pub fn new(
        source: Arc<dyn FrameSource>,
        detector: Arc<dyn FaceDetector>,
        labels: Arc<dyn LabelSource>,
        view: Arc<ViewState>,
        normalizer: CoordinateNormalizer,
        image_rotation: ImageRotation,
    ) -> Self {
        Self {
            source,
            detector,
            labels,
            view,
            normalizer,
            image_rotation,
        }
    }

    /// Build a pipeline with the normalizer and rotation from `config`
    #[must_use]
    pub fn from_config(
        config: &Config,
        source: Arc<dyn FrameSource>,
        detector: Arc<dyn FaceDetector>,
        labels: Arc<dyn LabelSource>,
        view: Arc<ViewState>,
    ) -> Self {
        Self::new(
            source,
            detector,
            labels,
            view,
            CoordinateNormalizer::from_config(&config.normalizer),
            config.view.image_rotation,
        )
    }

    /// Run one detection tick.
    ///
    /// Missing frames, detector errors and faces without usable hit-tests all
    /// yield fewer (possibly zero) observations; nothing here fails.
    /// Observations keep the detector's order.
    pub fn run_cycle(&self) -> Vec<Observation> {
        let Some(frame) = self.source.current_frame() else {
            debug!("No frame available");
            return Vec::new();
        };

        let image = reorient(&frame.image, self.image_rotation);
        let detections = match self.detector.detect(&image) {
            Ok(detections) => detections,
            Err(e) => {
                warn!("Face request error: {}", e);
                return Vec::new();
            }
        };
        if detections.is_empty() {
            debug!("No face observations");
            return Vec::new();
        }

        let (bounds, orientation) = self.view.get();
        detections
            .iter()
            .filter_map(|detection| {
                let rect = transform_bounding_box(&detection.bbox, bounds, orientation);
                let position = self.normalizer.normalize(self.source.as_ref(), &rect)?;
                Some(Observation::new(self.labels.current_label(), position, frame.timestamp))
            })
            .collect()
    }

    /// Session clock time, used to time the expiry sweep
    #[must_use]
    pub fn now(&self) -> f64 {
        self.source.now()
    }

    #[must_use]
    pub fn tracking_state(&self) -> TrackingState {
        self.source.tracking_state()
    }
}

/// Runs the detection and staleness cadences for one scene
pub struct FaceTracker {
    pipeline: Arc<DetectionPipeline>,
    presentation: PresentationSender,
    detection_interval: Duration,
    staleness_interval: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl FaceTracker {
    #[must_use]
    pub fn new(pipeline: DetectionPipeline, presentation: PresentationSender, cadence: &CadenceConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            presentation,
            detection_interval: cadence.detection_interval(),
            staleness_interval: cadence.staleness_interval(),
            tasks: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Start both cadences; a no-op while already running.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime
    pub fn start(&mut self) -> Result<()> {
        if self.is_active() {
            return Ok(());
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Runtime(format!("Tracker needs a tokio runtime: {e}")))?;

        let epoch = self.presentation.current_epoch();
        info!("Starting face tracking (session {})", epoch);

        self.tasks.push(runtime.spawn(detection_loop(
            Arc::clone(&self.pipeline),
            self.presentation.clone(),
            self.detection_interval,
            epoch,
        )));
        self.tasks.push(runtime.spawn(staleness_loop(
            Arc::clone(&self.pipeline),
            self.presentation.clone(),
            self.staleness_interval,
            epoch,
        )));
        Ok(())
    }

    /// Cancel both cadences and discard their in-flight results; idempotent
    pub fn stop(&mut self) {
        if !self.is_active() {
            return;
        }
        let epoch = self.presentation.advance_epoch();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Stopped face tracking (next session {})", epoch);
    }
}

impl Drop for FaceTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn detection_loop(
    pipeline: Arc<DetectionPipeline>,
    presentation: PresentationSender,
    period: Duration,
    epoch: u64,
) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticks.tick().await;

        if !presentation.tracking(epoch, pipeline.tracking_state()) {
            return;
        }

        let worker = Arc::clone(&pipeline);
        let observations = match tokio::task::spawn_blocking(move || worker.run_cycle()).await {
            Ok(observations) => observations,
            Err(e) => {
                warn!("Detection cycle failed: {}", e);
                continue;
            }
        };

        for observation in observations {
            if !presentation.observe(epoch, observation) {
                return;
            }
        }
    }
}

async fn staleness_loop(
    pipeline: Arc<DetectionPipeline>,
    presentation: PresentationSender,
    period: Duration,
    epoch: u64,
) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticks.tick().await;
        if !presentation.sweep(epoch, pipeline.now()) {
            return;
        }
    }
}
