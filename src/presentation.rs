//! The presentation context.
//!
//! One dedicated thread owns the [`FaceRegistry`], the [`AnchorRenderer`] and
//! the HUD. Everything else talks to it through a FIFO command queue, which makes
//! the queue the only serialization point for anchor state: commands for the
//! same face are applied in the order they were submitted, and no lock guards
//! the registry.
//!
//! Commands produced by the cadences carry the session epoch they were started
//! under. Stopping the tracker advances the epoch, so anything still queued or
//! in flight from the old session is discarded on arrival.

use crate::hud::{HudController, TrackingState};
use crate::registry::{FaceEvent, FaceRegistry, Observation, TrackedFace};
use crate::renderer::AnchorRenderer;
use crate::{Error, Result};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

/// Work item for the presentation thread
#[derive(Debug)]
pub enum PresentationCommand {
    /// Apply a stabilized observation
    Observe { epoch: u64, observation: Observation },
    /// Run the expiry sweep at session time `now`
    Sweep { epoch: u64, now: f64 },
    /// Forward a tracking-state change to the HUD
    Tracking { epoch: u64, state: TrackingState },
    /// Reply with a copy of the registry
    Snapshot(oneshot::Sender<Vec<TrackedFace>>),
    /// Stop the thread after the commands queued before it
    Shutdown,
}

/// Cloneable submission side of the presentation queue
#[derive(Debug, Clone)]
pub struct PresentationSender {
    tx: mpsc::UnboundedSender<PresentationCommand>,
    epoch: Arc<AtomicU64>,
}

impl PresentationSender {
    /// Epoch of the current tracking session
    #[must_use]
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Invalidate every command tagged with the current epoch
    pub fn advance_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Queue an observation; `false` once the presentation thread is gone
    pub fn observe(&self, epoch: u64, observation: Observation) -> bool {
        self.send(PresentationCommand::Observe { epoch, observation })
    }

    /// Queue an expiry sweep; `false` once the presentation thread is gone
    pub fn sweep(&self, epoch: u64, now: f64) -> bool {
        self.send(PresentationCommand::Sweep { epoch, now })
    }

    /// Queue a HUD update; `false` once the presentation thread is gone
    pub fn tracking(&self, epoch: u64, state: TrackingState) -> bool {
        self.send(PresentationCommand::Tracking { epoch, state })
    }

    /// Copy of the registry, taken after everything queued so far was applied
    pub async fn snapshot(&self) -> Result<Vec<TrackedFace>> {
        let (reply, response) = oneshot::channel();
        if !self.send(PresentationCommand::Snapshot(reply)) {
            return Err(Error::Runtime("Presentation thread has stopped".to_string()));
        }
        response
            .await
            .map_err(|_| Error::Runtime("Presentation thread dropped snapshot request".to_string()))
    }

    fn send(&self, command: PresentationCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

struct PresentationContext {
    registry: FaceRegistry,
    renderer: Box<dyn AnchorRenderer>,
    hud: HudController,
    epoch: Arc<AtomicU64>,
}

impl PresentationContext {
    fn run(mut self, mut rx: mpsc::UnboundedReceiver<PresentationCommand>) {
        debug!("Presentation thread started");
        while let Some(command) = rx.blocking_recv() {
            match command {
                PresentationCommand::Observe { epoch, observation } => {
                    if self.is_current(epoch) {
                        let event = self.registry.observe(observation, self.renderer.as_mut());
                        log_event(&event);
                    } else {
                        debug!("Discarding observation from cancelled session {}", epoch);
                    }
                }
                PresentationCommand::Sweep { epoch, now } => {
                    if self.is_current(epoch) {
                        for event in self.registry.expire(now, self.renderer.as_mut()) {
                            log_event(&event);
                        }
                    } else {
                        debug!("Discarding sweep from cancelled session {}", epoch);
                    }
                }
                PresentationCommand::Tracking { epoch, state } => {
                    if self.is_current(epoch) {
                        self.hud.update(state);
                    } else {
                        debug!("Discarding tracking state from cancelled session {}", epoch);
                    }
                }
                PresentationCommand::Snapshot(reply) => {
                    let _ = reply.send(self.registry.faces());
                }
                PresentationCommand::Shutdown => break,
            }
        }
        debug!("Presentation thread stopped");
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }
}

fn log_event(event: &FaceEvent) {
    match event {
        FaceEvent::Moved { label, distance } => debug!("Moved {} by {:.3}", label, distance),
        FaceEvent::Refreshed { label, distance } => debug!("Refreshed {} ({:.3} below threshold)", label, distance),
        FaceEvent::Revived { label, anchor } => info!("Revived {} as {}", label, anchor),
        FaceEvent::Dropped { label } => warn!("Lost anchor for {}", label),
        FaceEvent::Created { .. } | FaceEvent::Hidden { .. } | FaceEvent::Removed { .. } => {}
    }
}

/// Owner of the presentation thread
pub struct Presentation {
    sender: PresentationSender,
    thread: Option<JoinHandle<()>>,
}

impl Presentation {
    /// Start the presentation thread with its exclusively owned state
    pub fn spawn(registry: FaceRegistry, renderer: Box<dyn AnchorRenderer>, hud: HudController) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let epoch = Arc::new(AtomicU64::new(0));

        let context = PresentationContext {
            registry,
            renderer,
            hud,
            epoch: Arc::clone(&epoch),
        };

        let thread = std::thread::Builder::new()
            .name("presentation".to_string())
            .spawn(move || context.run(rx))
            .map_err(|e| Error::Runtime(format!("Failed to spawn presentation thread: {e}")))?;

        Ok(Self {
            sender: PresentationSender { tx, epoch },
            thread: Some(thread),
        })
    }

    #[must_use]
    pub fn sender(&self) -> PresentationSender {
        self.sender.clone()
    }

    /// Apply everything already queued, then stop the thread and wait for it
    pub fn shutdown(mut self) -> Result<()> {
        self.sender.send(PresentationCommand::Shutdown);
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| Error::Runtime("Presentation thread panicked".to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for Presentation {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.sender.send(PresentationCommand::Shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WorldPoint;
    use crate::registry::{ExpiryAction, TrackingMode};
    use crate::simulation::RecordingRenderer;

    fn spawn(renderer: &RecordingRenderer) -> Presentation {
        let registry = FaceRegistry::new(TrackingMode::Single, 0.03, 1.5, ExpiryAction::Hide);
        Presentation::spawn(registry, Box::new(renderer.clone()), HudController::default()).unwrap()
    }

    #[tokio::test]
    async fn test_commands_apply_in_order() {
        let renderer = RecordingRenderer::new();
        let presentation = spawn(&renderer);
        let sender = presentation.sender();
        let epoch = sender.current_epoch();

        assert!(sender.observe(epoch, Observation::new("Johan", WorldPoint::new(0.0, 0.0, 0.0), 0.0)));
        assert!(sender.observe(epoch, Observation::new("Johan", WorldPoint::new(0.0, 0.0, 0.5), 0.6)));
        assert!(sender.sweep(epoch, 3.0));

        let faces = sender.snapshot().await.unwrap();
        assert_eq!(faces.len(), 1);
        assert!(!faces[0].is_visible());
        assert_eq!(faces[0].position(), WorldPoint::new(0.0, 0.0, 0.5));
        assert_eq!(renderer.move_count(), 1);
        assert_eq!(renderer.hide_count(), 1);

        presentation.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_old_epoch_is_discarded() {
        let renderer = RecordingRenderer::new();
        let presentation = spawn(&renderer);
        let sender = presentation.sender();

        let old = sender.current_epoch();
        let new = sender.advance_epoch();
        assert_ne!(old, new);

        sender.observe(old, Observation::new("Johan", WorldPoint::origin(), 0.0));
        assert!(sender.snapshot().await.unwrap().is_empty());
        assert!(renderer.commands().is_empty());

        sender.observe(new, Observation::new("Johan", WorldPoint::origin(), 0.0));
        assert_eq!(sender.snapshot().await.unwrap().len(), 1);

        presentation.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_sender_fails_after_shutdown() {
        let renderer = RecordingRenderer::new();
        let presentation = spawn(&renderer);
        let sender = presentation.sender();
        presentation.shutdown().unwrap();

        assert!(!sender.sweep(sender.current_epoch(), 0.0));
        assert!(sender.snapshot().await.is_err());
    }

    #[derive(Clone, Default)]
    struct TitleLog(Arc<std::sync::Mutex<Vec<String>>>);

    impl crate::hud::StatusIndicator for TitleLog {
        fn show_progress(&mut self, title: &str) {
            self.0.lock().unwrap().push(title.to_string());
        }

        fn hide(&mut self) {
            self.0.lock().unwrap().push("hidden".to_string());
        }
    }

    #[tokio::test]
    async fn test_tracking_state_from_old_epoch_is_discarded() {
        use crate::hud::{LimitedReason, TrackingState};

        let titles = TitleLog::default();
        let presentation = Presentation::spawn(
            FaceRegistry::default(),
            Box::new(RecordingRenderer::new()),
            HudController::new(Box::new(titles.clone())),
        )
        .unwrap();
        let sender = presentation.sender();

        let old = sender.current_epoch();
        let new = sender.advance_epoch();
        sender.tracking(old, TrackingState::Limited(LimitedReason::Initializing));
        sender.snapshot().await.unwrap();
        assert!(titles.0.lock().unwrap().is_empty());

        sender.tracking(new, TrackingState::Limited(LimitedReason::Initializing));
        sender.snapshot().await.unwrap();
        assert_eq!(*titles.0.lock().unwrap(), vec!["Initializing"]);

        presentation.shutdown().unwrap();
    }
}
