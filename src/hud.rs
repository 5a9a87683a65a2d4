//! Tracking-state HUD.
//!
//! The HUD is purely informational: it shows a progress indicator while the
//! session initializes and hides it once tracking works. Nothing in the tracker
//! depends on it.

use crate::constants::HUD_INITIALIZING_TITLE;
use log::{debug, info};

/// Why world tracking is running in a degraded mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitedReason {
    Initializing,
    ExcessiveMotion,
    InsufficientFeatures,
    Relocalizing,
}

/// World-tracking quality reported by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    NotAvailable,
    Limited(LimitedReason),
    Normal,
}

/// On-screen status widget
pub trait StatusIndicator: Send {
    /// Show a progress indicator with a title
    fn show_progress(&mut self, title: &str);

    /// Hide whatever is shown
    fn hide(&mut self);
}

/// Indicator that only logs; used when no HUD is attached
#[derive(Debug, Default)]
pub struct LogIndicator;

impl StatusIndicator for LogIndicator {
    fn show_progress(&mut self, title: &str) {
        info!("HUD: {}", title);
    }

    fn hide(&mut self) {
        debug!("HUD hidden");
    }
}

/// Forwards tracking-state transitions to a status indicator
pub struct HudController {
    indicator: Box<dyn StatusIndicator>,
    last_state: Option<TrackingState>,
}

impl HudController {
    #[must_use]
    pub fn new(indicator: Box<dyn StatusIndicator>) -> Self {
        Self {
            indicator,
            last_state: None,
        }
    }

    /// Apply a tracking state; repeated states are ignored.
    ///
    /// Returns `true` when the state changed.
    pub fn update(&mut self, state: TrackingState) -> bool {
        if self.last_state == Some(state) {
            return false;
        }
        self.last_state = Some(state);

        match state {
            TrackingState::Limited(LimitedReason::Initializing) => {
                self.indicator.show_progress(HUD_INITIALIZING_TITLE);
            }
            TrackingState::NotAvailable => info!("Not available"),
            _ => self.indicator.hide(),
        }
        true
    }

    #[must_use]
    pub fn state(&self) -> Option<TrackingState> {
        self.last_state
    }
}

impl Default for HudController {
    fn default() -> Self {
        Self::new(Box::new(LogIndicator))
    }
}
