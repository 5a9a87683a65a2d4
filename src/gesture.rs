//! Label selection from the press-and-hold gesture.

use crate::config::LabelConfig;
use std::sync::atomic::{AtomicBool, Ordering};

/// Phase of a long-press gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressPhase {
    Began,
    Changed,
    Ended,
    Cancelled,
}

/// Supplies the label attached to the next observation
pub trait LabelSource: Send + Sync {
    fn current_label(&self) -> String;
}

/// Primary label normally, alternate label while the press is held
#[derive(Debug)]
pub struct HoldToggleLabel {
    primary: String,
    alternate: String,
    held: AtomicBool,
}

impl HoldToggleLabel {
    #[must_use]
    pub fn new(primary: impl Into<String>, alternate: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            alternate: alternate.into(),
            held: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn from_config(config: &LabelConfig) -> Self {
        Self::new(config.primary.clone(), config.alternate.clone())
    }

    /// Feed a gesture phase; movement while held changes nothing
    pub fn handle(&self, phase: PressPhase) {
        match phase {
            PressPhase::Began => self.held.store(true, Ordering::Relaxed),
            PressPhase::Ended | PressPhase::Cancelled => self.held.store(false, Ordering::Relaxed),
            PressPhase::Changed => {}
        }
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }
}

impl LabelSource for HoldToggleLabel {
    fn current_label(&self) -> String {
        if self.is_held() {
            self.alternate.clone()
        } else {
            self.primary.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_toggles_label() {
        let labels = HoldToggleLabel::from_config(&LabelConfig::default());
        assert_eq!(labels.current_label(), "Johan");

        labels.handle(PressPhase::Began);
        assert_eq!(labels.current_label(), "Danny");
        labels.handle(PressPhase::Changed);
        assert_eq!(labels.current_label(), "Danny");

        labels.handle(PressPhase::Ended);
        assert_eq!(labels.current_label(), "Johan");
    }

    #[test]
    fn test_cancel_releases() {
        let labels = HoldToggleLabel::new("A", "B");
        labels.handle(PressPhase::Began);
        labels.handle(PressPhase::Cancelled);
        assert!(!labels.is_held());
        assert_eq!(labels.current_label(), "A");
    }
}
