//! Face anchor library: stable AR label anchors for detected faces.
//!
//! This library turns a stream of 2D face detections into floating labels
//! anchored in the physical world:
//! - Face boxes are mapped onto the screen for the current device orientation
//! - A burst of feature-point hit-tests under each face is averaged into one
//!   stable world position
//! - A registry decides per face whether to create, move, relabel or hide its
//!   anchor, with a movement threshold against jitter and a staleness window
//!   for faces that left the frame
//!
//! Camera session, face detector, renderer, HUD and gesture input are external
//! collaborators behind the traits in [`session`], [`detection`],
//! [`renderer`], [`hud`] and [`gesture`].
//!
//! # Examples
//!
//! ## Registry
//!
//! ```
//! use face_anchor::geometry::WorldPoint;
//! use face_anchor::registry::{FaceEvent, FaceRegistry, Observation};
//! use face_anchor::simulation::RecordingRenderer;
//!
//! let mut renderer = RecordingRenderer::new();
//! let mut registry = FaceRegistry::default();
//!
//! let first = registry.observe(Observation::new("Johan", WorldPoint::new(0.0, 0.0, -1.0), 0.0), &mut renderer);
//! assert!(matches!(first, FaceEvent::Created { .. }));
//!
//! // 2 cm is below the movement threshold: refreshed, not moved
//! let second = registry.observe(Observation::new("Johan", WorldPoint::new(0.0, 0.0, -1.02), 0.6), &mut renderer);
//! assert!(matches!(second, FaceEvent::Refreshed { .. }));
//!
//! // Nothing seen for more than 1.5 s: the sweep hides the anchor
//! assert_eq!(registry.expire(2.5, &mut renderer).len(), 1);
//! ```
//!
//! ## Running the tracker
//!
//! ```no_run
//! use face_anchor::app::TrackerApp;
//! use face_anchor::config::Config;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut app = TrackerApp::new(&Config::default())?;
//! let summary = app.run_demo(Duration::from_secs(5)).await?;
//! println!("created {} anchors", summary.created);
//! app.shutdown()?;
//! # Ok(())
//! # }
//! ```

/// Error types and result handling
pub mod error;

/// Constants used throughout the tracker
pub mod constants;

/// Configuration management
pub mod config;

/// Screen and world geometry, bounding-box transform
pub mod geometry;

/// Camera session interface
pub mod session;

/// Face detector interface and image reorientation
pub mod detection;

/// Hit-test averaging into stable world positions
pub mod normalizer;

/// Anchor renderer interface
pub mod renderer;

/// Per-face liveness state
pub mod registry;

/// Presentation thread owning registry and renderer
pub mod presentation;

/// Detection cycle and tracker cadences
pub mod pipeline;

/// Label selection from the press-and-hold gesture
pub mod gesture;

/// Tracking-state HUD
pub mod hud;

/// Scripted collaborators for demos and tests
pub mod simulation;

/// Application wiring and demo
pub mod app;

pub use error::{Error, Result};
