//! Collaborator traits the interpreter drives.
//!
//! The interpreter never touches a device directly. Hosts inject three
//! collaborators through [`Collaborators`](crate::interpreter::Collaborators):
//!
//! - [`GestureSink`] performs touch gestures (async, awaited per command)
//! - [`LogSink`] receives log lines and overlay messages (fire-and-forget)
//! - [`ImageLocator`] finds a template image on screen (async)
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use tapscript_core::command::Point;
//! use tapscript_core::sink::{GestureSink, SinkError};
//!
//! struct Noop;
//!
//! #[async_trait]
//! impl GestureSink for Noop {
//!     async fn tap(&self, _at: Point) -> Result<(), SinkError> { Ok(()) }
//!     async fn long_press(&self, _at: Point, _d: Duration) -> Result<(), SinkError> { Ok(()) }
//!     async fn swipe(&self, _from: Point, _to: Point, _d: Duration) -> Result<(), SinkError> { Ok(()) }
//!     async fn zoom(
//!         &self,
//!         _center: Point,
//!         _distance: i32,
//!         _d: Duration,
//!         _direction: tapscript_core::command::ZoomDirection,
//!     ) -> Result<(), SinkError> { Ok(()) }
//!     async fn multi_tap(&self, _points: &[Point]) -> Result<(), SinkError> { Ok(()) }
//!     async fn continuous_swipe(&self, _points: &[Point], _d: Duration) -> Result<(), SinkError> { Ok(()) }
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::command::{three_finger_points, Point, ZoomDirection};

/// Errors reported by a collaborator.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The collaborator rejected or failed the request.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The collaborator is not available (service not bound, permission missing).
    #[error("Collaborator unavailable")]
    Unavailable,

    /// The request did not complete in time.
    #[error("Operation timed out")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Performs touch gestures on the device.
///
/// Each call resolves once the gesture has been handed to the platform.
/// Multi-finger gestures are single dispatches containing several
/// simultaneous strokes.
#[async_trait]
pub trait GestureSink: Send + Sync {
    /// Single tap at `at`.
    async fn tap(&self, at: Point) -> Result<(), SinkError>;

    /// Press and hold at `at` for `duration`.
    async fn long_press(&self, at: Point, duration: Duration) -> Result<(), SinkError>;

    /// Linear drag from `from` to `to` over `duration`.
    async fn swipe(&self, from: Point, to: Point, duration: Duration) -> Result<(), SinkError>;

    /// Three simultaneous taps around `at`.
    ///
    /// The default implementation dispatches a [`multi_tap`](Self::multi_tap)
    /// of [`three_finger_points`].
    async fn three_finger_tap(&self, at: Point) -> Result<(), SinkError> {
        self.multi_tap(&three_finger_points(at)).await
    }

    /// Two-finger spread (`In`) or pinch (`Out`) around `center`.
    ///
    /// See [`zoom_strokes`](crate::command::zoom_strokes) for the stroke
    /// geometry.
    async fn zoom(
        &self,
        center: Point,
        distance: i32,
        duration: Duration,
        direction: ZoomDirection,
    ) -> Result<(), SinkError>;

    /// Simultaneous taps at every point.
    async fn multi_tap(&self, points: &[Point]) -> Result<(), SinkError>;

    /// One continuous stroke through every point over `duration`.
    async fn continuous_swipe(&self, points: &[Point], duration: Duration) -> Result<(), SinkError>;
}

/// Receives script log output.
pub trait LogSink: Send + Sync {
    fn log_message(&self, text: &str);

    fn log_variable(&self, name: &str, value: &str);

    /// Shows `text` on screen for `duration`.
    fn show_overlay(&self, text: &str, duration: Duration);
}

/// Result of a template lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageMatch {
    pub found: bool,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub confidence: f64,
}

impl ImageMatch {
    pub fn at(x: i32, y: i32, confidence: f64) -> Self {
        Self {
            found: true,
            x,
            y,
            confidence,
        }
    }

    pub fn not_found() -> Self {
        Self {
            found: false,
            x: -1,
            y: -1,
            confidence: 0.0,
        }
    }
}

/// Finds a template image on the current screen.
///
/// Implementations may take arbitrarily long; the interpreter awaits the
/// future on its own task and never blocks the host's scheduler.
#[async_trait]
pub trait ImageLocator: Send + Sync {
    async fn find_template(&self, path: &str) -> Result<ImageMatch, SinkError>;
}

/// [`LogSink`] that forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log_message(&self, text: &str) {
        info!(target: "tapscript::script", "{}", text);
    }

    fn log_variable(&self, name: &str, value: &str) {
        info!(target: "tapscript::script", variable = name, value, "variable");
    }

    fn show_overlay(&self, text: &str, duration: Duration) {
        info!(
            target: "tapscript::script",
            duration_ms = duration.as_millis() as u64,
            "overlay: {}",
            text
        );
    }
}

/// [`ImageLocator`] for hosts without template matching. Every lookup
/// reports not found.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImageLocator;

#[async_trait]
impl ImageLocator for NoImageLocator {
    async fn find_template(&self, _path: &str) -> Result<ImageMatch, SinkError> {
        Ok(ImageMatch::not_found())
    }
}
