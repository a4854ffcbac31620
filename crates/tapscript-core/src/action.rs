//! Recorded collaborator calls.
//!
//! [`Recorder`] stands in for a device: it implements every collaborator
//! trait, performs nothing, and keeps an [`ActionRecord`] per call. Hosts use
//! it for dry runs; tests use it to assert exactly what a script dispatched.
//!
//! # Example
//!
//! ```
//! use tapscript_core::action::{Action, Recorder};
//! use tapscript_core::sink::ImageMatch;
//!
//! let recorder = Recorder::new().with_image("ok.png", ImageMatch::at(10, 20, 0.95));
//! assert!(recorder.records().is_empty());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::{Point, ZoomDirection};
use crate::sink::{GestureSink, ImageLocator, ImageMatch, LogSink, SinkError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionResult {
    Success,
    Failure(String),
}

/// One collaborator call.
///
/// Serialized with a `type` tag, one JSON object per line in record files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    Tap {
        at: Point,
    },
    LongPress {
        at: Point,
        duration_ms: u64,
    },
    Swipe {
        from: Point,
        to: Point,
        duration_ms: u64,
    },
    ThreeFingerTap {
        at: Point,
    },
    Zoom {
        center: Point,
        distance: i32,
        duration_ms: u64,
        direction: ZoomDirection,
    },
    MultiTap {
        points: Vec<Point>,
    },
    ContinuousSwipe {
        points: Vec<Point>,
        duration_ms: u64,
    },
    LogMessage {
        text: String,
    },
    LogVariable {
        name: String,
        value: String,
    },
    Overlay {
        text: String,
        duration_ms: u64,
    },
    FindTemplate {
        path: String,
        matched: ImageMatch,
    },
}

impl Action {
    /// Short static name, for tracing fields and summaries.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Tap { .. } => "tap",
            Action::LongPress { .. } => "long_press",
            Action::Swipe { .. } => "swipe",
            Action::ThreeFingerTap { .. } => "three_finger_tap",
            Action::Zoom { .. } => "zoom",
            Action::MultiTap { .. } => "multi_tap",
            Action::ContinuousSwipe { .. } => "continuous_swipe",
            Action::LogMessage { .. } => "log_message",
            Action::LogVariable { .. } => "log_variable",
            Action::Overlay { .. } => "overlay",
            Action::FindTemplate { .. } => "find_template",
        }
    }

    /// Returns true for calls that reach the gesture sink.
    pub fn is_gesture(&self) -> bool {
        matches!(
            self,
            Action::Tap { .. }
                | Action::LongPress { .. }
                | Action::Swipe { .. }
                | Action::ThreeFingerTap { .. }
                | Action::Zoom { .. }
                | Action::MultiTap { .. }
                | Action::ContinuousSwipe { .. }
        )
    }
}

fn fmt_points(f: &mut fmt::Formatter<'_>, points: &[Point]) -> fmt::Result {
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "({}, {})", p.x, p.y)?;
    }
    Ok(())
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        match self {
            Action::Tap { at } | Action::ThreeFingerTap { at } => write!(f, " ({}, {})", at.x, at.y),
            Action::LongPress { at, duration_ms } => {
                write!(f, " ({}, {}) {}ms", at.x, at.y, duration_ms)
            }
            Action::Swipe { from, to, duration_ms } => write!(
                f,
                " ({}, {}) -> ({}, {}) {}ms",
                from.x, from.y, to.x, to.y, duration_ms
            ),
            Action::Zoom {
                center,
                distance,
                duration_ms,
                direction,
            } => write!(
                f,
                " {:?} ({}, {}) by {} {}ms",
                direction, center.x, center.y, distance, duration_ms
            ),
            Action::MultiTap { points } => {
                write!(f, " ")?;
                fmt_points(f, points)
            }
            Action::ContinuousSwipe { points, duration_ms } => {
                write!(f, " ")?;
                fmt_points(f, points)?;
                write!(f, " {}ms", duration_ms)
            }
            Action::LogMessage { text } => write!(f, " {}", text),
            Action::LogVariable { name, value } => write!(f, " {} = {}", name, value),
            Action::Overlay { text, duration_ms } => write!(f, " {} ({}ms)", text, duration_ms),
            Action::FindTemplate { path, matched } if matched.found => write!(
                f,
                " {} found at ({}, {}) confidence {}",
                path, matched.x, matched.y, matched.confidence
            ),
            Action::FindTemplate { path, .. } => write!(f, " {} not found", path),
        }
    }
}

/// A recorded call with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub result: ActionResult,
}

impl ActionRecord {
    pub fn new(action: Action, result: ActionResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            result,
        }
    }
}

/// Dry-run device that records every collaborator call.
///
/// Template lookups are answered from the table given to
/// [`with_image`](Self::with_image); unknown paths are not found. Calls
/// named in [`with_failure`](Self::with_failure) are recorded as failures
/// and return [`SinkError::CommandFailed`].
#[derive(Default)]
pub struct Recorder {
    records: Mutex<Vec<ActionRecord>>,
    images: HashMap<String, ImageMatch>,
    failures: HashMap<String, String>,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, path: impl Into<String>, matched: ImageMatch) -> Self {
        self.images.insert(path.into(), matched);
        self
    }

    pub fn with_images(mut self, images: HashMap<String, ImageMatch>) -> Self {
        self.images.extend(images);
        self
    }

    /// Makes every call whose [`Action::name`] is `action` fail with
    /// `message`. Log calls cannot fail and ignore this table.
    pub fn with_failure(mut self, action: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(action.into(), message.into());
        self
    }

    /// Appends every record to `path` as JSON Lines. The file is created if
    /// missing.
    pub fn with_log_file(self, path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        *lock(&self.writer) = Some(BufWriter::new(file));
        Ok(self)
    }

    /// All records so far, in call order.
    pub fn records(&self) -> Vec<ActionRecord> {
        lock(&self.records).clone()
    }

    pub fn actions(&self) -> Vec<Action> {
        lock(&self.records).iter().map(|r| r.action.clone()).collect()
    }

    /// Only the calls that reached the gesture sink.
    pub fn gestures(&self) -> Vec<Action> {
        lock(&self.records)
            .iter()
            .filter(|r| r.action.is_gesture())
            .map(|r| r.action.clone())
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.records).clear();
    }

    /// Records `action`, failing it when its name is in the failure table.
    fn record(&self, action: Action) -> Result<(), SinkError> {
        let outcome = match self.failures.get(action.name()) {
            Some(message) => Err(SinkError::CommandFailed(message.clone())),
            None => Ok(()),
        };
        let result = match &outcome {
            Ok(()) => ActionResult::Success,
            Err(e) => ActionResult::Failure(e.to_string()),
        };
        let record = ActionRecord::new(action, result);

        if let Some(writer) = lock(&self.writer).as_mut() {
            if let Ok(json) = serde_json::to_string(&record) {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }

        lock(&self.records).push(record);
        outcome
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("records", &lock(&self.records).len())
            .field("images", &self.images.len())
            .field("failures", &self.failures)
            .field("writer", &"<Mutex<Option<BufWriter<File>>>>")
            .finish()
    }
}

/// Locks `mutex`, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[async_trait]
impl GestureSink for Recorder {
    async fn tap(&self, at: Point) -> Result<(), SinkError> {
        self.record(Action::Tap { at })
    }

    async fn long_press(&self, at: Point, duration: Duration) -> Result<(), SinkError> {
        self.record(Action::LongPress {
            at,
            duration_ms: millis(duration),
        })
    }

    async fn swipe(&self, from: Point, to: Point, duration: Duration) -> Result<(), SinkError> {
        self.record(Action::Swipe {
            from,
            to,
            duration_ms: millis(duration),
        })
    }

    async fn three_finger_tap(&self, at: Point) -> Result<(), SinkError> {
        self.record(Action::ThreeFingerTap { at })
    }

    async fn zoom(
        &self,
        center: Point,
        distance: i32,
        duration: Duration,
        direction: ZoomDirection,
    ) -> Result<(), SinkError> {
        self.record(Action::Zoom {
            center,
            distance,
            duration_ms: millis(duration),
            direction,
        })
    }

    async fn multi_tap(&self, points: &[Point]) -> Result<(), SinkError> {
        self.record(Action::MultiTap {
            points: points.to_vec(),
        })
    }

    async fn continuous_swipe(&self, points: &[Point], duration: Duration) -> Result<(), SinkError> {
        self.record(Action::ContinuousSwipe {
            points: points.to_vec(),
            duration_ms: millis(duration),
        })
    }
}

impl LogSink for Recorder {
    fn log_message(&self, text: &str) {
        let _ = self.record(Action::LogMessage {
            text: text.to_string(),
        });
    }

    fn log_variable(&self, name: &str, value: &str) {
        let _ = self.record(Action::LogVariable {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn show_overlay(&self, text: &str, duration: Duration) {
        let _ = self.record(Action::Overlay {
            text: text.to_string(),
            duration_ms: millis(duration),
        });
    }
}

#[async_trait]
impl ImageLocator for Recorder {
    async fn find_template(&self, path: &str) -> Result<ImageMatch, SinkError> {
        let matched = self
            .images
            .get(path)
            .copied()
            .unwrap_or_else(ImageMatch::not_found);
        self.record(Action::FindTemplate {
            path: path.to_string(),
            matched,
        })?;
        Ok(matched)
    }
}
