//! Shared test helpers for tapscript-core integration tests.
//!
//! Provides a recorder-backed interpreter for checking what a script
//! dispatched, and a programmable gesture sink for failure and cancellation
//! scenarios.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use tapscript_core::action::{Action, Recorder};
use tapscript_core::command::{Point, ZoomDirection};
use tapscript_core::config::InterpreterConfig;
use tapscript_core::interpreter::{Collaborators, Interpreter, RunReport};
use tapscript_core::parser::parse_with;
use tapscript_core::sink::{GestureSink, ImageLocator, ImageMatch, SinkError};

// ---------------------------------------------------------------------------
// Recorder-backed runs
// ---------------------------------------------------------------------------

/// Default config without the settle pause, so tests don't sleep.
pub fn quiet_config() -> InterpreterConfig {
    InterpreterConfig {
        settle_delay_ms: 0,
        ..InterpreterConfig::default()
    }
}

pub fn recorder_interpreter(config: InterpreterConfig) -> (Arc<Recorder>, Interpreter) {
    let device = Arc::new(Recorder::new());
    let interpreter = Interpreter::new(Collaborators::from_device(device.clone()), config);
    (device, interpreter)
}

/// Parses `source` (which must parse cleanly) and runs it against a fresh
/// recorder.
pub async fn run_source(source: &str, config: InterpreterConfig) -> (Arc<Recorder>, RunReport) {
    let script = parse_with(source, &config.parse_options());
    assert!(script.is_clean(), "unexpected parse errors: {:?}", script.errors);
    let (device, interpreter) = recorder_interpreter(config);
    let report = interpreter.run(&script.commands).await;
    (device, report)
}

/// Tap coordinates in dispatch order.
pub fn taps(device: &Recorder) -> Vec<(i32, i32)> {
    device
        .gestures()
        .into_iter()
        .filter_map(|action| match action {
            Action::Tap { at } => Some((at.x, at.y)),
            _ => None,
        })
        .collect()
}

/// Messages sent to `log_message`, in order.
pub fn log_lines(device: &Recorder) -> Vec<String> {
    device
        .actions()
        .into_iter()
        .filter_map(|action| match action {
            Action::LogMessage { text } => Some(text),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Programmable gesture sink
// ---------------------------------------------------------------------------

/// What the scripted sink does for one gesture call.
#[derive(Debug, Clone)]
pub enum GestureBehavior {
    Succeed,
    Fail(String),
    /// Take this long before succeeding.
    Slow(Duration),
}

/// Gesture sink that plays back a list of behaviors, one per call, then
/// succeeds for every later call. Records the tap points it saw and the
/// highest number of gestures it had in progress at once.
pub struct ScriptedGestures {
    behaviors: Mutex<VecDeque<GestureBehavior>>,
    pub taps: Mutex<Vec<Point>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGestures {
    pub fn new(behaviors: Vec<GestureBehavior>) -> Self {
        Self {
            behaviors: Mutex::new(behaviors.into()),
            taps: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn tap_count(&self) -> usize {
        self.taps.lock().unwrap().len()
    }

    async fn play(&self) -> Result<(), SinkError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let result = self.perform().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn perform(&self) -> Result<(), SinkError> {
        let next = self.behaviors.lock().unwrap().pop_front();
        match next {
            None | Some(GestureBehavior::Succeed) => Ok(()),
            Some(GestureBehavior::Fail(message)) => Err(SinkError::CommandFailed(message)),
            Some(GestureBehavior::Slow(duration)) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl GestureSink for ScriptedGestures {
    async fn tap(&self, at: Point) -> Result<(), SinkError> {
        self.taps.lock().unwrap().push(at);
        self.play().await
    }

    async fn long_press(&self, _at: Point, _duration: Duration) -> Result<(), SinkError> {
        self.play().await
    }

    async fn swipe(&self, _from: Point, _to: Point, _duration: Duration) -> Result<(), SinkError> {
        self.play().await
    }

    async fn zoom(
        &self,
        _center: Point,
        _distance: i32,
        _duration: Duration,
        _direction: ZoomDirection,
    ) -> Result<(), SinkError> {
        self.play().await
    }

    async fn multi_tap(&self, _points: &[Point]) -> Result<(), SinkError> {
        self.play().await
    }

    async fn continuous_swipe(&self, _points: &[Point], _duration: Duration) -> Result<(), SinkError> {
        self.play().await
    }
}

/// Image locator whose every lookup errors.
pub struct BrokenLocator;

#[async_trait]
impl ImageLocator for BrokenLocator {
    async fn find_template(&self, _path: &str) -> Result<ImageMatch, SinkError> {
        Err(SinkError::Timeout)
    }
}

/// Interpreter with a scripted gesture sink and a recorder for logs and images.
pub fn scripted_interpreter(
    behaviors: Vec<GestureBehavior>,
    config: InterpreterConfig,
) -> (Arc<ScriptedGestures>, Arc<Recorder>, Interpreter) {
    let gestures = Arc::new(ScriptedGestures::new(behaviors));
    let recorder = Arc::new(Recorder::new());
    let interpreter = Interpreter::new(
        Collaborators::new(gestures.clone(), recorder.clone(), recorder.clone()),
        config,
    );
    (gestures, recorder, interpreter)
}
