//! Script execution.
//!
//! The [`Interpreter`] walks a parsed command tree against its injected
//! [`Collaborators`]. Each run gets a fresh [`ExecutionContext`] and a
//! [`CancellationToken`] that acts as the running flag: the script's own
//! `stop` command and an external [`Interpreter::stop`] both cancel it, and
//! every sequence walk and loop checks it before doing more work.
//!
//! Per-command failures never abort a run. They are logged, collected in
//! [`RunReport::errors`] and the command becomes a no-op.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tapscript_core::action::Recorder;
//! use tapscript_core::config::InterpreterConfig;
//! use tapscript_core::interpreter::{Collaborators, Interpreter};
//! use tapscript_core::parser::parse;
//!
//! # async fn example() {
//! let device = Arc::new(Recorder::new());
//! let interpreter = Interpreter::new(Collaborators::from_device(device.clone()), InterpreterConfig::default());
//!
//! let script = parse("repeat 3\nclick 100 200\nend");
//! let report = interpreter.run(&script.commands).await;
//! assert_eq!(device.gestures().len(), 3);
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::command::{Command, CommandKind, SetValue};
use crate::condition::evaluate_condition;
use crate::config::{InterpreterConfig, LabelResolution};
use crate::context::{collect_labels, ExecutionContext, LabelTable, LabelTarget};
use crate::error::{RunError, RuntimeError};
use crate::sink::{GestureSink, ImageLocator, ImageMatch, LogSink, SinkError};
use crate::value::Value;

/// The services a run drives.
#[derive(Clone)]
pub struct Collaborators {
    pub gestures: Arc<dyn GestureSink>,
    pub logs: Arc<dyn LogSink>,
    pub images: Arc<dyn ImageLocator>,
}

impl Collaborators {
    pub fn new(
        gestures: Arc<dyn GestureSink>,
        logs: Arc<dyn LogSink>,
        images: Arc<dyn ImageLocator>,
    ) -> Self {
        Self {
            gestures,
            logs,
            images,
        }
    }

    /// Uses one object for all three roles.
    pub fn from_device<D>(device: Arc<D>) -> Self
    where
        D: GestureSink + LogSink + ImageLocator + 'static,
    {
        Self {
            gestures: device.clone(),
            logs: device.clone(),
            images: device,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Ran off the end of the script.
    Completed,
    /// The script executed `stop`.
    Stopped,
    /// Cancelled from outside.
    Cancelled,
}

#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Commands dispatched, counting every loop iteration.
    pub steps: usize,
    pub errors: Vec<RuntimeError>,
    pub variables: HashMap<String, Value>,
}

impl RunReport {
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }
}

/// A run spawned by [`Interpreter::start`].
#[derive(Debug)]
pub struct RunHandle {
    token: CancellationToken,
    task: JoinHandle<RunReport>,
}

impl RunHandle {
    /// Requests cancellation. The run stops at its next check.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub async fn wait(self) -> Result<RunReport, RunError> {
        Ok(self.task.await?)
    }
}

/// Runs scripts against a fixed set of collaborators.
///
/// Runs are serialized: a run only begins dispatching once the previous one
/// has returned, so gestures from two runs never overlap.
pub struct Interpreter {
    collaborators: Collaborators,
    config: InterpreterConfig,
    active: Mutex<Option<CancellationToken>>,
    run_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Interpreter {
    pub fn new(collaborators: Collaborators, config: InterpreterConfig) -> Self {
        Self {
            collaborators,
            config,
            active: Mutex::new(None),
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Runs `commands` to completion on the current task.
    pub async fn run(&self, commands: &[Command]) -> RunReport {
        self.run_with_token(commands, CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), stopping early once `token` is cancelled.
    ///
    /// A script `stop` ends the run without cancelling `token` itself.
    pub async fn run_with_token(&self, commands: &[Command], token: CancellationToken) -> RunReport {
        let _guard = self.run_lock.lock().await;
        Run::new(self.collaborators.clone(), self.config.clone(), token.child_token())
            .execute(commands)
            .await
    }

    /// Spawns a run on the tokio runtime, cancelling the previous one.
    ///
    /// The new run waits for the cancelled one to unwind before its first
    /// command.
    pub fn start(&self, commands: Vec<Command>) -> RunHandle {
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.active).replace(token.clone()) {
            debug!("cancelling previous run");
            previous.cancel();
        }

        let run = Run::new(self.collaborators.clone(), self.config.clone(), token.clone());
        let run_lock = self.run_lock.clone();
        let task = tokio::spawn(async move {
            let _guard = run_lock.lock_owned().await;
            run.execute(&commands).await
        });

        RunHandle { token, task }
    }

    /// Cancels the active run, if any.
    pub fn stop(&self) {
        if let Some(token) = lock(&self.active).take() {
            token.cancel();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn millis(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

/// Text form of a match confidence. Whole numbers keep one decimal so a
/// miss reads `0.0`.
fn format_confidence(confidence: f64) -> String {
    if confidence.is_finite() && confidence.fract() == 0.0 {
        format!("{:.1}", confidence)
    } else {
        confidence.to_string()
    }
}

/// What a walk or step tells its caller to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// Resume the sequence owning `scope` at `index`, unwinding anything nested.
    Jump(LabelTarget),
    /// The running flag was cleared.
    Halt,
}

type FlowFuture<'a> = Pin<Box<dyn Future<Output = Flow> + Send + 'a>>;

/// State of one run.
struct Run {
    collaborators: Collaborators,
    config: InterpreterConfig,
    ctx: ExecutionContext,
    token: CancellationToken,
    steps: usize,
    errors: Vec<RuntimeError>,
    call_depth: usize,
    stopped_by_script: bool,
}

impl Run {
    fn new(collaborators: Collaborators, config: InterpreterConfig, token: CancellationToken) -> Self {
        Self {
            collaborators,
            config,
            ctx: ExecutionContext::new(),
            token,
            steps: 0,
            errors: Vec::new(),
            call_depth: 0,
            stopped_by_script: false,
        }
    }

    async fn execute(mut self, commands: &[Command]) -> RunReport {
        let span = info_span!("run", run_id = %Uuid::new_v4(), commands = commands.len());
        async {
            self.walk(commands).await;
        }
        .instrument(span.clone())
        .await;

        let outcome = if self.stopped_by_script {
            RunOutcome::Stopped
        } else if self.token.is_cancelled() {
            RunOutcome::Cancelled
        } else {
            RunOutcome::Completed
        };
        span.in_scope(|| {
            info!(?outcome, steps = self.steps, errors = self.errors.len(), "run finished");
        });

        RunReport {
            outcome,
            steps: self.steps,
            errors: self.errors,
            variables: self.ctx.snapshot_variables(),
        }
    }

    fn fail(&mut self, error: RuntimeError) {
        warn!(line = error.line(), error = %error, "command failed");
        self.errors.push(error);
    }

    /// Walks one sequence with its own label scope.
    fn walk<'a>(&'a mut self, commands: &'a [Command]) -> FlowFuture<'a> {
        Box::pin(async move {
            let table = match self.config.label_resolution {
                LabelResolution::Eager => collect_labels(commands),
                LabelResolution::Lazy => LabelTable::new(),
            };
            let scope = self.ctx.labels.push(table);

            let mut index = 0;
            let flow = loop {
                if self.token.is_cancelled() {
                    break Flow::Halt;
                }
                let Some(cmd) = commands.get(index) else {
                    break Flow::Continue;
                };
                match self.step(cmd, index).await {
                    Flow::Continue => index += 1,
                    Flow::Jump(target) if target.scope == scope => index = target.index,
                    other => break other,
                }
            };

            self.ctx.labels.pop();
            flow
        })
    }

    fn step<'a>(&'a mut self, cmd: &'a Command, index: usize) -> FlowFuture<'a> {
        Box::pin(async move {
            self.steps += 1;
            let line = cmd.line;
            debug!(line, command = cmd.kind.name(), "dispatch");

            match &cmd.kind {
                CommandKind::Click { .. }
                | CommandKind::ThreeFingerTap { .. }
                | CommandKind::LongPress { .. }
                | CommandKind::Swipe { .. }
                | CommandKind::Zoom { .. }
                | CommandKind::MultiTap { .. }
                | CommandKind::SwipePath { .. } => {
                    if let Err(source) = self.dispatch_gesture(&cmd.kind).await {
                        self.fail(RuntimeError::Collaborator {
                            action: cmd.kind.name(),
                            line,
                            source,
                        });
                    }
                    let settle = self.config.settle_delay();
                    if !settle.is_zero() {
                        tokio::time::sleep(settle).await;
                    }
                    Flow::Continue
                }

                CommandKind::Delay { ms } => {
                    tokio::time::sleep(millis(*ms)).await;
                    Flow::Continue
                }

                CommandKind::Stop => {
                    info!(line, "script requested stop");
                    self.stopped_by_script = true;
                    self.token.cancel();
                    Flow::Halt
                }

                CommandKind::Set { name, value } => {
                    self.assign(name, value, line);
                    Flow::Continue
                }

                CommandKind::Get { name } => {
                    match self.ctx.variable(name) {
                        Some(value) => debug!(line, variable = %name, %value, "get"),
                        None => debug!(line, variable = %name, "get: unset"),
                    }
                    Flow::Continue
                }

                CommandKind::Label { name } => {
                    if self.config.label_resolution == LabelResolution::Lazy {
                        self.ctx.labels.register(name, index);
                    }
                    Flow::Continue
                }

                CommandKind::Goto { label } => self.jump(label, line),

                CommandKind::GotoIf { condition, label } => {
                    if evaluate_condition(condition, &self.ctx) {
                        self.jump(label, line)
                    } else {
                        Flow::Continue
                    }
                }

                CommandKind::Log { message } => {
                    let text = self.ctx.interpolate(message);
                    self.collaborators.logs.log_message(&text);
                    Flow::Continue
                }

                CommandKind::Logs { message } => {
                    let text = self.ctx.interpolate(message);
                    self.collaborators
                        .logs
                        .show_overlay(&text, self.config.overlay_duration());
                    Flow::Continue
                }

                CommandKind::LogVar { name } => {
                    let value = self
                        .ctx
                        .variable(name)
                        .map(Value::as_text)
                        .unwrap_or_else(|| "0".to_string());
                    self.collaborators.logs.log_variable(name, &value);
                    Flow::Continue
                }

                CommandKind::FindImagePosition {
                    path,
                    x_var,
                    y_var,
                    confidence_var,
                } => {
                    let matched = match self.collaborators.images.find_template(path).await {
                        Ok(m) if m.found => m,
                        Ok(_) => ImageMatch::not_found(),
                        Err(source) => {
                            self.fail(RuntimeError::Collaborator {
                                action: "findimageposition",
                                line,
                                source,
                            });
                            ImageMatch::not_found()
                        }
                    };
                    debug!(line, path = %path, found = matched.found, "image lookup");
                    self.ctx.set_variable(x_var.as_str(), Value::Number(matched.x.into()));
                    self.ctx.set_variable(y_var.as_str(), Value::Number(matched.y.into()));
                    if let Some(var) = confidence_var {
                        self.ctx
                            .set_variable(var.as_str(), Value::Text(format_confidence(matched.confidence)));
                    }
                    Flow::Continue
                }

                CommandKind::Function { name, body } => {
                    self.ctx.define_function(name.as_str(), Arc::from(body.as_slice()));
                    Flow::Continue
                }

                CommandKind::Call { name } => self.call(name, line).await,

                CommandKind::If {
                    condition,
                    then_block,
                    else_block,
                } => {
                    if evaluate_condition(condition, &self.ctx) {
                        self.walk(then_block).await
                    } else {
                        self.walk(else_block).await
                    }
                }

                CommandKind::While { condition, body } => {
                    loop {
                        if self.token.is_cancelled() {
                            return Flow::Halt;
                        }
                        if !evaluate_condition(condition, &self.ctx) {
                            break;
                        }
                        match self.walk(body).await {
                            Flow::Continue => {}
                            other => return other,
                        }
                        tokio::task::yield_now().await;
                    }
                    Flow::Continue
                }

                CommandKind::Repeat {
                    count,
                    counter,
                    body,
                } => {
                    for iteration in 1..=*count {
                        if self.token.is_cancelled() {
                            return Flow::Halt;
                        }
                        if let Some(name) = counter {
                            self.ctx.set_counter(name.as_str(), i64::from(iteration));
                        }
                        match self.walk(body).await {
                            Flow::Continue => {}
                            other => return other,
                        }
                    }
                    Flow::Continue
                }
            }
        })
    }

    async fn dispatch_gesture(&self, kind: &CommandKind) -> Result<(), SinkError> {
        let gestures = &self.collaborators.gestures;
        match kind {
            CommandKind::Click { at } => gestures.tap(*at).await,
            CommandKind::ThreeFingerTap { at } => gestures.three_finger_tap(*at).await,
            CommandKind::LongPress { at, duration_ms } => gestures.long_press(*at, millis(*duration_ms)).await,
            CommandKind::Swipe {
                from,
                to,
                duration_ms,
            } => gestures.swipe(*from, *to, millis(*duration_ms)).await,
            CommandKind::Zoom {
                center,
                distance,
                duration_ms,
                direction,
            } => {
                gestures
                    .zoom(*center, *distance, millis(*duration_ms), *direction)
                    .await
            }
            CommandKind::MultiTap { points } => gestures.multi_tap(points).await,
            CommandKind::SwipePath { points, duration_ms } => {
                gestures.continuous_swipe(points, millis(*duration_ms)).await
            }
            _ => Ok(()),
        }
    }

    fn assign(&mut self, name: &str, value: &SetValue, line: usize) {
        let value = match value {
            SetValue::Literal(token) => self.ctx.resolve_token(token),
            SetValue::Binary { lhs, op, rhs } if self.config.set_arithmetic => {
                let left = self.ctx.resolve_token(lhs).as_number();
                let right = self.ctx.resolve_token(rhs).as_number();
                match op.apply(left, right) {
                    Some(result) => Value::Number(result),
                    None => {
                        self.fail(RuntimeError::Arithmetic {
                            expression: format!("{} {} {}", left, op.symbol(), right),
                            line,
                        });
                        return;
                    }
                }
            }
            SetValue::Binary { lhs, op, rhs } => Value::Text(format!("{} {} {}", lhs, op.symbol(), rhs)),
        };
        self.ctx.set_variable(name, value);
    }

    fn jump(&mut self, label: &str, line: usize) -> Flow {
        match self.ctx.labels.resolve(label) {
            Some(target) => {
                debug!(line, label, scope = target.scope, index = target.index, "goto");
                Flow::Jump(target)
            }
            None => {
                self.fail(RuntimeError::LabelNotFound {
                    label: label.to_string(),
                    line,
                });
                Flow::Continue
            }
        }
    }

    async fn call(&mut self, name: &str, line: usize) -> Flow {
        let Some(body) = self.ctx.function(name) else {
            self.fail(RuntimeError::FunctionNotFound {
                name: name.to_string(),
                line,
            });
            return Flow::Continue;
        };
        if self.call_depth >= self.config.max_call_depth {
            self.fail(RuntimeError::CallDepthExceeded {
                name: name.to_string(),
                line,
                max_depth: self.config.max_call_depth,
            });
            return Flow::Continue;
        }

        let floor = self.ctx.labels.enter_call();
        self.call_depth += 1;
        let flow = self.walk(&body).await;
        self.call_depth -= 1;
        self.ctx.labels.exit_call(floor);

        match flow {
            Flow::Halt => Flow::Halt,
            _ => Flow::Continue,
        }
    }
}
