//! Parsed script commands.
//!
//! A script parses into a tree of [`Command`] nodes. Leaf commands carry only
//! literal parameters resolved at parse time; compound commands (`if`,
//! `while`, `repeat`, `fun`) own their nested sequences outright.
//!
//! # Example
//!
//! ```
//! use tapscript_core::command::{Command, CommandKind, Point};
//!
//! let cmd = Command::new(CommandKind::Click { at: Point::new(120, 640) }, 1);
//! assert_eq!(cmd.kind.name(), "click");
//! ```

use serde::{Deserialize, Serialize};

/// Pixel offset between the fingers of a three-finger tap.
pub const THREE_FINGER_OFFSET: i32 = 20;

/// A screen coordinate in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Whether a zoom spreads two fingers apart or pinches them together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomDirection {
    /// Fingers move apart from the center.
    In,
    /// Fingers move toward the center.
    Out,
}

/// Operator of a `set name lhs op rhs` assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(ArithOp::Add),
            "-" => Some(ArithOp::Sub),
            "*" => Some(ArithOp::Mul),
            "/" => Some(ArithOp::Div),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }

    /// Applies the operator. Returns `None` on division by zero or overflow.
    pub fn apply(&self, lhs: i64, rhs: i64) -> Option<i64> {
        match self {
            ArithOp::Add => lhs.checked_add(rhs),
            ArithOp::Sub => lhs.checked_sub(rhs),
            ArithOp::Mul => lhs.checked_mul(rhs),
            ArithOp::Div => lhs.checked_div(rhs),
        }
    }
}

/// Right-hand side of a `set` command, kept as raw tokens until execution.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    Literal(String),
    Binary {
        lhs: String,
        op: ArithOp,
        rhs: String,
    },
}

/// One parsed script operation together with its 1-based source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub line: usize,
}

impl Command {
    pub fn new(kind: CommandKind, line: usize) -> Self {
        Self { kind, line }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    Click {
        at: Point,
    },
    ThreeFingerTap {
        at: Point,
    },
    LongPress {
        at: Point,
        duration_ms: i64,
    },
    Swipe {
        from: Point,
        to: Point,
        duration_ms: i64,
    },
    Zoom {
        center: Point,
        distance: i32,
        duration_ms: i64,
        direction: ZoomDirection,
    },
    MultiTap {
        points: Vec<Point>,
    },
    SwipePath {
        points: Vec<Point>,
        duration_ms: i64,
    },
    Delay {
        ms: i64,
    },
    Stop,
    Set {
        name: String,
        value: SetValue,
    },
    Get {
        name: String,
    },
    Label {
        name: String,
    },
    Goto {
        label: String,
    },
    GotoIf {
        condition: String,
        label: String,
    },
    /// Message for the log sink.
    Log {
        message: String,
    },
    /// Message for the transient on-screen overlay.
    Logs {
        message: String,
    },
    LogVar {
        name: String,
    },
    FindImagePosition {
        path: String,
        x_var: String,
        y_var: String,
        confidence_var: Option<String>,
    },
    Call {
        name: String,
    },
    If {
        condition: String,
        then_block: Vec<Command>,
        else_block: Vec<Command>,
    },
    While {
        condition: String,
        body: Vec<Command>,
    },
    Repeat {
        count: u32,
        /// Optional `@name` counter holding the 1-based iteration number.
        counter: Option<String>,
        body: Vec<Command>,
    },
    Function {
        name: String,
        body: Vec<Command>,
    },
}

impl CommandKind {
    /// Returns the script keyword for this command, for tracing fields and
    /// diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Click { .. } => "click",
            CommandKind::ThreeFingerTap { .. } => "threefingertap",
            CommandKind::LongPress { .. } => "longpress",
            CommandKind::Swipe { .. } => "swipe",
            CommandKind::Zoom { direction: ZoomDirection::In, .. } => "zoomin",
            CommandKind::Zoom { direction: ZoomDirection::Out, .. } => "zoomout",
            CommandKind::MultiTap { .. } => "multitap",
            CommandKind::SwipePath { .. } => "swipepath",
            CommandKind::Delay { .. } => "delay",
            CommandKind::Stop => "stop",
            CommandKind::Set { .. } => "set",
            CommandKind::Get { .. } => "get",
            CommandKind::Label { .. } => "label",
            CommandKind::Goto { .. } => "goto",
            CommandKind::GotoIf { .. } => "gotoif",
            CommandKind::Log { .. } => "log",
            CommandKind::Logs { .. } => "logs",
            CommandKind::LogVar { .. } => "logvar",
            CommandKind::FindImagePosition { .. } => "findimageposition",
            CommandKind::Call { .. } => "call",
            CommandKind::If { .. } => "if",
            CommandKind::While { .. } => "while",
            CommandKind::Repeat { .. } => "repeat",
            CommandKind::Function { .. } => "fun",
        }
    }
}

/// Touch points of a three-finger tap anchored at `at`.
pub fn three_finger_points(at: Point) -> [Point; 3] {
    [
        Point::new(at.x - THREE_FINGER_OFFSET, at.y),
        at,
        Point::new(at.x + THREE_FINGER_OFFSET, at.y),
    ]
}

/// The two opposing strokes of a zoom gesture, as `(start, end)` pairs.
///
/// Fingers sit on a horizontal line through `center`. A spread (`In`) starts
/// at the center and moves out by `distance`; a pinch (`Out`) runs the
/// reverse.
pub fn zoom_strokes(center: Point, distance: i32, direction: ZoomDirection) -> [(Point, Point); 2] {
    let left = Point::new(center.x - distance, center.y);
    let right = Point::new(center.x + distance, center.y);
    match direction {
        ZoomDirection::In => [(center, left), (center, right)],
        ZoomDirection::Out => [(left, center), (right, center)],
    }
}
