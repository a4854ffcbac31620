//! # tapscript-core
//!
//! Parser and execution engine for tapscript, a line-oriented language for
//! driving touch gestures on a device.
//!
//! A script is parsed into a tree of commands, optionally checked for
//! suspicious values, and run by an interpreter that dispatches gestures,
//! log output and image lookups to collaborators supplied by the host.
//!
//! ## Modules
//!
//! - [`parser`] - Line-oriented parser producing a [`command`] tree plus per-line errors
//! - [`validate`] - Advisory checks over a parsed script
//! - [`interpreter`] - Async execution engine with cancellation
//! - [`context`] - Variables, loop counters, label scopes and functions of a run
//! - [`condition`] - Evaluation of `if`/`while`/`gotoif` conditions
//! - [`sink`] - Collaborator traits (gestures, logging, image lookup)
//! - [`action`] - Recorded collaborator calls and the dry-run [`action::Recorder`]
//! - [`config`] - Interpreter configuration stored as JSON
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tapscript_core::action::Recorder;
//! use tapscript_core::config::InterpreterConfig;
//! use tapscript_core::interpreter::{Collaborators, Interpreter};
//! use tapscript_core::parser::parse;
//!
//! # async fn example() {
//! let config = InterpreterConfig::load();
//! let script = parse("set c 0\nwhile $c < 3\nclick 540 960\nset c $c + 1\nend");
//! for error in &script.errors {
//!     eprintln!("{}", error);
//! }
//!
//! let device = Arc::new(Recorder::new());
//! let interpreter = Interpreter::new(Collaborators::from_device(device.clone()), config);
//! let report = interpreter.run(&script.commands).await;
//! println!("{:?} after {} steps", report.outcome, report.steps);
//! # }
//! ```

pub mod action;
pub mod command;
pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod sink;
pub mod validate;
pub mod value;
