//! Error types for parsing, validation and execution.
//!
//! Nothing here is fatal to the host: parse errors skip a line, validation
//! warnings are advisory, runtime errors turn a single command into a no-op
//! and condition errors evaluate to `false`.

use thiserror::Error;

use crate::sink::SinkError;

/// What went wrong on a single script line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{command}' expects {expected}, got {found} argument(s)")]
    Arity {
        command: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("invalid integer for {field}: '{value}'")]
    InvalidInteger { field: &'static str, value: String },

    #[error("'{0}' requires an argument")]
    MissingArgument(&'static str),

    #[error("unknown operator '{0}' in set (expected + - * /)")]
    UnknownOperator(String),

    #[error("'else' without a matching 'if'")]
    UnexpectedElse,

    #[error("'{0}' without an open block")]
    UnexpectedTerminator(String),

    #[error("'{found}' closes a '{opener}' block opened at line {opened_at}")]
    MismatchedTerminator {
        found: String,
        opener: &'static str,
        opened_at: usize,
    },

    #[error("'{opener}' block opened at line {opened_at} is never closed")]
    UnterminatedBlock {
        opener: &'static str,
        opened_at: usize,
    },
}

/// A malformed script line. The parser records it and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line}: {kind} (in '{text}')")]
pub struct ParseError {
    /// 1-based source line.
    pub line: usize,
    /// The trimmed source text of the line.
    pub text: String,
    pub kind: ParseErrorKind,
}

/// A structurally valid but suspicious command.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line}: {message}")]
pub struct ValidationWarning {
    pub line: usize,
    pub message: String,
}

/// A command that could not take effect during a run.
///
/// The interpreter logs these, records them in the run report and carries
/// on with the next command.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("line {line}: label '{label}' not found")]
    LabelNotFound { label: String, line: usize },

    #[error("line {line}: function '{name}' is not defined")]
    FunctionNotFound { name: String, line: usize },

    #[error("line {line}: call to '{name}' exceeds maximum call depth {max_depth}")]
    CallDepthExceeded {
        name: String,
        line: usize,
        max_depth: usize,
    },

    #[error("line {line}: cannot compute {expression}")]
    Arithmetic { expression: String, line: usize },

    #[error("line {line}: {action} failed: {source}")]
    Collaborator {
        action: &'static str,
        line: usize,
        #[source]
        source: SinkError,
    },
}

impl RuntimeError {
    /// The source line the error was raised on.
    pub fn line(&self) -> usize {
        match self {
            RuntimeError::LabelNotFound { line, .. }
            | RuntimeError::FunctionNotFound { line, .. }
            | RuntimeError::CallDepthExceeded { line, .. }
            | RuntimeError::Arithmetic { line, .. }
            | RuntimeError::Collaborator { line, .. } => *line,
        }
    }
}

/// A condition string that cannot be evaluated. Treated as `false`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("empty condition")]
    Empty,

    #[error("missing operand around '{0}'")]
    MissingOperand(&'static str),
}

/// A spawned run that did not finish normally.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("script task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failure loading or saving an interpreter configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            line: 3,
            text: "clickk 1 2".to_string(),
            kind: ParseErrorKind::UnknownCommand("clickk".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 3"));
        assert!(msg.contains("unknown command 'clickk'"));
        assert!(msg.contains("clickk 1 2"));
    }

    #[test]
    fn test_runtime_error_line() {
        let err = RuntimeError::LabelNotFound {
            label: "loop".to_string(),
            line: 7,
        };
        assert_eq!(err.line(), 7);
        assert!(err.to_string().contains("label 'loop' not found"));

        let err = RuntimeError::Collaborator {
            action: "tap",
            line: 2,
            source: SinkError::Unavailable,
        };
        assert_eq!(err.line(), 2);
        assert!(err.to_string().contains("tap failed"));
    }

    #[test]
    fn test_mismatched_terminator_display() {
        let kind = ParseErrorKind::MismatchedTerminator {
            found: "endwhile".to_string(),
            opener: "if",
            opened_at: 4,
        };
        assert_eq!(
            kind.to_string(),
            "'endwhile' closes a 'if' block opened at line 4"
        );
    }
}
