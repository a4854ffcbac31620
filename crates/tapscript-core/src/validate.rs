//! Advisory checks over a parsed script.
//!
//! Nothing here rejects a script: the interpreter runs whatever the parser
//! produced. Warnings point at commands that are legal but almost certainly
//! not what the author meant.

use std::collections::HashSet;

use crate::command::{Command, CommandKind, Point};
use crate::error::ValidationWarning;

/// Checks every command, recursing into nested blocks.
pub fn validate_commands(commands: &[Command]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    validate_sequence(commands, &mut warnings);
    warnings
}

fn validate_sequence(commands: &[Command], warnings: &mut Vec<ValidationWarning>) {
    let mut labels = HashSet::new();

    for cmd in commands {
        let mut warn = |message: String| {
            warnings.push(ValidationWarning {
                line: cmd.line,
                message,
            })
        };

        match &cmd.kind {
            CommandKind::Click { at } | CommandKind::ThreeFingerTap { at } => {
                check_point(*at, &mut warn);
            }
            CommandKind::LongPress { at, duration_ms } => {
                check_point(*at, &mut warn);
                check_duration("longpress", *duration_ms, &mut warn);
            }
            CommandKind::Swipe { from, to, duration_ms } => {
                check_point(*from, &mut warn);
                check_point(*to, &mut warn);
                check_duration("swipe", *duration_ms, &mut warn);
            }
            CommandKind::Zoom {
                center,
                distance,
                duration_ms,
                ..
            } => {
                check_point(*center, &mut warn);
                if *distance <= 0 {
                    warn(format!("{}: distance {} is not positive", cmd.kind.name(), distance));
                }
                check_duration(cmd.kind.name(), *duration_ms, &mut warn);
            }
            CommandKind::MultiTap { points } => {
                for p in points {
                    check_point(*p, &mut warn);
                }
            }
            CommandKind::SwipePath { points, duration_ms } => {
                for p in points {
                    check_point(*p, &mut warn);
                }
                check_duration("swipepath", *duration_ms, &mut warn);
            }
            CommandKind::Delay { ms } if *ms < 0 => {
                warn(format!("delay: {} ms is negative and will be treated as 0", ms));
            }
            CommandKind::Label { name } => {
                if !labels.insert(name.as_str()) {
                    warn(format!("label '{}' is defined more than once in this block", name));
                }
            }
            CommandKind::Repeat { count: 0, .. } => {
                warn("repeat 0: the body never runs".to_string());
            }
            _ => {}
        }

        match &cmd.kind {
            CommandKind::If {
                then_block,
                else_block,
                ..
            } => {
                validate_sequence(then_block, warnings);
                validate_sequence(else_block, warnings);
            }
            CommandKind::While { body, .. }
            | CommandKind::Repeat { body, .. }
            | CommandKind::Function { body, .. } => validate_sequence(body, warnings),
            _ => {}
        }
    }
}

fn check_point(at: Point, warn: &mut impl FnMut(String)) {
    if at.x < 0 || at.y < 0 {
        warn(format!("coordinate ({}, {}) is off screen", at.x, at.y));
    }
}

fn check_duration(command: &str, duration_ms: i64, warn: &mut impl FnMut(String)) {
    if duration_ms <= 0 {
        warn(format!("{}: duration {} ms is not positive", command, duration_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn warnings_for(source: &str) -> Vec<ValidationWarning> {
        let script = parse(source);
        assert!(script.is_clean(), "unexpected parse errors: {:?}", script.errors);
        validate_commands(&script.commands)
    }

    #[test]
    fn test_clean_script_has_no_warnings() {
        let warnings = warnings_for("click 1 2\nswipe 0 0 10 10 300\nrepeat 2\nlongpress 5 5 500\nend");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_negative_coordinates_and_durations() {
        let warnings = warnings_for("click -1 5\nlongpress 1 1 0\nswipe 0 0 1 1 -5");
        assert_eq!(warnings.len(), 3);
        assert_eq!(warnings[0].line, 1);
        assert!(warnings[0].message.contains("(-1, 5)"));
        assert!(warnings[1].message.contains("longpress"));
        assert!(warnings[2].message.contains("swipe"));
    }

    #[test]
    fn test_zoom_distance_and_delay() {
        let warnings = warnings_for("zoomout 100 100 0 300\ndelay -10");
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].message.contains("zoomout: distance 0"));
        assert!(warnings[1].message.contains("negative"));
    }

    #[test]
    fn test_repeat_zero() {
        let warnings = warnings_for("repeat 0\nclick 1 1\nend");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("repeat 0"));
    }

    #[test]
    fn test_duplicate_labels_per_sequence() {
        let warnings = warnings_for("label a\nlabel a\nwhile 0\nlabel a\nend");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, 2);
    }

    #[test]
    fn test_recurses_into_nested_blocks() {
        let warnings = warnings_for(
            "fun f\nif 1\nclick -5 -5\nelse\nswipepath 0 1 1 2 2\nend\nend\nmultitap 1 1 -2 2",
        );
        let lines: Vec<usize> = warnings.iter().map(|w| w.line).collect();
        assert_eq!(lines, vec![3, 5, 8]);
    }
}
