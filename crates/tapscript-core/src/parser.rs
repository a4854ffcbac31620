//! Line-oriented script parser.
//!
//! Each non-blank, non-comment line is one command. Block commands open with
//! `if <cond>`, `while <cond>`, `repeat <n> [counter]` or `fun <name>` and close
//! with `end` or their own terminator (`endif`, `endwhile`, `endrepeat`,
//! `endfun`). `else` splits an `if` block.
//!
//! Parsing is best effort: a malformed line is recorded in
//! [`Script::errors`], logged, and skipped.

use tracing::warn;

use crate::command::{ArithOp, Command, CommandKind, Point, SetValue, ZoomDirection};
use crate::error::{ParseError, ParseErrorKind};

const TERMINATORS: [&str; 5] = ["end", "endif", "endwhile", "endrepeat", "endfun"];

/// The result of parsing a script: every command that parsed, plus the
/// lines that did not.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub commands: Vec<Command>,
    pub errors: Vec<ParseError>,
}

impl Script {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Require `endif`/`endwhile`/`endrepeat`/`endfun` to match the block they
    /// close. When false any terminator closes any block.
    pub strict_terminators: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict_terminators: true,
        }
    }
}

/// Parses `source` with default options.
pub fn parse(source: &str) -> Script {
    parse_with(source, &ParseOptions::default())
}

pub fn parse_with(source: &str, options: &ParseOptions) -> Script {
    let lines = source
        .lines()
        .enumerate()
        .map(|(i, raw)| SourceLine {
            number: i + 1,
            text: raw.trim(),
        })
        .filter(|line| !line.text.is_empty() && !line.text.starts_with('#'))
        .collect();

    Parser::new(lines, *options).parse_script()
}

#[derive(Debug, Clone, Copy)]
struct SourceLine<'a> {
    number: usize,
    text: &'a str,
}

impl<'a> SourceLine<'a> {
    /// Splits the line into its lowercased keyword and the trimmed remainder.
    fn split_keyword(&self) -> (String, &'a str) {
        match self.text.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword.to_lowercase(), rest.trim()),
            None => (self.text.to_lowercase(), ""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    While,
    Repeat,
    Function,
}

impl BlockKind {
    fn keyword(&self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::While => "while",
            BlockKind::Repeat => "repeat",
            BlockKind::Function => "fun",
        }
    }

    fn terminator(&self) -> &'static str {
        match self {
            BlockKind::If => "endif",
            BlockKind::While => "endwhile",
            BlockKind::Repeat => "endrepeat",
            BlockKind::Function => "endfun",
        }
    }
}

/// Why a sequence stopped.
enum BlockEnd<'a> {
    Else(SourceLine<'a>),
    Terminator(SourceLine<'a>),
    Eof,
}

struct Parser<'a> {
    lines: Vec<SourceLine<'a>>,
    pos: usize,
    options: ParseOptions,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(lines: Vec<SourceLine<'a>>, options: ParseOptions) -> Self {
        Self {
            lines,
            pos: 0,
            options,
            errors: Vec::new(),
        }
    }

    fn advance(&mut self) -> Option<SourceLine<'a>> {
        let line = self.lines.get(self.pos).copied();
        self.pos += 1;
        line
    }

    fn error(&mut self, line: SourceLine<'a>, kind: ParseErrorKind) {
        warn!(line = line.number, error = %kind, "skipping script line");
        self.errors.push(ParseError {
            line: line.number,
            text: line.text.to_string(),
            kind,
        });
    }

    fn parse_script(mut self) -> Script {
        let mut commands = Vec::new();
        loop {
            let (mut seq, end) = self.parse_sequence();
            commands.append(&mut seq);
            match end {
                BlockEnd::Eof => break,
                BlockEnd::Else(line) => self.error(line, ParseErrorKind::UnexpectedElse),
                BlockEnd::Terminator(line) => {
                    let (keyword, _) = line.split_keyword();
                    self.error(line, ParseErrorKind::UnexpectedTerminator(keyword));
                }
            }
        }
        Script {
            commands,
            errors: self.errors,
        }
    }

    /// Parses commands until `else`, a terminator, or end of input.
    fn parse_sequence(&mut self) -> (Vec<Command>, BlockEnd<'a>) {
        let mut commands = Vec::new();

        while let Some(line) = self.advance() {
            let (keyword, rest) = line.split_keyword();
            let parsed = match keyword.as_str() {
                "else" => return (commands, BlockEnd::Else(line)),
                k if TERMINATORS.contains(&k) => return (commands, BlockEnd::Terminator(line)),
                "if" => self.parse_if(line, rest),
                "while" => self.parse_while(line, rest),
                "repeat" => self.parse_repeat(line, rest),
                "fun" => self.parse_function(line, rest),
                _ => {
                    let args: Vec<&str> = rest.split_whitespace().collect();
                    match build_command(&keyword, &args) {
                        Ok(kind) => Some(kind),
                        Err(kind) => {
                            self.error(line, kind);
                            None
                        }
                    }
                }
            };
            if let Some(kind) = parsed {
                commands.push(Command::new(kind, line.number));
            }
        }

        (commands, BlockEnd::Eof)
    }

    /// Parses a block body up to its terminator. Returns the body and, for
    /// `if`, the else-body.
    ///
    /// The body is always consumed, even when the caller goes on to drop the
    /// block because its header was invalid.
    fn parse_block(&mut self, kind: BlockKind, opener: SourceLine<'a>) -> (Vec<Command>, Vec<Command>) {
        let mut body = Vec::new();
        let mut else_body: Option<Vec<Command>> = None;

        loop {
            let (mut seq, end) = self.parse_sequence();
            match else_body.as_mut() {
                Some(e) => e.append(&mut seq),
                None => body.append(&mut seq),
            }
            match end {
                BlockEnd::Else(line) => {
                    if kind == BlockKind::If && else_body.is_none() {
                        else_body = Some(Vec::new());
                    } else {
                        self.error(line, ParseErrorKind::UnexpectedElse);
                    }
                }
                BlockEnd::Terminator(line) => {
                    self.check_terminator(kind, opener, line);
                    break;
                }
                BlockEnd::Eof => {
                    self.error(
                        opener,
                        ParseErrorKind::UnterminatedBlock {
                            opener: kind.keyword(),
                            opened_at: opener.number,
                        },
                    );
                    break;
                }
            }
        }

        (body, else_body.unwrap_or_default())
    }

    fn check_terminator(&mut self, kind: BlockKind, opener: SourceLine<'a>, line: SourceLine<'a>) {
        let (found, _) = line.split_keyword();
        if self.options.strict_terminators && found != "end" && found != kind.terminator() {
            // Still closes the block.
            self.error(
                line,
                ParseErrorKind::MismatchedTerminator {
                    found,
                    opener: kind.keyword(),
                    opened_at: opener.number,
                },
            );
        }
    }

    fn parse_if(&mut self, opener: SourceLine<'a>, condition: &str) -> Option<CommandKind> {
        let (then_block, else_block) = self.parse_block(BlockKind::If, opener);
        if condition.is_empty() {
            self.error(opener, ParseErrorKind::MissingArgument("if"));
            return None;
        }
        Some(CommandKind::If {
            condition: condition.to_string(),
            then_block,
            else_block,
        })
    }

    fn parse_while(&mut self, opener: SourceLine<'a>, condition: &str) -> Option<CommandKind> {
        let (body, _) = self.parse_block(BlockKind::While, opener);
        if condition.is_empty() {
            self.error(opener, ParseErrorKind::MissingArgument("while"));
            return None;
        }
        Some(CommandKind::While {
            condition: condition.to_string(),
            body,
        })
    }

    fn parse_repeat(&mut self, opener: SourceLine<'a>, rest: &str) -> Option<CommandKind> {
        let (body, _) = self.parse_block(BlockKind::Repeat, opener);
        let args: Vec<&str> = rest.split_whitespace().collect();
        let header = expect_range("repeat", &args, 1, 2, "a count and an optional counter name")
            .and_then(|_| int::<u32>(args[0], "repeat count"));
        match header {
            Ok(count) => Some(CommandKind::Repeat {
                count,
                counter: args.get(1).map(|name| name.trim_start_matches('@').to_string()),
                body,
            }),
            Err(kind) => {
                self.error(opener, kind);
                None
            }
        }
    }

    fn parse_function(&mut self, opener: SourceLine<'a>, rest: &str) -> Option<CommandKind> {
        let (body, _) = self.parse_block(BlockKind::Function, opener);
        let args: Vec<&str> = rest.split_whitespace().collect();
        match expect_exact("fun", &args, 1, "1 argument (name)") {
            Ok(()) => Some(CommandKind::Function {
                name: args[0].to_string(),
                body,
            }),
            Err(kind) => {
                self.error(opener, kind);
                None
            }
        }
    }
}

fn expect_exact(
    command: &'static str,
    args: &[&str],
    count: usize,
    expected: &'static str,
) -> Result<(), ParseErrorKind> {
    expect_range(command, args, count, count, expected)
}

fn expect_range(
    command: &'static str,
    args: &[&str],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), ParseErrorKind> {
    if args.len() < min || args.len() > max {
        return Err(ParseErrorKind::Arity {
            command,
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

fn int<T: std::str::FromStr>(value: &str, field: &'static str) -> Result<T, ParseErrorKind> {
    value.parse().map_err(|_| ParseErrorKind::InvalidInteger {
        field,
        value: value.to_string(),
    })
}

fn point(x: &str, y: &str) -> Result<Point, ParseErrorKind> {
    Ok(Point::new(int(x, "x coordinate")?, int(y, "y coordinate")?))
}

fn points(args: &[&str]) -> Result<Vec<Point>, ParseErrorKind> {
    args.chunks(2).map(|pair| point(pair[0], pair[1])).collect()
}

/// Builds a leaf command from its lowercased name and arguments.
fn build_command(name: &str, args: &[&str]) -> Result<CommandKind, ParseErrorKind> {
    let kind = match name {
        "click" => {
            expect_exact("click", args, 2, "2 arguments (x y)")?;
            CommandKind::Click {
                at: point(args[0], args[1])?,
            }
        }
        "threefingertap" => {
            expect_exact("threefingertap", args, 2, "2 arguments (x y)")?;
            CommandKind::ThreeFingerTap {
                at: point(args[0], args[1])?,
            }
        }
        "longpress" => {
            expect_exact("longpress", args, 3, "3 arguments (x y duration)")?;
            CommandKind::LongPress {
                at: point(args[0], args[1])?,
                duration_ms: int(args[2], "duration")?,
            }
        }
        "swipe" => {
            expect_exact("swipe", args, 5, "5 arguments (x0 y0 x1 y1 duration)")?;
            CommandKind::Swipe {
                from: point(args[0], args[1])?,
                to: point(args[2], args[3])?,
                duration_ms: int(args[4], "duration")?,
            }
        }
        "zoomin" | "zoomout" => {
            let (command, direction) = if name == "zoomin" {
                ("zoomin", ZoomDirection::In)
            } else {
                ("zoomout", ZoomDirection::Out)
            };
            expect_exact(command, args, 4, "4 arguments (x y distance duration)")?;
            CommandKind::Zoom {
                center: point(args[0], args[1])?,
                distance: int(args[2], "distance")?,
                duration_ms: int(args[3], "duration")?,
                direction,
            }
        }
        "multitap" => {
            if args.is_empty() || args.len() % 2 != 0 {
                return Err(ParseErrorKind::Arity {
                    command: "multitap",
                    expected: "one or more x y pairs",
                    found: args.len(),
                });
            }
            CommandKind::MultiTap {
                points: points(args)?,
            }
        }
        "swipepath" => {
            if args.len() < 5 || (args.len() - 1) % 2 != 0 {
                return Err(ParseErrorKind::Arity {
                    command: "swipepath",
                    expected: "a duration followed by two or more x y pairs",
                    found: args.len(),
                });
            }
            CommandKind::SwipePath {
                duration_ms: int(args[0], "duration")?,
                points: points(&args[1..])?,
            }
        }
        "delay" => {
            expect_exact("delay", args, 1, "1 argument (ms)")?;
            CommandKind::Delay {
                ms: int(args[0], "delay")?,
            }
        }
        "stop" => {
            expect_exact("stop", args, 0, "no arguments")?;
            CommandKind::Stop
        }
        "set" => {
            let value = match args.len() {
                2 => SetValue::Literal(args[1].to_string()),
                4 => {
                    let op = ArithOp::from_symbol(args[2])
                        .ok_or_else(|| ParseErrorKind::UnknownOperator(args[2].to_string()))?;
                    SetValue::Binary {
                        lhs: args[1].to_string(),
                        op,
                        rhs: args[3].to_string(),
                    }
                }
                found => {
                    return Err(ParseErrorKind::Arity {
                        command: "set",
                        expected: "2 arguments (name value) or 4 (name a op b)",
                        found,
                    })
                }
            };
            CommandKind::Set {
                name: args[0].to_string(),
                value,
            }
        }
        "get" => {
            expect_exact("get", args, 1, "1 argument (name)")?;
            CommandKind::Get {
                name: args[0].to_string(),
            }
        }
        "label" => {
            expect_exact("label", args, 1, "1 argument (name)")?;
            CommandKind::Label {
                name: args[0].to_string(),
            }
        }
        "goto" => {
            expect_exact("goto", args, 1, "1 argument (label)")?;
            CommandKind::Goto {
                label: args[0].to_string(),
            }
        }
        "gotoif" => {
            if args.len() < 2 {
                return Err(ParseErrorKind::Arity {
                    command: "gotoif",
                    expected: "a condition and a label",
                    found: args.len(),
                });
            }
            let last = args.len() - 1;
            CommandKind::GotoIf {
                condition: args[..last].join(" "),
                label: args[last].to_string(),
            }
        }
        "log" | "logs" => {
            if args.is_empty() {
                return Err(ParseErrorKind::MissingArgument(if name == "log" { "log" } else { "logs" }));
            }
            let message = args.join(" ");
            if name == "log" {
                CommandKind::Log { message }
            } else {
                CommandKind::Logs { message }
            }
        }
        "logvar" => {
            expect_exact("logvar", args, 1, "1 argument (name)")?;
            CommandKind::LogVar {
                name: args[0].to_string(),
            }
        }
        "findimageposition" => {
            expect_range(
                "findimageposition",
                args,
                3,
                4,
                "3 or 4 arguments (path xVar yVar [confidenceVar])",
            )?;
            CommandKind::FindImagePosition {
                path: args[0].to_string(),
                x_var: args[1].to_string(),
                y_var: args[2].to_string(),
                confidence_var: args.get(3).map(|s| s.to_string()),
            }
        }
        "call" => {
            expect_exact("call", args, 1, "1 argument (name)")?;
            CommandKind::Call {
                name: args[0].to_string(),
            }
        }
        other => return Err(ParseErrorKind::UnknownCommand(other.to_string())),
    };
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(script: &Script) -> Vec<&CommandKind> {
        script.commands.iter().map(|c| &c.kind).collect()
    }

    #[test]
    fn test_parse_simple_sequence() {
        let script = parse("click 1 2\ndelay 5\nclick 3 4");
        assert!(script.is_clean());
        assert_eq!(
            kinds(&script),
            vec![
                &CommandKind::Click { at: Point::new(1, 2) },
                &CommandKind::Delay { ms: 5 },
                &CommandKind::Click { at: Point::new(3, 4) },
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let script = parse("\n# a comment\n   \n  click 10 20  \n  # indented comment\n");
        assert!(script.is_clean());
        assert_eq!(script.commands.len(), 1);
        assert_eq!(script.commands[0].line, 4);
    }

    #[test]
    fn test_command_names_case_insensitive() {
        let script = parse("CLICK 1 2\nLongPress 3 4 500\nLOG Hello World");
        assert!(script.is_clean());
        assert_eq!(script.commands[0].kind.name(), "click");
        assert_eq!(script.commands[1].kind.name(), "longpress");
        match &script.commands[2].kind {
            CommandKind::Log { message } => assert_eq!(message, "Hello World"),
            other => panic!("Expected Log, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_gestures() {
        let script = parse(
            "swipe 100 800 100 200 300\nzoomin 500 500 150 400\nzoomout 500 500 150 400\nthreefingertap 300 300",
        );
        assert!(script.is_clean());
        assert_eq!(
            script.commands[0].kind,
            CommandKind::Swipe {
                from: Point::new(100, 800),
                to: Point::new(100, 200),
                duration_ms: 300,
            }
        );
        assert!(matches!(
            script.commands[1].kind,
            CommandKind::Zoom { direction: ZoomDirection::In, distance: 150, .. }
        ));
        assert!(matches!(
            script.commands[2].kind,
            CommandKind::Zoom { direction: ZoomDirection::Out, .. }
        ));
        assert_eq!(
            script.commands[3].kind,
            CommandKind::ThreeFingerTap { at: Point::new(300, 300) }
        );
    }

    #[test]
    fn test_parse_multitap_and_swipepath() {
        let script = parse("multitap 1 2 3 4\nswipepath 600 0 0 10 10 20 0");
        assert!(script.is_clean());
        assert_eq!(
            script.commands[0].kind,
            CommandKind::MultiTap {
                points: vec![Point::new(1, 2), Point::new(3, 4)]
            }
        );
        match &script.commands[1].kind {
            CommandKind::SwipePath { points, duration_ms } => {
                assert_eq!(*duration_ms, 600);
                assert_eq!(points.len(), 3);
            }
            other => panic!("Expected SwipePath, got {:?}", other),
        }

        let script = parse("multitap 1 2 3\nswipepath 600 0 0");
        assert_eq!(script.errors.len(), 2);
    }

    #[test]
    fn test_parse_set_forms() {
        let script = parse("set x 5\nset c $c + 1\nset y 1 % 2");
        assert_eq!(
            script.commands[0].kind,
            CommandKind::Set {
                name: "x".to_string(),
                value: SetValue::Literal("5".to_string())
            }
        );
        assert_eq!(
            script.commands[1].kind,
            CommandKind::Set {
                name: "c".to_string(),
                value: SetValue::Binary {
                    lhs: "$c".to_string(),
                    op: ArithOp::Add,
                    rhs: "1".to_string()
                }
            }
        );
        assert_eq!(script.errors.len(), 1);
        assert_eq!(
            script.errors[0].kind,
            ParseErrorKind::UnknownOperator("%".to_string())
        );
    }

    #[test]
    fn test_parse_gotoif_joins_condition() {
        let script = parse("gotoif $x == 5 done");
        assert_eq!(
            script.commands[0].kind,
            CommandKind::GotoIf {
                condition: "$x == 5".to_string(),
                label: "done".to_string()
            }
        );
    }

    #[test]
    fn test_parse_find_image_position() {
        let script = parse("findImagePosition ok.png bx by\nfindimageposition ok.png bx by conf");
        assert!(script.is_clean());
        match &script.commands[0].kind {
            CommandKind::FindImagePosition { confidence_var, .. } => assert!(confidence_var.is_none()),
            other => panic!("Expected FindImagePosition, got {:?}", other),
        }
        match &script.commands[1].kind {
            CommandKind::FindImagePosition { path, confidence_var, .. } => {
                assert_eq!(path, "ok.png");
                assert_eq!(confidence_var.as_deref(), Some("conf"));
            }
            other => panic!("Expected FindImagePosition, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let script = parse("click 1 1\nclickk 1 2\nclick 1\nclick a b\nclick 3 3");
        assert_eq!(script.commands.len(), 2);
        assert_eq!(script.errors.len(), 3);
        assert_eq!(script.errors[0].line, 2);
        assert_eq!(
            script.errors[0].kind,
            ParseErrorKind::UnknownCommand("clickk".to_string())
        );
        assert!(matches!(script.errors[1].kind, ParseErrorKind::Arity { command: "click", found: 1, .. }));
        assert!(matches!(script.errors[2].kind, ParseErrorKind::InvalidInteger { .. }));
        assert_eq!(script.errors[2].text, "click a b");
    }

    #[test]
    fn test_parse_if_else() {
        let script = parse("if $x == 5\nclick 1 1\nelse\nclick 2 2\nclick 3 3\nendif\nclick 4 4");
        assert!(script.is_clean());
        assert_eq!(script.commands.len(), 2);
        match &script.commands[0].kind {
            CommandKind::If { condition, then_block, else_block } => {
                assert_eq!(condition, "$x == 5");
                assert_eq!(then_block.len(), 1);
                assert_eq!(else_block.len(), 2);
                assert_eq!(else_block[1].line, 5);
            }
            other => panic!("Expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_blocks() {
        let script = parse(
            "while $c < 3\n  repeat 2\n    if $c == 1\n      click 1 1\n    end\n  endrepeat\n  set c $c + 1\nendwhile",
        );
        assert!(script.is_clean());
        match &script.commands[0].kind {
            CommandKind::While { body, .. } => {
                assert_eq!(body.len(), 2);
                match &body[0].kind {
                    CommandKind::Repeat { count, body, counter } => {
                        assert_eq!(*count, 2);
                        assert!(counter.is_none());
                        assert!(matches!(body[0].kind, CommandKind::If { .. }));
                    }
                    other => panic!("Expected Repeat, got {:?}", other),
                }
            }
            other => panic!("Expected While, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_repeat_counter() {
        let script = parse("repeat 3 @i\nlog @i\nend\nrepeat 2 j\nend");
        assert!(script.is_clean());
        assert!(matches!(
            &script.commands[0].kind,
            CommandKind::Repeat { counter: Some(c), .. } if c == "i"
        ));
        assert!(matches!(
            &script.commands[1].kind,
            CommandKind::Repeat { counter: Some(c), .. } if c == "j"
        ));
    }

    #[test]
    fn test_parse_function_and_call() {
        let script = parse("fun greet\nlog hi\nendfun\ncall greet");
        assert!(script.is_clean());
        match &script.commands[0].kind {
            CommandKind::Function { name, body } => {
                assert_eq!(name, "greet");
                assert_eq!(body.len(), 1);
            }
            other => panic!("Expected Function, got {:?}", other),
        }
        assert_eq!(
            script.commands[1].kind,
            CommandKind::Call { name: "greet".to_string() }
        );
    }

    #[test]
    fn test_mismatched_terminator_is_reported_but_closes() {
        let script = parse("if 1\nclick 1 1\nendwhile\nclick 2 2");
        assert_eq!(script.commands.len(), 2);
        assert_eq!(script.errors.len(), 1);
        assert_eq!(script.errors[0].line, 3);
        assert!(matches!(
            script.errors[0].kind,
            ParseErrorKind::MismatchedTerminator { opener: "if", opened_at: 1, .. }
        ));
    }

    #[test]
    fn test_lenient_terminators_accept_any() {
        let options = ParseOptions {
            strict_terminators: false,
        };
        let script = parse_with("if 1\nclick 1 1\nendwhile\nrepeat 2\nendif", &options);
        assert!(script.is_clean());
        assert_eq!(script.commands.len(), 2);
    }

    #[test]
    fn test_end_closes_any_block() {
        let script = parse("while 1\nend\nrepeat 1\nend\nfun f\nend\nif 1\nend");
        assert!(script.is_clean());
        assert_eq!(script.commands.len(), 4);
    }

    #[test]
    fn test_unterminated_block_kept_with_error() {
        let script = parse("repeat 2\nclick 1 1");
        assert_eq!(script.commands.len(), 1);
        assert_eq!(script.errors.len(), 1);
        assert_eq!(
            script.errors[0].kind,
            ParseErrorKind::UnterminatedBlock {
                opener: "repeat",
                opened_at: 1
            }
        );
    }

    #[test]
    fn test_stray_else_and_terminator() {
        let script = parse("else\nclick 1 1\nendif\nwhile 1\nelse\nend");
        assert_eq!(script.commands.len(), 2);
        assert_eq!(script.errors.len(), 3);
        assert_eq!(script.errors[0].kind, ParseErrorKind::UnexpectedElse);
        assert_eq!(
            script.errors[1].kind,
            ParseErrorKind::UnexpectedTerminator("endif".to_string())
        );
        assert_eq!(script.errors[2].kind, ParseErrorKind::UnexpectedElse);
    }

    #[test]
    fn test_invalid_block_header_drops_whole_block() {
        let script = parse("repeat many\nclick 1 1\nend\nif\nclick 2 2\nend\nclick 3 3");
        assert_eq!(script.commands.len(), 1);
        assert_eq!(script.commands[0].kind, CommandKind::Click { at: Point::new(3, 3) });
        assert_eq!(script.errors.len(), 2);
        assert!(matches!(script.errors[0].kind, ParseErrorKind::InvalidInteger { .. }));
        assert_eq!(script.errors[1].kind, ParseErrorKind::MissingArgument("if"));
    }

    #[test]
    fn test_bad_line_inside_block_keeps_block() {
        let script = parse("repeat 2\nclick 1\nclick 1 1\nend");
        assert_eq!(script.errors.len(), 1);
        match &script.commands[0].kind {
            CommandKind::Repeat { body, .. } => assert_eq!(body.len(), 1),
            other => panic!("Expected Repeat, got {:?}", other),
        }
    }

    #[test]
    fn test_log_requires_message() {
        let script = parse("log\nlogs shown on screen");
        assert_eq!(script.errors[0].kind, ParseErrorKind::MissingArgument("log"));
        assert_eq!(
            script.commands[0].kind,
            CommandKind::Logs {
                message: "shown on screen".to_string()
            }
        );
    }
}
