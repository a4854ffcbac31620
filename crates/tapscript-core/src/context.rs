//! Mutable per-run interpreter state.
//!
//! An [`ExecutionContext`] is created for each run and shared by every nested
//! block and function call of that run. It holds script variables, `@` loop
//! counters, label tables and the function table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::command::{Command, CommandKind};
use crate::value::Value;

/// Label positions of one sequence: label name to index within the sequence.
pub type LabelTable = HashMap<String, usize>;

/// Collects the labels of a sequence (not of its nested blocks).
///
/// When a label appears twice, the first occurrence wins.
pub fn collect_labels(commands: &[Command]) -> LabelTable {
    let mut table = LabelTable::new();
    for (index, cmd) in commands.iter().enumerate() {
        if let CommandKind::Label { name } = &cmd.kind {
            table.entry(name.clone()).or_insert(index);
        }
    }
    table
}

/// Where a label lives: which active sequence and at what index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelTarget {
    pub scope: usize,
    pub index: usize,
}

/// Stack of label tables, one per sequence currently being walked.
///
/// Lookups search from the innermost sequence outward but never below the
/// call floor, so a function body can only jump within itself.
#[derive(Debug, Default)]
pub struct LabelScopes {
    scopes: Vec<LabelTable>,
    floor: usize,
}

impl LabelScopes {
    /// Pushes a table for a sequence about to be walked and returns its scope id.
    pub fn push(&mut self, table: LabelTable) -> usize {
        self.scopes.push(table);
        self.scopes.len() - 1
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Registers `name` in the innermost sequence.
    pub fn register(&mut self, name: &str, index: usize) {
        if let Some(top) = self.scopes.last_mut() {
            top.insert(name.to_string(), index);
        }
    }

    pub fn resolve(&self, name: &str) -> Option<LabelTarget> {
        (self.floor..self.scopes.len())
            .rev()
            .find_map(|scope| {
                self.scopes[scope]
                    .get(name)
                    .map(|&index| LabelTarget { scope, index })
            })
    }

    /// Starts a function call boundary. Returns the previous floor, to be
    /// handed back to [`exit_call`](Self::exit_call).
    pub fn enter_call(&mut self) -> usize {
        std::mem::replace(&mut self.floor, self.scopes.len())
    }

    pub fn exit_call(&mut self, previous_floor: usize) {
        self.floor = previous_floor;
    }
}

/// State for one script run.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    variables: HashMap<String, Value>,
    loop_counters: HashMap<String, i64>,
    pub labels: LabelScopes,
    functions: HashMap<String, Arc<[Command]>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set_counter(&mut self, name: impl Into<String>, value: i64) {
        self.loop_counters.insert(name.into(), value);
    }

    pub fn counter(&self, name: &str) -> Option<i64> {
        self.loop_counters.get(name).copied()
    }

    /// Resolves a script token.
    ///
    /// `$name` reads a variable (absent reads as `0`), `@name` reads a loop
    /// counter (absent reads as `0`), anything else is a literal.
    pub fn resolve_token(&self, token: &str) -> Value {
        let token = token.trim();
        if let Some(name) = token.strip_prefix('$') {
            self.variables.get(name).cloned().unwrap_or(Value::Number(0))
        } else if let Some(name) = token.strip_prefix('@') {
            Value::Number(self.loop_counters.get(name).copied().unwrap_or(0))
        } else {
            Value::from_literal(token)
        }
    }

    /// Substitutes every whitespace-separated `$name`/`@name` token of `text`.
    pub fn interpolate(&self, text: &str) -> String {
        text.split(' ')
            .map(|word| {
                let is_reference = word.len() > 1 && (word.starts_with('$') || word.starts_with('@'));
                if is_reference {
                    self.resolve_token(word).as_text()
                } else {
                    word.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn define_function(&mut self, name: impl Into<String>, body: Arc<[Command]>) {
        self.functions.insert(name.into(), body);
    }

    pub fn function(&self, name: &str) -> Option<Arc<[Command]>> {
        self.functions.get(name).cloned()
    }

    /// Copy of all variables, for run reports.
    pub fn snapshot_variables(&self) -> HashMap<String, Value> {
        self.variables.clone()
    }
}
