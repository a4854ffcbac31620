//! Condition strings for `if`, `while` and `gotoif`.
//!
//! Conditions are stored verbatim by the parser and evaluated against the
//! current [`ExecutionContext`] each time a branch is taken. The grammar is
//! a single binary comparison or a bare token:
//!
//! ```text
//! $count < 10        numeric comparison (non-numeric operands read as 0)
//! $state == ready    text comparison, no numeric coercion
//! @i >= 3            loop counter reference
//! $done              bare token, true when it resolves to "true" or "1"
//! ```

use tracing::warn;

use crate::context::ExecutionContext;
use crate::error::ConditionError;

/// Two-character operators come first so `>=` is never split at its `>`.
const OPERATORS: [&str; 6] = ["==", "!=", ">=", "<=", ">", "<"];

/// Evaluates `condition`, treating any malformed condition as `false`.
pub fn evaluate_condition(condition: &str, ctx: &ExecutionContext) -> bool {
    match try_evaluate_condition(condition, ctx) {
        Ok(result) => result,
        Err(e) => {
            warn!(condition, error = %e, "condition treated as false");
            false
        }
    }
}

pub fn try_evaluate_condition(condition: &str, ctx: &ExecutionContext) -> Result<bool, ConditionError> {
    let condition = condition.trim();
    if condition.is_empty() {
        return Err(ConditionError::Empty);
    }

    for op in OPERATORS {
        let Some((lhs, rhs)) = condition.split_once(op) else {
            continue;
        };
        let (lhs, rhs) = (lhs.trim(), rhs.trim());
        if lhs.is_empty() || rhs.is_empty() {
            return Err(ConditionError::MissingOperand(op));
        }
        let left = ctx.resolve_token(lhs);
        let right = ctx.resolve_token(rhs);
        return Ok(match op {
            "==" => left.as_text() == right.as_text(),
            "!=" => left.as_text() != right.as_text(),
            ">=" => left.as_number() >= right.as_number(),
            "<=" => left.as_number() <= right.as_number(),
            ">" => left.as_number() > right.as_number(),
            _ => left.as_number() < right.as_number(),
        });
    }

    Ok(ctx.resolve_token(condition).is_truthy())
}
