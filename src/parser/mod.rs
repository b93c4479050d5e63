//! # Expression Parser
//!
//! Turns textual filter conditions into [`Predicate`]s and [`BooleanExp`]s.
//!
//! ```text
//! (c > 0 AND l > 0) OR (r > 0)      form = dnf
//!  └──── group 0 ───┘    └ g 1 ┘    split on the outer connective (OR)
//! ```
//!
//! Groups are separated by the form's outer connective and predicates inside a
//! group by its inner connective, both as whole words (case-insensitive).
//! Parentheses around a group or a single predicate are optional but must
//! balance. Every piece must be exactly one `column op literal` triple; any
//! other text is a [`PlanError::ParseError`]. Column names and literals are
//! Unicode word characters, and literals may also contain `.` and `-`.

use regex::Regex;
use std::sync::LazyLock;

use crate::boolean_exp::{BooleanExp, NormalForm};
use crate::error::{PlanError, PlanResult};
use crate::predicate::Predicate;

static PREDICATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+)\s*([<>=!]+)\s*([\w.\-]+)$").expect("valid predicate pattern")
});

static OR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bOR\b").expect("valid pattern"));

static AND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bAND\b").expect("valid pattern"));

/// Exactly one `column op literal` triple, optionally parenthesized
pub fn parse_predicate(text: &str) -> PlanResult<Predicate> {
    let inner = strip_parens(text);
    let caps = PREDICATE_RE.captures(inner).ok_or_else(|| {
        PlanError::ParseError(format!("expected 'column op literal', found '{}'", text.trim()))
    })?;
    Predicate::from_parts(&caps[1], &caps[2], &caps[3])
}

/// Comma-separated predicates, in order
pub fn parse_predicates(text: &str) -> PlanResult<Vec<Predicate>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split(',').map(parse_predicate).collect()
}

/// Parse a whole expression in `form`.
///
/// Blank input yields an expression with no groups.
pub fn parse_expression(text: &str, form: NormalForm) -> PlanResult<BooleanExp> {
    if text.trim().is_empty() {
        return Ok(BooleanExp::empty(form));
    }

    let (outer, inner) = match form {
        NormalForm::Dnf => (&*OR_RE, &*AND_RE),
        NormalForm::Cnf => (&*AND_RE, &*OR_RE),
    };

    let groups = outer
        .split(text)
        .enumerate()
        .map(|(i, group)| parse_group(i + 1, group, inner))
        .collect::<PlanResult<Vec<_>>>()?;

    Ok(BooleanExp::new(groups, form))
}

fn parse_group(number: usize, group: &str, inner: &Regex) -> PlanResult<Vec<Predicate>> {
    let opened = group.matches('(').count();
    let closed = group.matches(')').count();
    if opened != closed {
        return Err(PlanError::ParseError(format!(
            "group {number} ('{}') has unbalanced parentheses",
            group.trim()
        )));
    }
    if strip_parens(group).is_empty() {
        return Err(PlanError::ParseError(format!(
            "group {number} ('{}') contains no predicates",
            group.trim()
        )));
    }

    inner
        .split(strip_parens(group))
        .map(|term| {
            parse_predicate(term).map_err(|err| match err {
                PlanError::ParseError(msg) => {
                    PlanError::ParseError(format!("group {number}: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}

/// `text` trimmed, without any parentheses wrapped around it
fn strip_parens(text: &str) -> &str {
    text.trim()
        .trim_start_matches(|c: char| c == '(' || c.is_whitespace())
        .trim_end_matches(|c: char| c == ')' || c.is_whitespace())
}
