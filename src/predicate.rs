//! Atomic predicates and truth-value assignments.
//!
//! A [`Predicate`] is a single `column op literal` comparison. Predicates are
//! plain values: two predicates with the same column, operator, and literal
//! denote the same condition everywhere in a search.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PlanError, PlanResult};

/// Comparison operator of an atomic predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
}

impl ComparisonOp {
    /// All operators, in declaration order
    pub const ALL: [ComparisonOp; 6] = [
        ComparisonOp::Equal,
        ComparisonOp::NotEqual,
        ComparisonOp::LessThan,
        ComparisonOp::LessOrEqual,
        ComparisonOp::GreaterThan,
        ComparisonOp::GreaterOrEqual,
    ];

    /// Textual operator token
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessOrEqual => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterOrEqual => ">=",
        }
    }

    /// Compare two raw field values.
    ///
    /// Comparison is lexicographic on the strings for every operator; values
    /// are never coerced to numbers, so `"10" < "9"` holds.
    pub fn compare(&self, lhs: &str, rhs: &str) -> bool {
        match self {
            ComparisonOp::Equal => lhs == rhs,
            ComparisonOp::NotEqual => lhs != rhs,
            ComparisonOp::LessThan => lhs < rhs,
            ComparisonOp::LessOrEqual => lhs <= rhs,
            ComparisonOp::GreaterThan => lhs > rhs,
            ComparisonOp::GreaterOrEqual => lhs >= rhs,
        }
    }
}

impl FromStr for ComparisonOp {
    type Err = PlanError;

    fn from_str(s: &str) -> PlanResult<Self> {
        ComparisonOp::ALL
            .into_iter()
            .find(|op| op.symbol() == s)
            .ok_or_else(|| PlanError::InvalidOperator(s.to_string()))
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Atomic comparison between a column and a literal
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Predicate {
    column: String,
    op: ComparisonOp,
    literal: String,
}

impl Predicate {
    /// Create a predicate from an already-resolved operator
    pub fn new(column: impl Into<String>, op: ComparisonOp, literal: impl Into<String>) -> Self {
        Predicate {
            column: column.into(),
            op,
            literal: literal.into(),
        }
    }

    /// Create a predicate from raw tokens, resolving the operator.
    ///
    /// Fails with [`PlanError::InvalidOperator`] for any token outside the
    /// six supported comparisons.
    pub fn from_parts(column: &str, op: &str, literal: &str) -> PlanResult<Self> {
        Ok(Predicate::new(column, op.parse()?, literal))
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn op(&self) -> ComparisonOp {
        self.op
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Columns this predicate needs materialized before it can be evaluated
    pub fn required_columns(&self) -> Vec<&str> {
        vec![self.column.as_str()]
    }

    /// Evaluate against the raw value of this predicate's column
    pub fn evaluate(&self, value: &str) -> bool {
        self.op.compare(value, &self.literal)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.op, self.literal)
    }
}

/// Hypothesis that `predicate` evaluates to `value` within one search branch
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Assignment {
    pub predicate: Predicate,
    pub value: bool,
}

impl Assignment {
    pub fn new(predicate: Predicate, value: bool) -> Self {
        Assignment { predicate, value }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) := {}", self.predicate, self.value)
    }
}
