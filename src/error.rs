//! Planner Error Types

use std::io;
use thiserror::Error;

use crate::search::BudgetExhausted;

/// Errors raised while parsing, planning, or executing a predicate plan
#[derive(Error, Debug)]
pub enum PlanError {
    /// Operator token outside `=`, `!=`, `<`, `<=`, `>`, `>=`
    #[error("Invalid operator: '{0}'")]
    InvalidOperator(String),

    /// Predicate references a column absent from the schema
    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),

    /// A select step reads a column that no map step on its path materialized
    #[error("Column '{0}' is not materialized on this plan path")]
    ColumnNotMaterialized(String),

    /// Malformed expression or data text
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Plan node without steps, or a tree node without a parent
    #[error("Malformed plan: {0}")]
    MalformedPlan(String),

    /// Node appended under an unpopulated plan tree slot
    #[error("Plan tree has no node at index {0}")]
    MissingParent(usize),

    /// Row width does not match the table schema
    #[error("Row {row} has {actual} fields, expected {expected}")]
    RowArity {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Search stopped before finishing
    #[error("Search budget exhausted: {0}")]
    Budget(#[from] BudgetExhausted),

    /// Expression has more distinct predicates than the configured limit
    #[error("Expression has {actual} distinct predicates, limit is {limit}")]
    PredicateLimitExceeded { limit: usize, actual: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] figment::Error),
}

/// Result type for planner operations
pub type PlanResult<T> = Result<T, PlanError>;
