//! # tdplan: Top-Down Predicate Plan Search
//!
//! Plans the evaluation order of a boolean filter condition. Given an
//! expression in DNF or CNF, the planner tries every predicate as the next
//! test, simplifies the expression under each outcome, and recurses. The
//! result is a binary plan tree per choice, each priced by an injected cost
//! model, plus the cheapest one.
//!
//! ## Pipeline
//!
//! ```text
//! "(c > 0 AND l > 0) OR (r > 0)"
//!     ↓
//! [parser]          → BooleanExp (groups + normal form)
//!     ↓
//! [search]          → candidates, one per root predicate
//!     │   ├── boolean_exp: substitute + simplify per branch
//!     │   ├── plan_tree:   fragment + graft sub-plans
//!     │   └── cost:        fragment + true sub-plan + false sub-plan
//!     ↓
//! SearchOutcome     → best plan, all candidates, stats
//!     ↓
//! [execution]       → rows reaching each terminal branch (optional)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tdplan::{Config, NormalForm, Planner};
//!
//! let planner = Planner::new(Config::load()?);
//! let outcome = planner.plan_str("(c > 0 AND l > 0) OR (r > 0)", Some(NormalForm::Dnf))?;
//! if let Some(plan) = outcome.best_plan() {
//!     print!("{plan}");
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `predicate` | Atomic comparisons and truth assignments |
//! | `boolean_exp` | DNF/CNF expressions and substitution |
//! | `plan_tree` | Heap-addressed binary plan trees and grafting |
//! | `cost` | Pluggable cost models |
//! | `search` | Recursive top-down plan enumeration |
//! | `parser` | Text → predicates and expressions |
//! | `execution` | CSV tables and plan execution |
//! | `config` | Hierarchical configuration |

pub mod boolean_exp;
pub mod config;
pub mod cost;
pub mod error;
pub mod execution;
pub mod parser;
pub mod plan_tree;
pub mod predicate;
pub mod search;

// Re-export public types
pub use boolean_exp::{BooleanExp, NormalForm, Resolution};
pub use config::Config;
pub use cost::{ConstantCost, CostModel, CostModelKind, StepCost};
pub use error::{PlanError, PlanResult};
pub use execution::{Executor, LeafRows, OperationResult, Table};
pub use plan_tree::{PlanTree, PlanTreeNode, Step, StepAction};
pub use predicate::{Assignment, ComparisonOp, Predicate};
pub use search::{
    BudgetExhausted, Candidate, SearchBudget, SearchOutcome, SearchStats, TopDownSearch,
};

/// Configured entry point: parse, search, and report
pub struct Planner {
    config: Config,
    search: TopDownSearch,
}

impl Planner {
    /// Build the cost model and search described by `config`
    pub fn new(config: Config) -> Self {
        let search = TopDownSearch::from_config(&config.search, cost::from_config(&config.cost));
        Planner { config, search }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn search(&self) -> &TopDownSearch {
        &self.search
    }

    /// Search an already-built expression
    pub fn plan(&self, expression: &BooleanExp) -> PlanResult<SearchOutcome> {
        self.search.search(expression)
    }

    /// Parse `query` and search it.
    ///
    /// `form` falls back to `search.default_form` from the configuration.
    pub fn plan_str(&self, query: &str, form: Option<NormalForm>) -> PlanResult<SearchOutcome> {
        let form = form.unwrap_or(self.config.search.default_form);
        let expression = parser::parse_expression(query, form)?;
        self.plan(&expression)
    }
}

impl Default for Planner {
    fn default() -> Self {
        Planner::new(Config::default())
    }
}
