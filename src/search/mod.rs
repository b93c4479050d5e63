//! # Top-Down Plan Search
//!
//! Enumerates predicate evaluation orders for a boolean filter expression and
//! keeps the cheapest resulting plan.
//!
//! ## Algorithm
//!
//! For an expression `E` reached under assignments `A`:
//!
//! 1. If `E` is resolved or has no predicates left, stop: `(None, [])`.
//! 2. For every remaining predicate `p`, in first-occurrence order:
//!    - build the fragment `[map(columns of p not yet bound), select(p)]`
//!    - solve `E[p := true]` and `E[p := false]` recursively
//!    - cost = fragment + true sub-plan + false sub-plan
//!    - graft both sub-plans under the fragment and record the candidate
//! 3. Return the first minimum-cost candidate and every candidate.
//!
//! ```text
//! (c > 0 AND l > 0) OR (r > 0)
//!
//! map (r),select (r > 0)              <- candidate trying r first
//!     F map (c),select (c > 0)
//!     F     T map (l),select (l > 0)
//! ```
//!
//! The branch factor at each level is the number of remaining distinct
//! predicates, so the search is exponential in that count. There is no
//! sharing between orders unless memoization is enabled; with it, sub-problems
//! are keyed on the set of fixed assignments and the output is unchanged.
//! `max_predicates` rejects oversized expressions up front and a
//! [`SearchBudget`] caps expansions and wall-clock time while running.

mod budget;
mod memo;

pub use budget::{BudgetExhausted, SearchBudget};
pub use memo::{AssignmentKey, SearchMemo};

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, trace, warn};

use crate::boolean_exp::{BooleanExp, Resolution};
use crate::config::SearchConfig;
use crate::cost::{self, CostModel};
use crate::error::{PlanError, PlanResult};
use crate::plan_tree::{PlanTree, PlanTreeNode};
use crate::predicate::{Assignment, Predicate};

/// One fully merged plan with its aggregated cost.
///
/// Costs are compared numerically; a NaN cost never beats a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Predicate evaluated at the plan's root
    pub predicate: Predicate,
    pub plan: PlanTree,
    pub cost: f64,
}

/// Counters collected during one search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Sub-problems examined (memo hits excluded)
    pub expansions: usize,
    /// Candidates built at every level
    pub candidates_built: usize,
    /// Branches ending in a satisfied expression
    pub terminal_true: usize,
    /// Branches ending in a violated expression
    pub terminal_false: usize,
    /// Branches ending with no predicates and no fixed value
    pub terminal_undetermined: usize,
    /// Sub-problems answered from the memo
    pub memo_hits: usize,
    /// Longest assignment path explored
    pub max_depth: usize,
}

impl SearchStats {
    pub fn terminal_branches(&self) -> usize {
        self.terminal_true + self.terminal_false + self.terminal_undetermined
    }
}

/// Best plan and every candidate tried at the top level
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub best: Option<Candidate>,
    pub candidates: Vec<Candidate>,
    pub stats: SearchStats,
}

impl SearchOutcome {
    pub fn best_plan(&self) -> Option<&PlanTree> {
        self.best.as_ref().map(|c| &c.plan)
    }

    pub fn plans(&self) -> impl Iterator<Item = &PlanTree> {
        self.candidates.iter().map(|c| &c.plan)
    }

    /// True when the expression needed no branching at all
    pub fn is_trivial(&self) -> bool {
        self.best.is_none() && self.candidates.is_empty()
    }
}

/// Top-down plan search driven by an injected cost model
pub struct TopDownSearch {
    cost: Box<dyn CostModel>,
    memoize: bool,
    max_predicates: usize,
    max_expansions: usize,
    timeout_ms: u64,
}

impl TopDownSearch {
    /// Search with `cost`, no memo and no limits
    pub fn new(cost: impl CostModel + 'static) -> Self {
        TopDownSearch::with_cost_model(Box::new(cost))
    }

    pub fn with_cost_model(cost: Box<dyn CostModel>) -> Self {
        TopDownSearch {
            cost,
            memoize: false,
            max_predicates: 0,
            max_expansions: 0,
            timeout_ms: 0,
        }
    }

    /// Search configured from `[search]` with the given cost model
    pub fn from_config(config: &SearchConfig, cost: Box<dyn CostModel>) -> Self {
        TopDownSearch {
            cost,
            memoize: config.memoize,
            max_predicates: config.max_predicates,
            max_expansions: config.max_expansions,
            timeout_ms: config.timeout_ms,
        }
    }

    /// Reuse results for assignment sets reached through different orders
    pub fn memoize(mut self, enabled: bool) -> Self {
        self.memoize = enabled;
        self
    }

    /// Reject expressions with more distinct predicates (0 = unlimited)
    pub fn with_max_predicates(mut self, limit: usize) -> Self {
        self.max_predicates = limit;
        self
    }

    /// Sub-problems one search may expand (0 = unlimited)
    pub fn with_max_expansions(mut self, limit: usize) -> Self {
        self.max_expansions = limit;
        self
    }

    /// Wall-clock budget per search in milliseconds (0 = unlimited)
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn cost_model(&self) -> &dyn CostModel {
        self.cost.as_ref()
    }

    /// Search from the seed scan with no assignments
    pub fn search(&self, expression: &BooleanExp) -> PlanResult<SearchOutcome> {
        self.search_from(&PlanTree::seed(), expression, &[], true)
    }

    /// Search under an explicit budget, e.g. one stopped from another thread.
    ///
    /// The budget replaces the configured expansion and time limits.
    pub fn search_with_budget(
        &self,
        expression: &BooleanExp,
        budget: &SearchBudget,
    ) -> PlanResult<SearchOutcome> {
        self.run(&PlanTree::seed(), expression, &[], true, budget)
    }

    /// Search starting from an accumulated tree and assignment path
    pub fn search_from(
        &self,
        current: &PlanTree,
        expression: &BooleanExp,
        assignments: &[Assignment],
        branch: bool,
    ) -> PlanResult<SearchOutcome> {
        let budget = SearchBudget::from_limits(self.max_expansions, self.timeout_ms);
        self.run(current, expression, assignments, branch, &budget)
    }

    fn run(
        &self,
        current: &PlanTree,
        expression: &BooleanExp,
        assignments: &[Assignment],
        branch: bool,
        budget: &SearchBudget,
    ) -> PlanResult<SearchOutcome> {
        let distinct = expression.predicates().len();
        if self.max_predicates > 0 && distinct > self.max_predicates {
            return Err(PlanError::PredicateLimitExceeded {
                limit: self.max_predicates,
                actual: distinct,
            });
        }

        let mut run = SearchRun {
            search: self,
            budget,
            base_columns: current
                .predicates()
                .into_iter()
                .map(|p| p.column().to_string())
                .collect(),
            memo: self.memoize.then(SearchMemo::new),
            stats: SearchStats::default(),
        };
        let (best, candidates) = run.explore(current, expression, assignments, branch)?;
        let mut stats = run.stats;
        stats.memo_hits = run.memo.as_ref().map_or(0, SearchMemo::hits);

        info!(
            expression = %expression,
            candidates = candidates.len(),
            best_cost = best.as_ref().map(|c| c.cost),
            expansions = stats.expansions,
            memo_hits = stats.memo_hits,
            elapsed_ms = budget.elapsed().as_millis() as u64,
            "plan search finished"
        );

        Ok(SearchOutcome {
            best,
            candidates,
            stats,
        })
    }

    /// Fragment evaluating `predicate` below `current`.
    ///
    /// Columns already bound by `current` or by any assignment on the path are
    /// not requested again; the map step is kept even when it has no columns.
    pub fn build_fragment(
        predicate: &Predicate,
        current: &PlanTree,
        assignments: &[Assignment],
    ) -> PlanTree {
        let bound: HashSet<&str> = current
            .predicates()
            .into_iter()
            .map(Predicate::column)
            .chain(assignments.iter().map(|a| a.predicate.column()))
            .collect();
        fragment_for(predicate, &bound)
    }
}

fn fragment_for(predicate: &Predicate, bound: &HashSet<&str>) -> PlanTree {
    let needed: Vec<String> = predicate
        .required_columns()
        .into_iter()
        .filter(|c| !bound.contains(c))
        .map(str::to_string)
        .collect();
    PlanTree::from_root(PlanTreeNode::map_select(needed, predicate.clone()))
}

/// State for one invocation of the search
struct SearchRun<'a> {
    search: &'a TopDownSearch,
    budget: &'a SearchBudget,
    /// Columns bound by the tree the search started from
    base_columns: HashSet<String>,
    memo: Option<SearchMemo>,
    stats: SearchStats,
}

impl SearchRun<'_> {
    fn explore(
        &mut self,
        current: &PlanTree,
        expression: &BooleanExp,
        assignments: &[Assignment],
        branch: bool,
    ) -> PlanResult<(Option<Candidate>, Vec<Candidate>)> {
        self.budget.admit(self.stats.expansions + 1)?;
        self.stats.expansions += 1;
        self.stats.max_depth = self.stats.max_depth.max(assignments.len());

        let remaining = expression.predicates();
        if expression.resolution().is_resolved() || remaining.is_empty() {
            self.record_terminal(expression.resolution());
            return Ok((None, Vec::new()));
        }

        debug!(
            depth = assignments.len(),
            branch,
            expression = %expression,
            remaining = remaining.len(),
            "expanding"
        );

        let mut best: Option<Candidate> = None;
        let mut candidates = Vec::with_capacity(remaining.len());

        for predicate in remaining {
            let fragment = self.fragment(predicate, current, assignments);

            let true_sub = self.solve(&fragment, expression, assignments, predicate, true)?;
            let false_sub = self.solve(&fragment, expression, assignments, predicate, false)?;

            let cost = self.search.cost.plan_cost(Some(&fragment))
                + self.sub_cost(true_sub.as_ref())
                + self.sub_cost(false_sub.as_ref());

            let mut plan = fragment.clone();
            if let Some(sub) = &true_sub {
                plan.append_child_tree(true, &sub.plan)?;
            }
            if let Some(sub) = &false_sub {
                plan.append_child_tree(false, &sub.plan)?;
            }

            if cost.is_nan() {
                warn!(predicate = %predicate, "cost model returned NaN");
            }
            trace!(predicate = %predicate, cost, nodes = plan.len(), "candidate");
            self.stats.candidates_built += 1;

            let candidate = Candidate {
                predicate: predicate.clone(),
                plan,
                cost,
            };
            if best.as_ref().is_none_or(|b| cheaper(cost, b.cost)) {
                best = Some(candidate.clone());
            }
            candidates.push(candidate);
        }

        Ok((best, candidates))
    }

    /// Best sub-plan after fixing `predicate` to `value`
    fn solve(
        &mut self,
        fragment: &PlanTree,
        expression: &BooleanExp,
        assignments: &[Assignment],
        predicate: &Predicate,
        value: bool,
    ) -> PlanResult<Option<Candidate>> {
        let assignment = Assignment::new(predicate.clone(), value);
        let next = expression.apply_substitution(&assignment);
        let mut path = Vec::with_capacity(assignments.len() + 1);
        path.extend_from_slice(assignments);
        path.push(assignment);

        let key = self.memo.as_ref().map(|_| AssignmentKey::new(&path));
        if let (Some(memo), Some(key)) = (self.memo.as_mut(), key.as_ref()) {
            if let Some(hit) = memo.get(key) {
                return Ok(hit);
            }
        }

        let (best, _) = self.explore(fragment, &next, &path, value)?;

        if let (Some(memo), Some(key)) = (self.memo.as_mut(), key) {
            memo.insert(key, best.clone());
        }
        Ok(best)
    }

    fn fragment(
        &self,
        predicate: &Predicate,
        current: &PlanTree,
        assignments: &[Assignment],
    ) -> PlanTree {
        let bound: HashSet<&str> = self
            .base_columns
            .iter()
            .map(String::as_str)
            .chain(current.predicates().into_iter().map(Predicate::column))
            .chain(assignments.iter().map(|a| a.predicate.column()))
            .collect();
        fragment_for(predicate, &bound)
    }

    fn sub_cost(&self, sub: Option<&Candidate>) -> f64 {
        self.search.cost.plan_cost(sub.map(|c| &c.plan))
    }

    fn record_terminal(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::TriviallyTrue => self.stats.terminal_true += 1,
            Resolution::TriviallyFalse => self.stats.terminal_false += 1,
            Resolution::Undetermined => self.stats.terminal_undetermined += 1,
        }
    }
}

/// Strictly cheaper, so ties keep the earlier candidate. NaN ranks last.
fn cheaper(cost: f64, than: f64) -> bool {
    match (cost.is_nan(), than.is_nan()) {
        (true, _) => false,
        (false, true) => true,
        (false, false) => cost < than,
    }
}

/// Search with the reference constant cost model
pub fn search_constant(expression: &BooleanExp) -> PlanResult<SearchOutcome> {
    TopDownSearch::new(cost::ConstantCost::default()).search(expression)
}
