//! # Search Budget
//!
//! The search tree grows as `n!` in the number of distinct predicates, so a
//! run can be capped by how many sub-problems it expands, by how long it
//! runs, or stopped from outside.
//!
//! ```text
//! explore(E, A) ──> admit(expansions + 1) ──> Ok  ──> expand E
//!                                         └─> Err ──> unwind with PlanError::Budget
//! ```
//!
//! Clones of a budget share one stop flag: hand a clone to another thread and
//! call [`SearchBudget::stop`] there to end the search at its next expansion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a search gave up before finishing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BudgetExhausted {
    #[error("stopped on request after {expansions} expansions")]
    Stopped { expansions: usize },

    #[error("ran past {limit:?} after {expansions} expansions")]
    OutOfTime { limit: Duration, expansions: usize },

    #[error("reached the limit of {limit} expansions")]
    OutOfExpansions { limit: usize },
}

/// Limits on one plan search
#[derive(Debug, Clone)]
pub struct SearchBudget {
    max_expansions: Option<usize>,
    time_limit: Option<Duration>,
    started: Instant,
    stopped: Arc<AtomicBool>,
}

impl SearchBudget {
    /// No limits; only [`SearchBudget::stop`] ends the search early
    pub fn unlimited() -> Self {
        SearchBudget {
            max_expansions: None,
            time_limit: None,
            started: Instant::now(),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Budget from raw settings where 0 disables a limit
    pub fn from_limits(max_expansions: usize, timeout_ms: u64) -> Self {
        let mut budget = SearchBudget::unlimited();
        if max_expansions > 0 {
            budget = budget.with_max_expansions(max_expansions);
        }
        if timeout_ms > 0 {
            budget = budget.with_time_limit(Duration::from_millis(timeout_ms));
        }
        budget
    }

    pub fn with_max_expansions(mut self, limit: usize) -> Self {
        self.max_expansions = Some(limit);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Whether the search may expand its `expansion`-th sub-problem (1-based).
    ///
    /// Running out of time also raises the stop flag, so clones held by other
    /// threads observe it.
    pub fn admit(&self, expansion: usize) -> Result<(), BudgetExhausted> {
        let done = expansion.saturating_sub(1);
        if self.is_stopped() {
            return Err(BudgetExhausted::Stopped { expansions: done });
        }
        if let Some(limit) = self.max_expansions {
            if expansion > limit {
                return Err(BudgetExhausted::OutOfExpansions { limit });
            }
        }
        if let Some(limit) = self.time_limit {
            if self.started.elapsed() > limit {
                self.stop();
                return Err(BudgetExhausted::OutOfTime {
                    limit,
                    expansions: done,
                });
            }
        }
        Ok(())
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn max_expansions(&self) -> Option<usize> {
        self.max_expansions
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        SearchBudget::unlimited()
    }
}
