//! Memo of solved sub-problems, keyed on the set of fixed assignments.
//!
//! A sub-problem's result depends only on which predicates are fixed to which
//! values, not on the order they were fixed in: the simplified expression and
//! the columns bound on the path are both functions of that set. Reaching the
//! same set through a different predicate order reuses the stored result.

use std::collections::HashMap;

use super::Candidate;
use crate::predicate::Assignment;

/// Order-independent encoding of an assignment path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssignmentKey(Vec<Assignment>);

impl AssignmentKey {
    pub fn new(assignments: &[Assignment]) -> Self {
        let mut sorted = assignments.to_vec();
        sorted.sort();
        sorted.dedup();
        AssignmentKey(sorted)
    }
}

/// Best sub-plan per assignment set
#[derive(Debug, Default)]
pub struct SearchMemo {
    entries: HashMap<AssignmentKey, Option<Candidate>>,
    hits: usize,
}

impl SearchMemo {
    pub fn new() -> Self {
        SearchMemo::default()
    }

    pub fn get(&mut self, key: &AssignmentKey) -> Option<Option<Candidate>> {
        let found = self.entries.get(key).cloned();
        if found.is_some() {
            self.hits += 1;
        }
        found
    }

    pub fn insert(&mut self, key: AssignmentKey, best: Option<Candidate>) {
        self.entries.insert(key, best);
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{ComparisonOp, Predicate};

    fn asg(col: &str, value: bool) -> Assignment {
        Assignment::new(Predicate::new(col, ComparisonOp::Equal, "1"), value)
    }

    #[test]
    fn test_key_is_order_independent() {
        let a = AssignmentKey::new(&[asg("x", true), asg("y", false)]);
        let b = AssignmentKey::new(&[asg("y", false), asg("x", true)]);
        assert_eq!(a, b);
        assert_ne!(a, AssignmentKey::new(&[asg("x", true), asg("y", true)]));
    }

    #[test]
    fn test_memo_counts_hits() {
        let mut memo = SearchMemo::new();
        let key = AssignmentKey::new(&[asg("x", true)]);
        assert!(memo.get(&key).is_none());
        memo.insert(key.clone(), None);
        assert_eq!(memo.get(&key), Some(None));
        assert_eq!(memo.hits(), 1);
        assert_eq!(memo.len(), 1);
    }
}
