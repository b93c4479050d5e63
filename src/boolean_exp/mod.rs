//! # Boolean Expressions
//!
//! Filter conditions in disjunctive or conjunctive normal form, plus the
//! substitution law the plan search uses to simplify them one assignment at a
//! time.
//!
//! ## Simplification
//!
//! | Form | Assignment | Group containing the predicate |
//! |------|------------|--------------------------------|
//! | DNF  | `true`     | predicate removed; empty group -> `TriviallyTrue` |
//! | DNF  | `false`    | group dropped |
//! | CNF  | `true`     | group dropped |
//! | CNF  | `false`    | predicate removed; empty group -> `TriviallyFalse` |
//!
//! Groups that do not mention the predicate pass through unchanged.
//!
//! ## Resolution
//!
//! An empty group list is never interpreted on its own. Every expression
//! carries a [`Resolution`]:
//!
//! ```text
//! (c > 0 AND l > 0) OR (r > 0)
//!     --[r > 0 := true]-->  TRUE            (short-circuit)
//!     --[r > 0 := false]--> (c > 0 AND l > 0)
//!         --[c > 0 := false]--> FALSE       (every group dropped)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{PlanError, PlanResult};
use crate::predicate::{Assignment, Predicate};

/// Normal form of a [`BooleanExp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalForm {
    /// OR of AND-groups
    #[default]
    Dnf,
    /// AND of OR-groups
    Cnf,
}

impl NormalForm {
    /// Connective joining groups
    pub fn outer_connective(&self) -> &'static str {
        match self {
            NormalForm::Dnf => "OR",
            NormalForm::Cnf => "AND",
        }
    }

    /// Connective joining predicates inside a group
    pub fn inner_connective(&self) -> &'static str {
        match self {
            NormalForm::Dnf => "AND",
            NormalForm::Cnf => "OR",
        }
    }
}

impl FromStr for NormalForm {
    type Err = PlanError;

    fn from_str(s: &str) -> PlanResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dnf" => Ok(NormalForm::Dnf),
            "cnf" => Ok(NormalForm::Cnf),
            other => Err(PlanError::ParseError(format!(
                "unknown normal form '{other}', expected 'dnf' or 'cnf'"
            ))),
        }
    }
}

impl fmt::Display for NormalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalForm::Dnf => f.write_str("dnf"),
            NormalForm::Cnf => f.write_str("cnf"),
        }
    }
}

/// Whether simplification has already fixed the expression's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Value still depends on the remaining groups (possibly none)
    #[default]
    Undetermined,
    /// Satisfied regardless of the remaining predicates
    TriviallyTrue,
    /// Violated regardless of the remaining predicates
    TriviallyFalse,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Undetermined)
    }

    /// Fixed truth value, if any
    pub fn value(&self) -> Option<bool> {
        match self {
            Resolution::Undetermined => None,
            Resolution::TriviallyTrue => Some(true),
            Resolution::TriviallyFalse => Some(false),
        }
    }

    fn from_value(value: bool) -> Self {
        if value {
            Resolution::TriviallyTrue
        } else {
            Resolution::TriviallyFalse
        }
    }
}

/// Boolean filter expression in normal form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BooleanExpRepr")]
pub struct BooleanExp {
    groups: Vec<Vec<Predicate>>,
    form: NormalForm,
    resolution: Resolution,
}

#[derive(Deserialize)]
struct BooleanExpRepr {
    groups: Vec<Vec<Predicate>>,
    form: NormalForm,
    #[serde(default)]
    resolution: Resolution,
}

impl TryFrom<BooleanExpRepr> for BooleanExp {
    type Error = PlanError;

    /// A resolved expression carries no groups; an undetermined one is
    /// rebuilt through [`BooleanExp::new`]
    fn try_from(repr: BooleanExpRepr) -> PlanResult<Self> {
        match repr.resolution {
            Resolution::Undetermined => Ok(BooleanExp::new(repr.groups, repr.form)),
            resolved if repr.groups.is_empty() => Ok(BooleanExp::resolved(repr.form, resolved)),
            resolved => Err(PlanError::ParseError(format!(
                "{resolved:?} expression still has {} groups",
                repr.groups.len()
            ))),
        }
    }
}

impl BooleanExp {
    /// Build an expression from predicate groups.
    ///
    /// An empty group already fixes the value (an empty AND is true, an empty
    /// OR is false), so it resolves the expression the same way substitution
    /// would.
    pub fn new(groups: Vec<Vec<Predicate>>, form: NormalForm) -> Self {
        if groups.iter().any(Vec::is_empty) {
            return BooleanExp::resolved(form, Resolution::from_value(form == NormalForm::Dnf));
        }
        BooleanExp {
            groups,
            form,
            resolution: Resolution::Undetermined,
        }
    }

    /// Expression with no groups and no predicates
    pub fn empty(form: NormalForm) -> Self {
        BooleanExp {
            groups: Vec::new(),
            form,
            resolution: Resolution::Undetermined,
        }
    }

    fn resolved(form: NormalForm, resolution: Resolution) -> Self {
        BooleanExp {
            groups: Vec::new(),
            form,
            resolution,
        }
    }

    pub fn groups(&self) -> &[Vec<Predicate>] {
        &self.groups
    }

    pub fn form(&self) -> NormalForm {
        self.form
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Distinct predicates referenced anywhere, in first-occurrence order
    pub fn predicates(&self) -> Vec<&Predicate> {
        let mut seen = HashSet::new();
        self.groups
            .iter()
            .flatten()
            .filter(|p| seen.insert(*p))
            .collect()
    }

    /// Fix `assignment.predicate` to `assignment.value` and simplify
    pub fn apply_substitution(&self, assignment: &Assignment) -> BooleanExp {
        if self.resolution.is_resolved() {
            return self.clone();
        }

        // DNF: a true predicate shrinks its groups, a false one kills them.
        // CNF is the dual.
        let shrinking_value = self.form == NormalForm::Dnf;
        let mut groups = Vec::with_capacity(self.groups.len());

        for group in &self.groups {
            if !group.contains(&assignment.predicate) {
                groups.push(group.clone());
                continue;
            }
            if assignment.value != shrinking_value {
                continue;
            }
            let remaining: Vec<Predicate> = group
                .iter()
                .filter(|p| **p != assignment.predicate)
                .cloned()
                .collect();
            if remaining.is_empty() {
                return BooleanExp::resolved(self.form, Resolution::from_value(shrinking_value));
            }
            groups.push(remaining);
        }

        if groups.is_empty() && !self.groups.is_empty() {
            // Every group was decided against the expression
            return BooleanExp::resolved(self.form, Resolution::from_value(!shrinking_value));
        }

        BooleanExp {
            groups,
            form: self.form,
            resolution: Resolution::Undetermined,
        }
    }

    /// Apply a sequence of assignments in order
    pub fn apply_all<'a>(&self, assignments: impl IntoIterator<Item = &'a Assignment>) -> BooleanExp {
        assignments
            .into_iter()
            .fold(self.clone(), |exp, a| exp.apply_substitution(a))
    }

    /// Evaluate with every predicate's truth given by `truth`.
    ///
    /// A resolved expression returns its fixed value; an undetermined
    /// expression with no groups evaluates to the empty OR/AND identity.
    pub fn evaluate(&self, truth: impl Fn(&Predicate) -> bool) -> bool {
        if let Some(value) = self.resolution.value() {
            return value;
        }
        match self.form {
            NormalForm::Dnf => self.groups.iter().any(|g| g.iter().all(&truth)),
            NormalForm::Cnf => self.groups.iter().all(|g| g.iter().any(&truth)),
        }
    }
}

impl fmt::Display for BooleanExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resolution {
            Resolution::TriviallyTrue => return f.write_str("TRUE"),
            Resolution::TriviallyFalse => return f.write_str("FALSE"),
            Resolution::Undetermined => {}
        }
        let inner = format!(" {} ", self.form.inner_connective());
        let outer = format!(" {} ", self.form.outer_connective());
        let rendered: Vec<String> = self
            .groups
            .iter()
            .map(|group| {
                let preds: Vec<String> = group.iter().map(ToString::to_string).collect();
                format!("({})", preds.join(&inner))
            })
            .collect();
        f.write_str(&rendered.join(&outer))
    }
}
