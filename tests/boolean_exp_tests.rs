//! Substitution and evaluation properties of DNF/CNF expressions.

use proptest::prelude::*;

use tdplan::{Assignment, BooleanExp, ComparisonOp, NormalForm, Predicate, Resolution};

const COLUMNS: [&str; 5] = ["a", "b", "c", "d", "e"];

fn gt0(col: &str) -> Predicate {
    Predicate::new(col, ComparisonOp::GreaterThan, "0")
}

fn column_slot(p: &Predicate) -> usize {
    COLUMNS.iter().position(|c| *c == p.column()).unwrap()
}

fn expression() -> impl Strategy<Value = BooleanExp> {
    (
        prop::collection::vec(prop::collection::vec(0usize..COLUMNS.len(), 1..4), 1..4),
        any::<bool>(),
    )
        .prop_map(|(groups, cnf)| {
            let groups = groups
                .into_iter()
                .map(|g| g.into_iter().map(|i| gt0(COLUMNS[i])).collect())
                .collect();
            let form = if cnf { NormalForm::Cnf } else { NormalForm::Dnf };
            BooleanExp::new(groups, form)
        })
}

// Scenario Tests
#[test]
fn test_dnf_true_short_circuits() {
    let exp = BooleanExp::new(vec![vec![gt0("c"), gt0("l")], vec![gt0("r")]], NormalForm::Dnf);
    let after = exp.apply_substitution(&Assignment::new(gt0("r"), true));
    assert_eq!(after.resolution(), Resolution::TriviallyTrue);
    assert!(after.groups().is_empty());
    assert!(after.predicates().is_empty());
}

#[test]
fn test_dnf_false_drops_group() {
    let exp = BooleanExp::new(vec![vec![gt0("c"), gt0("l")], vec![gt0("r")]], NormalForm::Dnf);
    let after = exp.apply_substitution(&Assignment::new(gt0("r"), false));
    assert_eq!(after.resolution(), Resolution::Undetermined);
    assert_eq!(after.groups(), &[vec![gt0("c"), gt0("l")]]);
}

#[test]
fn test_dnf_all_groups_dropped_is_false() {
    let exp = BooleanExp::new(vec![vec![gt0("c"), gt0("l")]], NormalForm::Dnf);
    let after = exp.apply_substitution(&Assignment::new(gt0("l"), false));
    assert_eq!(after.resolution(), Resolution::TriviallyFalse);
}

#[test]
fn test_cnf_false_short_circuits() {
    let exp = BooleanExp::new(vec![vec![gt0("a"), gt0("b")], vec![gt0("c")]], NormalForm::Cnf);
    let after = exp.apply_substitution(&Assignment::new(gt0("c"), false));
    assert_eq!(after.resolution(), Resolution::TriviallyFalse);
}

#[test]
fn test_cnf_true_satisfies_group() {
    let exp = BooleanExp::new(vec![vec![gt0("a"), gt0("b")], vec![gt0("c")]], NormalForm::Cnf);
    let after = exp.apply_substitution(&Assignment::new(gt0("a"), true));
    assert_eq!(after.groups(), &[vec![gt0("c")]]);
    let done = after.apply_substitution(&Assignment::new(gt0("c"), true));
    assert_eq!(done.resolution(), Resolution::TriviallyTrue);
}

#[test]
fn test_cnf_false_shrinks_group() {
    let exp = BooleanExp::new(vec![vec![gt0("a"), gt0("b")], vec![gt0("c")]], NormalForm::Cnf);
    let after = exp.apply_substitution(&Assignment::new(gt0("a"), false));
    assert_eq!(after.groups(), &[vec![gt0("b")], vec![gt0("c")]]);
}

#[test]
fn test_unrelated_assignment_is_noop() {
    let exp = BooleanExp::new(vec![vec![gt0("a")]], NormalForm::Dnf);
    assert_eq!(exp.apply_substitution(&Assignment::new(gt0("z"), true)), exp);
}

#[test]
fn test_matching_is_by_value() {
    let exp = BooleanExp::new(vec![vec![gt0("a")]], NormalForm::Dnf);
    let other_literal = Predicate::new("a", ComparisonOp::GreaterThan, "1");
    assert_eq!(exp.apply_substitution(&Assignment::new(other_literal, true)), exp);
}

#[test]
fn test_empty_expression_is_undetermined() {
    let exp = BooleanExp::empty(NormalForm::Cnf);
    assert_eq!(exp.resolution(), Resolution::Undetermined);
    let after = exp.apply_substitution(&Assignment::new(gt0("a"), false));
    assert_eq!(after.resolution(), Resolution::Undetermined);
}

// Property Tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Fixing the same predicate twice changes nothing further
    #[test]
    fn prop_substitution_idempotent(exp in expression(), slot in 0usize..5, value in any::<bool>()) {
        let assignment = Assignment::new(gt0(COLUMNS[slot]), value);
        let once = exp.apply_substitution(&assignment);
        let twice = once.apply_substitution(&assignment);
        prop_assert_eq!(once, twice);
    }

    /// A consistent substitution never changes the expression's value
    #[test]
    fn prop_substitution_preserves_value(
        exp in expression(),
        truth in prop::collection::vec(any::<bool>(), 5),
        slot in 0usize..5,
    ) {
        let eval = |p: &Predicate| truth[column_slot(p)];
        let assignment = Assignment::new(gt0(COLUMNS[slot]), truth[slot]);
        prop_assert_eq!(exp.apply_substitution(&assignment).evaluate(eval), exp.evaluate(eval));
    }

    /// Fixing every predicate resolves the expression to its value
    #[test]
    fn prop_full_assignment_resolves(
        exp in expression(),
        truth in prop::collection::vec(any::<bool>(), 5),
    ) {
        let assignments: Vec<Assignment> = COLUMNS
            .iter()
            .zip(&truth)
            .map(|(c, v)| Assignment::new(gt0(c), *v))
            .collect();
        let resolved = exp.apply_all(&assignments);
        let expected = exp.evaluate(|p| truth[column_slot(p)]);
        prop_assert_eq!(resolved.resolution().value(), Some(expected));
    }

    /// Assignment order does not affect the final resolution
    #[test]
    fn prop_order_independent(
        exp in expression(),
        truth in prop::collection::vec(any::<bool>(), 5),
    ) {
        let forward: Vec<Assignment> = COLUMNS
            .iter()
            .zip(&truth)
            .map(|(c, v)| Assignment::new(gt0(c), *v))
            .collect();
        let backward: Vec<Assignment> = forward.iter().rev().cloned().collect();
        prop_assert_eq!(
            exp.apply_all(&forward).resolution(),
            exp.apply_all(&backward).resolution()
        );
    }

    /// Substitution only ever removes predicates
    #[test]
    fn prop_predicates_shrink(exp in expression(), slot in 0usize..5, value in any::<bool>()) {
        let assignment = Assignment::new(gt0(COLUMNS[slot]), value);
        let after = exp.apply_substitution(&assignment);
        prop_assert!(!after.predicates().contains(&&assignment.predicate));
        prop_assert!(after.predicates().iter().all(|p| exp.predicates().contains(p)));
    }
}
