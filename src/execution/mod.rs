//! # Plan Execution
//!
//! Runs plan trees against an in-memory [`Table`] so a chosen plan can be
//! checked against real rows.
//!
//! ## Step Semantics
//!
//! | Step     | Effect |
//! |----------|--------|
//! | `scan`   | every row of the table, no columns materialized |
//! | `map`    | adds columns to the materialized set (must exist) |
//! | `select` | partitions the current rows by the predicate |
//!
//! Each node starts from the rows its parent sent down its branch and the
//! columns materialized above it. A tree without a scan root starts from a
//! full scan. Rows leaving through an open branch slot are reported as
//! [`LeafRows`].

mod table;

pub use table::{CsvOptions, Table};

use serde::Serialize;
use tracing::debug;

use crate::error::{PlanError, PlanResult};
use crate::plan_tree::{PlanTree, PlanTreeNode, StepAction};
use crate::predicate::Predicate;

/// Row ids split by the last predicate evaluated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub true_rows: Vec<usize>,
    pub false_rows: Vec<usize>,
    pub selected_columns: Vec<String>,
}

impl OperationResult {
    pub fn rows(&self, branch: bool) -> &[usize] {
        if branch {
            &self.true_rows
        } else {
            &self.false_rows
        }
    }
}

/// Rows leaving the plan through branch `branch` of node `parent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafRows {
    pub parent: usize,
    pub branch: bool,
    pub rows: Vec<usize>,
}

/// Evaluates plan steps over a table
#[derive(Debug, Clone, Copy)]
pub struct Executor<'a> {
    table: &'a Table,
}

impl<'a> Executor<'a> {
    pub fn new(table: &'a Table) -> Self {
        Executor { table }
    }

    pub fn table(&self) -> &Table {
        self.table
    }

    /// All rows on the true side, nothing materialized
    pub fn scan(&self) -> OperationResult {
        OperationResult {
            true_rows: (0..self.table.len()).collect(),
            false_rows: Vec::new(),
            selected_columns: Vec::new(),
        }
    }

    /// Materialize `columns` on top of `input`
    pub fn map(&self, input: &OperationResult, columns: &[String]) -> PlanResult<OperationResult> {
        for column in columns {
            self.table.column_index(column)?;
        }
        let mut selected = input.selected_columns.clone();
        for column in columns {
            if !selected.contains(column) {
                selected.push(column.clone());
            }
        }
        Ok(OperationResult {
            true_rows: input.true_rows.clone(),
            false_rows: input.false_rows.clone(),
            selected_columns: selected,
        })
    }

    /// Partition `input.rows(branch)` by `predicate`
    pub fn select(
        &self,
        input: &OperationResult,
        predicate: &Predicate,
        branch: bool,
    ) -> PlanResult<OperationResult> {
        let col = self.table.column_index(predicate.column())?;
        if !input.selected_columns.iter().any(|c| c == predicate.column()) {
            return Err(PlanError::ColumnNotMaterialized(predicate.column().to_string()));
        }

        let mut true_rows = Vec::new();
        let mut false_rows = Vec::new();
        for &row in input.rows(branch) {
            let value = self.table.rows()[row][col].as_str();
            if predicate.evaluate(value) {
                true_rows.push(row);
            } else {
                false_rows.push(row);
            }
        }

        Ok(OperationResult {
            true_rows,
            false_rows,
            selected_columns: input.selected_columns.clone(),
        })
    }

    /// Run `plan` and collect the rows reaching each open branch slot
    pub fn execute(&self, plan: &PlanTree) -> PlanResult<Vec<LeafRows>> {
        let mut leaves = Vec::new();
        if plan.root().is_some() {
            self.execute_node(plan, PlanTree::ROOT, self.scan(), &mut leaves)?;
        }
        debug!(nodes = plan.len(), leaves = leaves.len(), "plan executed");
        Ok(leaves)
    }

    fn execute_node(
        &self,
        plan: &PlanTree,
        index: usize,
        input: OperationResult,
        leaves: &mut Vec<LeafRows>,
    ) -> PlanResult<()> {
        let Some(node) = plan.node(index) else {
            return Ok(());
        };
        let output = self.run_steps(node, input)?;

        for branch in [true, false] {
            let rows = output.rows(branch).to_vec();
            let child = PlanTree::child(index, branch);
            if plan.node(child).is_some() {
                let next = OperationResult {
                    true_rows: rows,
                    false_rows: Vec::new(),
                    selected_columns: output.selected_columns.clone(),
                };
                self.execute_node(plan, child, next, leaves)?;
            } else {
                leaves.push(LeafRows {
                    parent: index,
                    branch,
                    rows,
                });
            }
        }
        Ok(())
    }

    fn run_steps(&self, node: &PlanTreeNode, input: OperationResult) -> PlanResult<OperationResult> {
        node.steps().iter().try_fold(input, |state, step| match step.action {
            StepAction::Scan => Ok(self.scan()),
            StepAction::Map => self.map(&state, &step.columns),
            StepAction::Select => match &step.predicate {
                Some(predicate) => self.select(&state, predicate, true),
                None => Ok(state),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::ComparisonOp;

    fn table() -> Table {
        Table::from_csv_str("c,l,r\n1,1,0\n0,1,1\n1,0,0\n").unwrap()
    }

    fn gt0(col: &str) -> Predicate {
        Predicate::new(col, ComparisonOp::GreaterThan, "0")
    }

    #[test]
    fn test_scan_returns_all_rows() {
        let table = table();
        let exec = Executor::new(&table);
        let res = exec.scan();
        assert_eq!(res.true_rows, vec![0, 1, 2]);
        assert!(res.false_rows.is_empty());
        assert!(res.selected_columns.is_empty());
    }

    #[test]
    fn test_map_then_select() {
        let table = table();
        let exec = Executor::new(&table);
        let mapped = exec.map(&exec.scan(), &["c".to_string()]).unwrap();
        let res = exec.select(&mapped, &gt0("c"), true).unwrap();
        assert_eq!(res.rows(true), &[0, 2]);
        assert_eq!(res.rows(false), &[1]);
    }

    #[test]
    fn test_select_requires_materialized_column() {
        let table = table();
        let exec = Executor::new(&table);
        let err = exec.select(&exec.scan(), &gt0("c"), true).unwrap_err();
        assert!(matches!(err, PlanError::ColumnNotMaterialized(c) if c == "c"));
    }

    #[test]
    fn test_map_unknown_column() {
        let table = table();
        let exec = Executor::new(&table);
        let err = exec.map(&exec.scan(), &["nope".to_string()]).unwrap_err();
        assert!(matches!(err, PlanError::UnknownColumn(_)));
    }

    #[test]
    fn test_execute_two_level_plan() {
        let table = table();
        let exec = Executor::new(&table);
        let mut plan = PlanTree::from_root(PlanTreeNode::map_select(vec!["r".to_string()], gt0("r")));
        plan.append_child(
            PlanTree::ROOT,
            false,
            PlanTreeNode::map_select(vec!["c".to_string()], gt0("c")),
        )
        .unwrap();

        let leaves = exec.execute(&plan).unwrap();
        assert_eq!(
            leaves,
            vec![
                LeafRows { parent: 0, branch: true, rows: vec![1] },
                LeafRows { parent: 1, branch: true, rows: vec![0, 2] },
                LeafRows { parent: 1, branch: false, rows: vec![] },
            ]
        );
    }

    #[test]
    fn test_execute_seed_scan() {
        let table = table();
        let leaves = Executor::new(&table).execute(&PlanTree::seed()).unwrap();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].rows, vec![0, 1, 2]);
        assert!(leaves[1].rows.is_empty());
    }
}
