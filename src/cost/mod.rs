//! # Cost Models
//!
//! The plan search never estimates cost itself; it asks an injected
//! [`CostModel`] for the cost of each fragment and of missing sub-plans, then
//! sums them:
//!
//! ```text
//! cost(candidate) = cost(fragment) + cost(true sub-plan) + cost(false sub-plan)
//! ```
//!
//! Sub-plans are priced as whole trees and an absent sub-plan costs
//! `plan_cost(None)`. Aggregation is a plain sum, so with non-negative models a
//! candidate never costs less than any of its parts.
//!
//! Any `Fn(Option<&PlanTree>) -> f64` closure is a cost model.

use serde::{Deserialize, Serialize};

use crate::config::CostConfig;
use crate::plan_tree::{PlanTree, StepAction};

/// Numeric cost of a (sub)plan
pub trait CostModel {
    /// Cost of `plan`, or of an absent plan when `None`
    fn plan_cost(&self, plan: Option<&PlanTree>) -> f64;
}

impl<F> CostModel for F
where
    F: Fn(Option<&PlanTree>) -> f64,
{
    fn plan_cost(&self, plan: Option<&PlanTree>) -> f64 {
        self(plan)
    }
}

/// Every plan, present or absent, costs the same.
///
/// Best-plan selection degenerates to "first candidate tried".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantCost(pub f64);

impl Default for ConstantCost {
    fn default() -> Self {
        ConstantCost(1.0)
    }
}

impl CostModel for ConstantCost {
    fn plan_cost(&self, _plan: Option<&PlanTree>) -> f64 {
        self.0
    }
}

/// Charges per select step and per materialized column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepCost {
    pub select_weight: f64,
    pub map_weight: f64,
    pub empty_plan: f64,
}

impl Default for StepCost {
    fn default() -> Self {
        StepCost {
            select_weight: 1.0,
            map_weight: 0.5,
            empty_plan: 0.0,
        }
    }
}

impl CostModel for StepCost {
    fn plan_cost(&self, plan: Option<&PlanTree>) -> f64 {
        let Some(plan) = plan else {
            return self.empty_plan;
        };
        plan.nodes()
            .flat_map(|(_, node)| node.steps().iter())
            .map(|step| match step.action {
                StepAction::Select => self.select_weight,
                StepAction::Map => self.map_weight * step.columns.len() as f64,
                StepAction::Scan => 0.0,
            })
            .sum()
    }
}

/// Which built-in model a [`CostConfig`] selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CostModelKind {
    /// [`ConstantCost`]
    #[default]
    Constant,
    /// [`StepCost`]
    Steps,
}

/// Build the configured model
pub fn from_config(config: &CostConfig) -> Box<dyn CostModel> {
    match config.model {
        CostModelKind::Constant => Box::new(ConstantCost(config.constant)),
        CostModelKind::Steps => Box::new(StepCost {
            select_weight: config.select_weight,
            map_weight: config.map_weight,
            empty_plan: config.empty_plan,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan_tree::PlanTreeNode;
    use crate::predicate::{ComparisonOp, Predicate};

    fn fragment(col: &str, mapped: bool) -> PlanTree {
        let columns = if mapped { vec![col.to_string()] } else { Vec::new() };
        PlanTree::from_root(PlanTreeNode::map_select(
            columns,
            Predicate::new(col, ComparisonOp::GreaterThan, "0"),
        ))
    }

    #[test]
    fn test_constant_cost_ignores_plan() {
        let model = ConstantCost::default();
        assert_eq!(model.plan_cost(None), 1.0);
        assert_eq!(model.plan_cost(Some(&fragment("c", true))), 1.0);
    }

    #[test]
    fn test_step_cost() {
        let model = StepCost::default();
        assert_eq!(model.plan_cost(None), 0.0);
        assert_eq!(model.plan_cost(Some(&fragment("c", true))), 1.5);
        assert_eq!(model.plan_cost(Some(&fragment("c", false))), 1.0);
        assert_eq!(model.plan_cost(Some(&PlanTree::seed())), 0.0);
    }

    #[test]
    fn test_closure_is_cost_model() {
        let model = |plan: Option<&PlanTree>| plan.map_or(0.0, |p| p.len() as f64 * 2.0);
        assert_eq!(model.plan_cost(Some(&fragment("c", true))), 2.0);
        assert_eq!(model.plan_cost(None), 0.0);
    }

    #[test]
    fn test_from_config() {
        let mut config = CostConfig::default();
        assert_eq!(from_config(&config).plan_cost(None), 1.0);
        config.model = CostModelKind::Steps;
        config.empty_plan = 0.25;
        assert_eq!(from_config(&config).plan_cost(None), 0.25);
    }
}
