//! # Plan Trees
//!
//! Binary plan trees addressed like a binary heap:
//!
//! ```text
//!                 0
//!          F /         \ T
//!          1             2
//!       F / \ T       F / \ T
//!        3   4         5   6
//! ```
//!
//! The false child of `i` sits at `2i + 1`, the true child at `2i + 2`. Only
//! populated slots are stored, in an ordered map keyed by that index, so a deep
//! one-sided plan costs one entry per node instead of `2^(d+1) - 1` slots while
//! keeping the same parent/child coordinates.
//!
//! Trees are combined by [`PlanTree::graft`], which relocates every node of the
//! grafted tree by composing the graft point with the node's own parent/branch
//! chain.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{PlanError, PlanResult};
use crate::predicate::{Assignment, Predicate};

/// Physical operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    /// Produce every row identifier
    Scan,
    /// Partition the current rows by a predicate
    Select,
    /// Make columns available for predicate evaluation
    Map,
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::Scan => f.write_str("scan"),
            StepAction::Select => f.write_str("select"),
            StepAction::Map => f.write_str("map"),
        }
    }
}

/// One physical operation attached to a plan node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub action: StepAction,
    pub predicate: Option<Predicate>,
    pub columns: Vec<String>,
}

impl Step {
    pub fn scan() -> Self {
        Step {
            action: StepAction::Scan,
            predicate: None,
            columns: Vec::new(),
        }
    }

    pub fn map(columns: Vec<String>) -> Self {
        Step {
            action: StepAction::Map,
            predicate: None,
            columns,
        }
    }

    pub fn select(predicate: Predicate) -> Self {
        Step {
            action: StepAction::Select,
            predicate: Some(predicate),
            columns: Vec::new(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let predicate = self
            .predicate
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        write!(f, "{} ({}{})", self.action, predicate, self.columns.join(","))
    }
}

/// Ordered steps executed at one plan position; never empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NodeRepr")]
pub struct PlanTreeNode {
    steps: Vec<Step>,
}

#[derive(Deserialize)]
struct NodeRepr {
    steps: Vec<Step>,
}

impl TryFrom<NodeRepr> for PlanTreeNode {
    type Error = PlanError;

    fn try_from(repr: NodeRepr) -> PlanResult<Self> {
        PlanTreeNode::new(repr.steps)
    }
}

impl PlanTreeNode {
    pub fn new(steps: Vec<Step>) -> PlanResult<Self> {
        if steps.is_empty() {
            return Err(PlanError::MalformedPlan("node has no steps".to_string()));
        }
        Ok(PlanTreeNode { steps })
    }

    /// Bare scan, the seed of every search
    pub fn scan() -> Self {
        PlanTreeNode {
            steps: vec![Step::scan()],
        }
    }

    /// Materialize `columns`, then test `predicate`
    pub fn map_select(columns: Vec<String>, predicate: Predicate) -> Self {
        PlanTreeNode {
            steps: vec![Step::map(columns), Step::select(predicate)],
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Predicate tested by this node's select step, if any
    pub fn selected_predicate(&self) -> Option<&Predicate> {
        self.steps
            .iter()
            .filter(|s| s.action == StepAction::Select)
            .find_map(|s| s.predicate.as_ref())
    }

    /// Columns materialized by this node's map steps
    pub fn mapped_columns(&self) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .filter(|s| s.action == StepAction::Map)
            .flat_map(|s| s.columns.iter().map(String::as_str))
    }
}

impl fmt::Display for PlanTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self.steps.iter().map(ToString::to_string).collect();
        f.write_str(&steps.join(","))
    }
}

/// Heap-addressed binary plan tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TreeRepr")]
pub struct PlanTree {
    nodes: BTreeMap<usize, PlanTreeNode>,
}

#[derive(Deserialize)]
struct TreeRepr {
    nodes: BTreeMap<usize, PlanTreeNode>,
}

impl TryFrom<TreeRepr> for PlanTree {
    type Error = PlanError;

    /// Every populated non-root slot needs a populated parent
    fn try_from(repr: TreeRepr) -> PlanResult<Self> {
        for &index in repr.nodes.keys() {
            if let Some((parent, _)) = PlanTree::parent(index) {
                if !repr.nodes.contains_key(&parent) {
                    return Err(PlanError::MalformedPlan(format!(
                        "node {index} has no parent at {parent}"
                    )));
                }
            }
        }
        Ok(PlanTree { nodes: repr.nodes })
    }
}

impl PlanTree {
    pub const ROOT: usize = 0;

    /// Seed tree: a single bare scan
    pub fn seed() -> Self {
        PlanTree::from_root(PlanTreeNode::scan())
    }

    /// Single-node tree
    pub fn from_root(root: PlanTreeNode) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(Self::ROOT, root);
        PlanTree { nodes }
    }

    /// Index of `parent`'s child on `branch`
    pub fn child(parent: usize, branch: bool) -> usize {
        2 * parent + if branch { 2 } else { 1 }
    }

    /// Parent index and the branch `child` hangs on; `None` for the root
    pub fn parent(child: usize) -> Option<(usize, bool)> {
        if child == Self::ROOT {
            return None;
        }
        Some(((child - 1) / 2, child % 2 == 0))
    }

    /// Depth of an index (root is 0)
    pub fn level(index: usize) -> usize {
        (usize::BITS - 1 - (index + 1).leading_zeros()) as usize
    }

    /// Index `source` would occupy if the tree containing it were grafted with
    /// its root at `dest_root`.
    pub fn relocate(source: usize, dest_root: usize) -> usize {
        match Self::parent(source) {
            None => dest_root,
            Some((parent, branch)) => Self::child(Self::relocate(parent, dest_root), branch),
        }
    }

    pub fn root(&self) -> Option<&PlanTreeNode> {
        self.nodes.get(&Self::ROOT)
    }

    pub fn node(&self, index: usize) -> Option<&PlanTreeNode> {
        self.nodes.get(&index)
    }

    pub fn child_of(&self, parent: usize, branch: bool) -> Option<&PlanTreeNode> {
        self.nodes.get(&Self::child(parent, branch))
    }

    /// Populated node count
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Highest populated index (the capacity a dense array would need, minus one)
    pub fn max_index(&self) -> usize {
        self.nodes.keys().next_back().copied().unwrap_or(Self::ROOT)
    }

    /// Number of levels
    pub fn depth(&self) -> usize {
        self.nodes.keys().map(|&i| Self::level(i) + 1).max().unwrap_or(0)
    }

    /// Populated `(index, node)` pairs in index order
    pub fn nodes(&self) -> impl Iterator<Item = (usize, &PlanTreeNode)> {
        self.nodes.iter().map(|(&i, n)| (i, n))
    }

    /// True while the tree is still the seed: a single node whose first step is a scan
    pub fn is_bare_scan(&self) -> bool {
        self.nodes.len() == 1
            && self
                .root()
                .and_then(|n| n.steps.first())
                .is_some_and(|s| s.action == StepAction::Scan)
    }

    /// Predicates attached to any step, in index order
    pub fn predicates(&self) -> Vec<&Predicate> {
        self.nodes
            .values()
            .flat_map(|n| n.steps.iter().filter_map(|s| s.predicate.as_ref()))
            .collect()
    }

    /// Attach a single node under a populated parent, returning its index
    pub fn append_child(
        &mut self,
        parent: usize,
        branch: bool,
        node: PlanTreeNode,
    ) -> PlanResult<usize> {
        if !self.nodes.contains_key(&parent) {
            return Err(PlanError::MissingParent(parent));
        }
        let index = Self::child(parent, branch);
        self.remove_subtree(index);
        self.nodes.insert(index, node);
        Ok(index)
    }

    /// Graft `child` under this tree's root along `branch`
    pub fn append_child_tree(&mut self, branch: bool, child: &PlanTree) -> PlanResult<()> {
        self.graft(Self::ROOT, branch, child)
    }

    /// Graft the whole of `child` under `parent` along `branch`.
    ///
    /// Any subtree already hanging from that slot is replaced; nodes outside it
    /// are untouched. Each grafted node's index depends only on its own
    /// parent/branch chain inside `child`.
    pub fn graft(&mut self, parent: usize, branch: bool, child: &PlanTree) -> PlanResult<()> {
        if !self.nodes.contains_key(&parent) {
            return Err(PlanError::MissingParent(parent));
        }
        let dest_root = Self::child(parent, branch);
        self.remove_subtree(dest_root);
        for (&source, node) in &child.nodes {
            self.nodes
                .insert(Self::relocate(source, dest_root), node.clone());
        }
        Ok(())
    }

    /// Detach and return the subtree rooted at `index` as a standalone tree
    pub fn subtree(&self, index: usize) -> Option<PlanTree> {
        self.nodes.get(&index)?;
        let nodes = self
            .nodes
            .iter()
            .filter_map(|(&i, n)| Self::rebase(i, index).map(|local| (local, n.clone())))
            .collect();
        Some(PlanTree { nodes })
    }

    /// Index of `index` relative to `root`, if `root` is an ancestor-or-self
    fn rebase(index: usize, root: usize) -> Option<usize> {
        if index == root {
            return Some(Self::ROOT);
        }
        let (parent, branch) = Self::parent(index)?;
        Self::rebase(parent, root).map(|local| Self::child(local, branch))
    }

    fn remove_subtree(&mut self, index: usize) {
        let doomed: Vec<usize> = self
            .nodes
            .keys()
            .copied()
            .filter(|&i| i >= index && Self::rebase(i, index).is_some())
            .collect();
        for i in doomed {
            self.nodes.remove(&i);
        }
    }

    /// Pre-order walk: root, true subtree, false subtree
    pub fn preorder(&self) -> Vec<(usize, &PlanTreeNode)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.preorder_from(Self::ROOT, &mut out);
        out
    }

    fn preorder_from<'a>(&'a self, index: usize, out: &mut Vec<(usize, &'a PlanTreeNode)>) {
        if let Some(node) = self.nodes.get(&index) {
            out.push((index, node));
            self.preorder_from(Self::child(index, true), out);
            self.preorder_from(Self::child(index, false), out);
        }
    }

    /// Open branch slots `(parent, branch)` where evaluation stops
    pub fn terminal_branches(&self) -> Vec<(usize, bool)> {
        self.preorder()
            .into_iter()
            .flat_map(|(i, _)| [(i, true), (i, false)])
            .filter(|&(i, b)| !self.nodes.contains_key(&Self::child(i, b)))
            .collect()
    }

    /// Ancestor chain of `index` as `(node, branch taken)` pairs, root first
    pub fn path_to(index: usize) -> Vec<(usize, bool)> {
        let mut path = Vec::new();
        let mut current = index;
        while let Some((parent, branch)) = Self::parent(current) {
            path.push((parent, branch));
            current = parent;
        }
        path.reverse();
        path
    }

    /// Assignments implied by reaching `branch` of node `index`
    pub fn path_assignments(&self, index: usize, branch: bool) -> Vec<Assignment> {
        Self::path_to(index)
            .into_iter()
            .chain(std::iter::once((index, branch)))
            .filter_map(|(i, b)| {
                self.nodes
                    .get(&i)
                    .and_then(PlanTreeNode::selected_predicate)
                    .map(|p| Assignment::new(p.clone(), b))
            })
            .collect()
    }

    /// Indented dump, one line per node in pre-order
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_from(Self::ROOT, "", &mut out);
        out
    }

    fn render_from(&self, index: usize, prefix: &str, out: &mut String) {
        let Some(node) = self.nodes.get(&index) else {
            return;
        };
        out.push_str(prefix);
        out.push_str(&node.to_string());
        out.push('\n');
        self.render_from(Self::child(index, true), &format!("{prefix}    T "), out);
        self.render_from(Self::child(index, false), &format!("{prefix}    F "), out);
    }
}

impl fmt::Display for PlanTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
