//! Addressing and grafting properties of heap-indexed plan trees.

use proptest::prelude::*;

use tdplan::{ComparisonOp, PlanTree, PlanTreeNode, Predicate};

/// Node whose select literal records the index it was created at
fn tagged(tag: usize) -> PlanTreeNode {
    PlanTreeNode::map_select(
        vec![format!("col{tag}")],
        Predicate::new(format!("col{tag}"), ComparisonOp::Equal, tag.to_string()),
    )
}

fn tag_of(node: &PlanTreeNode) -> usize {
    node.selected_predicate().unwrap().literal().parse().unwrap()
}

/// Tree containing every node on the given root-to-node paths
fn build(paths: &[Vec<bool>]) -> PlanTree {
    let mut tree = PlanTree::from_root(tagged(PlanTree::ROOT));
    for path in paths {
        let mut index = PlanTree::ROOT;
        for &branch in path {
            let child = PlanTree::child(index, branch);
            if tree.node(child).is_none() {
                tree.append_child(index, branch, tagged(child)).unwrap();
            }
            index = child;
        }
    }
    tree
}

fn path_sets() -> impl Strategy<Value = Vec<Vec<bool>>> {
    prop::collection::vec(prop::collection::vec(any::<bool>(), 0..5), 0..6)
}

#[test]
fn test_heap_layout() {
    assert_eq!(PlanTree::child(0, false), 1);
    assert_eq!(PlanTree::child(0, true), 2);
    assert_eq!(PlanTree::child(2, false), 5);
    assert_eq!(PlanTree::child(2, true), 6);
    assert_eq!(PlanTree::parent(0), None);
    assert_eq!(PlanTree::parent(5), Some((2, false)));
    assert_eq!(PlanTree::parent(6), Some((2, true)));
}

#[test]
fn test_append_child_tree_under_root() {
    let mut base = PlanTree::seed();
    let child = build(&[vec![true], vec![false, true]]);
    base.append_child_tree(false, &child).unwrap();

    // child root 0 -> 1, child 2 -> 4, child 1 -> 3, child 4 -> 8
    assert_eq!(base.len(), 5);
    assert_eq!(tag_of(base.node(1).unwrap()), 0);
    assert_eq!(tag_of(base.node(4).unwrap()), 2);
    assert_eq!(tag_of(base.node(3).unwrap()), 1);
    assert_eq!(tag_of(base.node(8).unwrap()), 4);
    assert!(!base.is_bare_scan());
}

#[test]
fn test_graft_input_trees_unchanged() {
    let mut base = build(&[vec![true]]);
    let child = build(&[vec![false]]);
    let child_before = child.clone();
    base.graft(2, true, &child).unwrap();
    assert_eq!(child, child_before);
    assert_eq!(base.len(), 4);
}

#[test]
fn test_deep_indices_stay_sparse() {
    let path = vec![true; 20];
    let tree = build(&[path]);
    assert_eq!(tree.len(), 21);
    assert_eq!(tree.depth(), 21);
    assert_eq!(tree.max_index(), (1usize << 21) - 2);
}

#[test]
fn test_render_format() {
    let mut tree = PlanTree::from_root(PlanTreeNode::map_select(
        vec!["r".to_string()],
        Predicate::new("r", ComparisonOp::GreaterThan, "0"),
    ));
    tree.append_child(
        PlanTree::ROOT,
        false,
        PlanTreeNode::map_select(
            vec!["c".to_string()],
            Predicate::new("c", ComparisonOp::GreaterThan, "0"),
        ),
    )
    .unwrap();
    tree.append_child(
        1,
        true,
        PlanTreeNode::map_select(Vec::new(), Predicate::new("l", ComparisonOp::GreaterThan, "0")),
    )
    .unwrap();

    assert_eq!(
        tree.render(),
        "map (r),select (r > 0)\n    F map (c),select (c > 0)\n    F     T map (),select (l > 0)\n"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every populated non-root node has a populated parent reached by its branch
    #[test]
    fn prop_parent_child_inverse(paths in path_sets()) {
        let tree = build(&paths);
        for (index, _) in tree.nodes() {
            if let Some((parent, branch)) = PlanTree::parent(index) {
                prop_assert_eq!(PlanTree::child(parent, branch), index);
                prop_assert!(tree.node(parent).is_some());
            }
        }
    }

    /// Grafted nodes land at the composed index; nodes outside the slot keep theirs
    #[test]
    fn prop_graft_relocates(
        base_paths in path_sets(),
        child_paths in path_sets(),
        branch in any::<bool>(),
        pick in any::<prop::sample::Index>(),
    ) {
        let base = build(&base_paths);
        let child = build(&child_paths);
        let populated: Vec<usize> = base.nodes().map(|(i, _)| i).collect();
        let parent = populated[pick.index(populated.len())];
        let dest_root = PlanTree::child(parent, branch);

        let mut merged = base.clone();
        merged.graft(parent, branch, &child).unwrap();

        for (source, node) in child.nodes() {
            let landed = merged.node(PlanTree::relocate(source, dest_root));
            prop_assert_eq!(landed, Some(node));
        }

        let replaced = |i: usize| {
            let mut cur = i;
            loop {
                if cur == dest_root {
                    return true;
                }
                match PlanTree::parent(cur) {
                    Some((p, _)) => cur = p,
                    None => return false,
                }
            }
        };
        for (index, node) in base.nodes() {
            if !replaced(index) {
                prop_assert_eq!(merged.node(index), Some(node));
            }
        }
        let kept = base.nodes().filter(|(i, _)| !replaced(*i)).count();
        prop_assert_eq!(merged.len(), kept + child.len());
    }

    /// Pre-order visits every node once, root first
    #[test]
    fn prop_preorder_covers_tree(paths in path_sets()) {
        let tree = build(&paths);
        let order = tree.preorder();
        prop_assert_eq!(order.len(), tree.len());
        prop_assert_eq!(order[0].0, PlanTree::ROOT);
    }

    /// A tree with n nodes has n + 1 open branch slots
    #[test]
    fn prop_terminal_branch_count(paths in path_sets()) {
        let tree = build(&paths);
        prop_assert_eq!(tree.terminal_branches().len(), tree.len() + 1);
    }
}
