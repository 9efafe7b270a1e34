use crate::*;
use rustc_hash::FxHashSet;

fn collect(arena: &NodeArena, root: NodeIndex, nodes: &mut Vec<NodeIndex>) {
    nodes.push(root);
    if let Some(data) = arena.data(root) {
        for child in data.children() {
            collect(arena, child, nodes);
        }
    }
}

fn labels(arena: &NodeArena, nodes: &[NodeIndex]) -> FxHashSet<JumpLabel> {
    nodes
        .iter()
        .filter_map(|&idx| arena.data(idx).and_then(NodeData::jump_label))
        .collect()
}

#[test]
fn test_duplicate_shares_no_nodes_or_labels() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let brk = b.break_to(Some("l"));
    let inner = b.for_ever(vec![brk]);
    let labelled = b.labelled("l", vec![inner]);
    let f = b.call_named("f", vec![]);
    let stmt = b.expr(f);
    let root = b.block(vec![labelled, stmt]);

    let copy = arena.duplicate_with_unique_labels(root);

    let mut original_nodes = Vec::new();
    collect(&arena, root, &mut original_nodes);
    let mut copied_nodes = Vec::new();
    collect(&arena, copy, &mut copied_nodes);

    assert_eq!(original_nodes.len(), copied_nodes.len());
    let original_set: FxHashSet<_> = original_nodes.iter().copied().collect();
    assert!(copied_nodes.iter().all(|idx| !original_set.contains(idx)));

    let original_labels = labels(&arena, &original_nodes);
    let copied_labels = labels(&arena, &copied_nodes);
    assert_eq!(original_labels.len(), 5, "three blocks, a label and a loop");
    assert_eq!(copied_labels.len(), 5);
    assert!(original_labels.is_disjoint(&copied_labels));
}

#[test]
fn test_duplicate_preserves_shape_and_flags() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let one = b.num(1.0);
    let ret = b.ret(Some(one));
    let root = b.block(vec![ret]);

    let copy = arena.duplicate_with_unique_labels(root);
    assert!(arena.has_flag(copy, NodeFlags::TERMINAL));
    let printed = |idx| printer::Printer::print_to_string(&arena, idx, printer::PrintOptions::default());
    assert_eq!(printed(copy), printed(root));
}

#[test]
fn test_two_copies_get_distinct_labels() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let brk = b.break_to(None);
    let root = b.for_ever(vec![brk]);

    let first = arena.duplicate_with_unique_labels(root);
    let second = arena.duplicate_with_unique_labels(root);
    let label = |idx| arena.data(idx).and_then(NodeData::jump_label);
    assert_ne!(label(first), label(second));
    assert_ne!(label(first), label(root));
}
