use crate::escape::control_flow_escapes;
use lowjs_ast::*;

fn loop_body(arena: &NodeArena, loop_node: NodeIndex) -> NodeIndex {
    arena
        .data(loop_node)
        .and_then(NodeData::loop_body)
        .expect("loop body")
}

#[test]
fn test_plain_break_escapes() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let brk = b.break_to(None);
    let looping = b.for_ever(vec![brk]);

    assert!(control_flow_escapes(&arena, loop_body(&arena, looping)));
}

#[test]
fn test_body_without_jumps_does_not_escape() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let call = b.call_named("g", vec![]);
    let stmt = b.expr(call);
    let ret = b.ret(None);
    let looping = b.for_ever(vec![stmt, ret]);

    assert!(!control_flow_escapes(&arena, loop_body(&arena, looping)));
}

#[test]
fn test_break_of_nested_breakable_still_escapes() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let x = b.ident("x");
    let leave_switch = b.break_to(None);
    let switch = b.switch(x, vec![(None, vec![leave_switch])]);
    let around_switch = b.for_ever(vec![switch]);
    let brk = b.break_to(None);
    let inner_loop = b.for_ever(vec![brk]);
    let around_loop = b.for_ever(vec![inner_loop]);
    let leave_label = b.break_to(Some("inner"));
    let labelled = b.labelled("inner", vec![leave_label]);
    let around_label = b.for_ever(vec![labelled]);

    assert!(control_flow_escapes(&arena, loop_body(&arena, around_switch)));
    assert!(control_flow_escapes(&arena, loop_body(&arena, around_loop)));
    assert!(control_flow_escapes(&arena, loop_body(&arena, around_label)));
}

#[test]
fn test_continue_of_nested_loop_does_not_escape() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let cont = b.continue_to(None);
    let inner_loop = b.for_ever(vec![cont]);
    let labelled_cont = b.continue_to(Some("inner"));
    let labelled_loop = b.for_ever(vec![labelled_cont]);
    let labelled = b.labelled("inner", vec![labelled_loop]);
    let looping = b.for_ever(vec![inner_loop, labelled]);

    assert!(!control_flow_escapes(&arena, loop_body(&arena, looping)));
}

#[test]
fn test_continue_inside_switch_escapes() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let x = b.ident("x");
    let cont = b.continue_to(None);
    let switch = b.switch(x, vec![(None, vec![cont])]);
    let looping = b.for_ever(vec![switch]);

    assert!(control_flow_escapes(&arena, loop_body(&arena, looping)));
}

#[test]
fn test_labelled_continue_to_outer_loop_escapes_both_loops() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let cont = b.continue_to(Some("outer"));
    let inner = b.for_ever(vec![cont]);
    let outer = b.for_ever(vec![inner]);
    let _labelled = b.labelled("outer", vec![outer]);

    assert!(control_flow_escapes(&arena, loop_body(&arena, inner)));
    assert!(control_flow_escapes(&arena, loop_body(&arena, outer)));
}

#[test]
fn test_jumps_in_nested_functions_are_ignored() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let brk = b.break_to(None);
    let nested_loop = b.for_ever(vec![brk]);
    let cont = b.continue_to(None);
    let nested = b.function(Some("h"), &[], vec![nested_loop, cont]);
    let stmt = b.expr(nested);
    let looping = b.for_ever(vec![stmt]);

    assert!(!control_flow_escapes(&arena, loop_body(&arena, looping)));
}
