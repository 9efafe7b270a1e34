use crate::*;
use lowjs_ast::printer::{PrintOptions, Printer};
use lowjs_ast::*;

fn print(arena: &NodeArena, root: NodeIndex) -> String {
    Printer::print_to_string(arena, root, PrintOptions::default())
}

fn lower(arena: &mut NodeArena, root: NodeIndex) -> NodeIndex {
    lower_program(arena, root, &LoweringOptions::default()).expect("lowering should succeed")
}

/// Build `function f() { <body> }` and lower it.
fn lowered_function(build: impl FnOnce(&mut AstBuilder<'_>) -> Vec<NodeIndex>) -> (NodeArena, NodeIndex) {
    let mut arena = NodeArena::new();
    let root = {
        let mut b = AstBuilder::new(&mut arena);
        let body = build(&mut b);
        b.function(Some("f"), &[], body)
    };
    let lowered = lower(&mut arena, root);
    (arena, lowered)
}

fn body_statements(arena: &NodeArena, function: NodeIndex) -> Vec<NodeIndex> {
    let func = arena.function(function).expect("function");
    arena.statements(func.body).to_vec()
}

/// The call inside `:return = call(...)`.
fn stored_call(arena: &NodeArena, stmt: NodeIndex) -> NodeIndex {
    let Some(NodeData::ExpressionStatement(stmt)) = arena.data(stmt) else {
        panic!("expected an expression statement");
    };
    let Some(NodeData::Binary(assign)) = arena.data(stmt.expression) else {
        panic!("expected an assignment");
    };
    assign.rhs
}

fn collect_nodes(arena: &NodeArena, idx: NodeIndex, out: &mut Vec<NodeIndex>) {
    out.push(idx);
    if let Some(data) = arena.data(idx) {
        for child in data.children() {
            collect_nodes(arena, child, out);
        }
    }
}

#[test]
fn test_program_result_is_stored_in_return_placeholder() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let one = b.num(1.0);
    let other = b.num(1.0);
    let sum = b.binary(BinaryOp::Add, one, other);
    let stmt = b.expr(sum);
    let program = b.program(vec![stmt]);

    let lowered = lower(&mut arena, program);

    assert_eq!(
        print(&arena, lowered),
        ":return = undefined;\n:return = 1 + 1;\nreturn :return;\n"
    );
    let func = arena.function(lowered).expect("program");
    assert!(func.state.contains(CompilationStates::LOWERED));
    assert!(arena.has_flag(func.body, NodeFlags::TERMINAL));
}

#[test]
fn test_existing_result_assignment_is_not_wrapped() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let x = b.ident("x");
    let assign = b.assign(":return", x);
    let stmt = b.expr(assign);
    let program = b.program(vec![stmt]);

    let lowered = lower(&mut arena, program);

    assert_eq!(
        print(&arena, lowered),
        ":return = undefined;\n:return = x;\nreturn :return;\n"
    );
}

#[test]
fn test_last_function_declaration_is_the_completion_value() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let call = b.call_named("f", vec![]);
    let stmt = b.expr(call);
    let decl = b.function_declaration("f", &[], vec![]);
    let program = b.program(vec![stmt, decl]);

    let lowered = lower(&mut arena, program);

    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    return undefined;\n}\n:return = f;\n:return = f();\nreturn :return;\n"
    );
    let statements = body_statements(&arena, lowered);
    let Some(NodeData::Var(var)) = arena.data(statements[0]) else {
        panic!("expected the declaration first");
    };
    let nested = arena.function(var.init.expect("init")).expect("function");
    assert!(nested.state.contains(CompilationStates::LOWERED));
}

#[test]
fn test_function_body_ends_with_synthetic_return() {
    let (arena, lowered) = lowered_function(|b| {
        let call = b.call_named("g", vec![]);
        vec![b.expr(call)]
    });

    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    g();\n    return undefined;\n}\n"
    );
    let func = arena.function(lowered).expect("function");
    assert!(arena.has_flag(func.body, NodeFlags::TERMINAL));
}

#[test]
fn test_dead_code_after_return_is_dropped_but_vars_survive() {
    let (arena, lowered) = lowered_function(|b| {
        let one = b.num(1.0);
        let ret = b.ret(Some(one));
        let call = b.call_named("g", vec![]);
        let dead = b.expr(call);
        let two = b.num(2.0);
        let var = b.var("y", Some(two));
        vec![ret, dead, var]
    });

    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    return 1;\n    var y;\n}\n"
    );
}

#[test]
fn test_dead_code_after_break_is_dropped() {
    let (arena, lowered) = lowered_function(|b| {
        let brk = b.break_to(None);
        let call = b.call_named("g", vec![]);
        let dead = b.expr(call);
        let test = b.ident("c");
        vec![b.while_loop(Some(test), vec![brk, dead])]
    });

    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    while (c) {\n        break;\n    }\n    return undefined;\n}\n"
    );
}

#[test]
fn test_empty_statements_are_dropped() {
    let (arena, lowered) = lowered_function(|b| {
        let empty = b.empty();
        let x = b.ident("x");
        let stmt = b.expr(x);
        vec![empty, stmt]
    });

    assert_eq!(body_statements(&arena, lowered).len(), 2);
    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    x;\n    return undefined;\n}\n"
    );
}

#[test]
fn test_while_true_becomes_for_with_same_label() {
    let mut arena = NodeArena::new();
    let (root, original_label) = {
        let mut b = AstBuilder::new(&mut arena);
        let brk = b.break_to(None);
        let yes = b.boolean(true);
        let while_loop = b.while_loop(Some(yes), vec![brk]);
        let label = b.arena().data(while_loop).and_then(NodeData::jump_label);
        (b.function(Some("f"), &[], vec![while_loop]), label)
    };

    let lowered = lower(&mut arena, root);

    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    for (;;) {\n        break;\n    }\n    return undefined;\n}\n"
    );
    let for_node = body_statements(&arena, lowered)[0];
    let data = arena.data(for_node).expect("loop");
    assert!(matches!(data, NodeData::For(for_data) if for_data.kind == ForKind::For));
    assert_eq!(data.jump_label(), original_label);
    assert!(arena.has_flag(for_node, NodeFlags::CONTROL_FLOW_ESCAPES));
}

#[test]
fn test_break_out_of_nested_switch_keeps_code_after_infinite_loop() {
    let (arena, lowered) = lowered_function(|b| {
        let x = b.ident("x");
        let brk = b.break_to(None);
        let switch = b.switch(x, vec![(None, vec![brk])]);
        let looping = b.for_ever(vec![switch]);
        let call = b.call_named("g", vec![]);
        let after = b.expr(call);
        vec![looping, after]
    });

    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    for (;;) {\n        switch (x) {\n        default:\n            break;\n        }\n    }\n    g();\n    return undefined;\n}\n"
    );
    let for_node = body_statements(&arena, lowered)[0];
    assert!(arena.has_flag(for_node, NodeFlags::CONTROL_FLOW_ESCAPES));
    assert!(!arena.has_flag(for_node, NodeFlags::TERMINAL));
}

#[test]
fn test_do_while_true_becomes_for() {
    let (arena, lowered) = lowered_function(|b| {
        let call = b.call_named("g", vec![]);
        let stmt = b.expr(call);
        vec![b.do_while(vec![stmt], None)]
    });

    // Entered, no test, nothing escapes: the loop never completes.
    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    for (;;) {\n        g();\n    }\n}\n"
    );
}

#[test]
fn test_for_with_literal_true_test_loses_it() {
    let (arena, lowered) = lowered_function(|b| {
        let yes = b.boolean(true);
        let call = b.call_named("g", vec![]);
        let stmt = b.expr(call);
        let after = b.call_named("h", vec![]);
        let after = b.expr(after);
        vec![b.for_loop(None, Some(yes), None, vec![stmt]), after]
    });

    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    for (;;) {\n        g();\n    }\n}\n"
    );
}

#[test]
fn test_for_in_keeps_its_shape() {
    let (arena, lowered) = lowered_function(|b| {
        let object = b.ident("o");
        let call = b.call_named("g", vec![]);
        let stmt = b.expr(call);
        vec![b.for_in("k", object, vec![stmt])]
    });

    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    for (k in o) {\n        g();\n    }\n    return undefined;\n}\n"
    );
}

#[test]
fn test_delete_of_non_reference_is_evaluated_then_true() {
    let (arena, lowered) = lowered_function(|b| {
        let x = b.ident("x");
        let keep = b.unary(UnaryOp::Delete, x);
        let keep = b.expr(keep);
        let call = b.call_named("g", vec![]);
        let hoist = b.unary(UnaryOp::Delete, call);
        let hoist = b.expr(hoist);
        vec![keep, hoist]
    });

    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    delete x;\n    g();\n    true;\n    return undefined;\n}\n"
    );
}

#[test]
fn test_call_targets_are_marked() {
    let (arena, lowered) = lowered_function(|b| {
        let a = b.ident("a");
        let member = b.access(a, "b");
        let method_call = b.call(member, vec![]);
        let method_call = b.expr(method_call);
        let inner = b.function(None, &[], vec![]);
        let iife = b.call(inner, vec![]);
        let iife = b.expr(iife);
        vec![method_call, iife]
    });

    let statements = body_statements(&arena, lowered);
    let callee_of = |stmt: NodeIndex| {
        let Some(NodeData::ExpressionStatement(stmt)) = arena.data(stmt) else {
            panic!("expected expression statement");
        };
        let Some(NodeData::Call(call)) = arena.data(stmt.expression) else {
            panic!("expected call");
        };
        call.callee
    };
    assert!(arena.has_flag(callee_of(statements[0]), NodeFlags::IS_FUNCTION));
    assert!(!arena.has_flag(callee_of(statements[1]), NodeFlags::IS_FUNCTION));
    let inner = arena.function(callee_of(statements[1])).expect("function");
    assert!(inner.state.contains(CompilationStates::LOWERED));
}

#[test]
fn test_eval_gets_an_independent_copy_of_its_code() {
    let mut arena = NodeArena::new();
    let program = {
        let mut b = AstBuilder::new(&mut arena);
        b.at_line(3);
        let call = b.call_named("g", vec![]);
        let stmt = b.expr(call);
        let looping = b.for_ever(vec![stmt]);
        let code = b.function(None, &[], vec![looping]);
        let eval = b.call_named("eval", vec![code]);
        let stmt = b.expr(eval);
        b.program(vec![stmt])
    };
    let options = LoweringOptions::default().with_source_name("a.js");

    let lowered = lower_program(&mut arena, program, &options).expect("lowering should succeed");

    let statements = body_statements(&arena, lowered);
    let call = stored_call(&arena, statements[1]);
    let Some(NodeData::Call(call)) = arena.data(call) else {
        panic!("expected the eval call");
    };
    assert!(arena.has_flag(call.callee, NodeFlags::IS_FUNCTION));
    let eval = call.eval_args.as_ref().expect("eval args");
    assert_eq!(eval.location, "a.js#3<eval>");
    assert!(!eval.strict);
    assert_eq!(arena.ident_name(eval.this), Some("this"));

    let mut original = Vec::new();
    collect_nodes(&arena, call.args[0], &mut original);
    let mut copy = Vec::new();
    collect_nodes(&arena, eval.code, &mut copy);
    assert_eq!(original.len(), copy.len());
    assert!(copy.iter().all(|node| !original.contains(node)), "copy shares nodes");

    let labels = |nodes: &[NodeIndex]| -> Vec<JumpLabel> {
        nodes
            .iter()
            .filter_map(|&node| arena.data(node).and_then(NodeData::jump_label))
            .collect()
    };
    let original_labels = labels(&original);
    assert!(!original_labels.is_empty());
    assert!(labels(&copy).iter().all(|label| !original_labels.contains(label)));
}

#[test]
fn test_eval_in_strict_code_is_strict() {
    let mut arena = NodeArena::new();
    let program = {
        let mut b = AstBuilder::new(&mut arena);
        let src = b.ident("src");
        let eval = b.call_named("eval", vec![src]);
        let stmt = b.expr(eval);
        b.program_with_flags(vec![stmt], FunctionFlags::IS_STRICT)
    };

    let lowered = lower(&mut arena, program);

    let call = stored_call(&arena, body_statements(&arena, lowered)[1]);
    let Some(NodeData::Call(call)) = arena.data(call) else {
        panic!("expected the eval call");
    };
    let eval = call.eval_args.as_ref().expect("eval args");
    assert!(eval.strict);
    assert_eq!(eval.location, "<script>#1<eval>");
}

#[test]
fn test_eval_without_arguments_is_left_alone() {
    let (arena, lowered) = lowered_function(|b| {
        let eval = b.call_named("eval", vec![]);
        vec![b.expr(eval)]
    });

    let Some(NodeData::ExpressionStatement(stmt)) = arena.data(body_statements(&arena, lowered)[0]) else {
        panic!("expected expression statement");
    };
    let Some(NodeData::Call(call)) = arena.data(stmt.expression) else {
        panic!("expected call");
    };
    assert!(call.eval_args.is_none());
}

#[test]
fn test_lazy_functions_are_not_entered() {
    let mut arena = NodeArena::new();
    let (program, lazy) = {
        let mut b = AstBuilder::new(&mut arena);
        let call = b.call_named("g", vec![]);
        let stmt = b.expr(call);
        let lazy = b.function(Some("later"), &[], vec![stmt]);
        let lazy = b.arena().update(lazy, |_, data| {
            if let NodeData::Function(func) = data {
                func.flags.insert(FunctionFlags::IS_LAZY);
            }
        });
        let stmt = b.expr(lazy);
        (b.program(vec![stmt]), lazy)
    };

    let lowered = lower(&mut arena, program);

    let stored = stored_call(&arena, body_statements(&arena, lowered)[1]);
    assert_eq!(stored, lazy, "lazy function must be left untouched");
    let func = arena.function(lazy).expect("function");
    assert!(!func.state.contains(CompilationStates::LOWERED));
    assert_eq!(arena.statements(func.body).len(), 1);
}

#[test]
fn test_switch_inside_label() {
    let (arena, lowered) = lowered_function(|b| {
        let x = b.ident("x");
        let one = b.num(1.0);
        let brk = b.break_to(Some("L"));
        let call = b.call_named("g", vec![]);
        let stmt = b.expr(call);
        let switch = b.switch(x, vec![(Some(one), vec![brk]), (None, vec![stmt])]);
        vec![b.labelled("L", vec![switch])]
    });

    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    L: {\n        switch (x) {\n        case 1:\n            break L;\n        default:\n            g();\n        }\n    }\n    return undefined;\n}\n"
    );
}

#[test]
fn test_try_without_finally_is_kept() {
    let (arena, lowered) = lowered_function(|b| {
        let call = b.call_named("g", vec![]);
        let stmt = b.expr(call);
        let e = b.ident("e");
        let handler = b.throw(e);
        vec![b.try_catch_finally(vec![stmt], vec![("e", vec![handler])], None)]
    });

    assert_eq!(
        print(&arena, lowered),
        "function f() {\n    try {\n        g();\n    } catch (e) {\n        throw e;\n    }\n    return undefined;\n}\n"
    );
}

#[test]
fn test_recursion_limit_is_an_error() {
    let mut arena = NodeArena::new();
    let program = {
        let mut b = AstBuilder::new(&mut arena);
        let mut expression = b.ident("x");
        for _ in 0..10 {
            expression = b.unary(UnaryOp::Neg, expression);
        }
        let stmt = b.expr(expression);
        b.program(vec![stmt])
    };
    let options = LoweringOptions {
        max_depth: 4,
        ..LoweringOptions::default()
    };

    let err = lower_program(&mut arena, program, &options).expect_err("too deep");
    assert_eq!(err, LoweringError::RecursionLimit { depth: 4 });
}

#[test]
fn test_root_must_be_a_function() {
    let mut arena = NodeArena::new();
    let x = arena.ident(lowjs_common::Span::SYNTHETIC, "x");

    let err = lower_program(&mut arena, x, &LoweringOptions::default()).expect_err("not a function");
    assert!(matches!(err, LoweringError::InvariantViolation { .. }), "{err}");
}

#[test]
fn test_lowering_twice_is_a_no_op() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let x = b.ident("x");
    let stmt = b.expr(x);
    let program = b.program(vec![stmt]);

    let once = lower(&mut arena, program);
    let twice = lower(&mut arena, once);
    assert_eq!(once, twice);
}
