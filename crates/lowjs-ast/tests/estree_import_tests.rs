//! ESTree JSON import tests.

use lowjs_ast::estree::{ImportError, ImportOptions, import_program, import_value};
use lowjs_ast::printer::{PrintOptions, Printer};
use lowjs_ast::{FunctionFlags, NodeArena, NodeData, NodeFlags, NodeIndex};
use serde_json::{Value, json};

fn ident(name: &str) -> Value {
    json!({ "type": "Identifier", "name": name })
}

fn num(value: f64) -> Value {
    json!({ "type": "Literal", "value": value })
}

fn expr_stmt(expression: Value) -> Value {
    json!({ "type": "ExpressionStatement", "expression": expression })
}

fn call(callee: &str, args: Vec<Value>) -> Value {
    json!({ "type": "CallExpression", "callee": ident(callee), "arguments": args })
}

fn block(body: Vec<Value>) -> Value {
    json!({ "type": "BlockStatement", "body": body })
}

fn function_declaration(name: &str, body: Vec<Value>) -> Value {
    json!({
        "type": "FunctionDeclaration",
        "id": ident(name),
        "params": [],
        "body": block(body),
    })
}

fn program(body: Vec<Value>) -> Value {
    json!({ "type": "Program", "body": body })
}

fn import(value: &Value) -> (NodeArena, NodeIndex) {
    import_value(value, &ImportOptions::default()).expect("import should succeed")
}

fn print(arena: &NodeArena, root: NodeIndex) -> String {
    Printer::print_to_string(arena, root, PrintOptions::default())
}

#[test]
fn test_import_expression_program() {
    let source = program(vec![expr_stmt(json!({
        "type": "AssignmentExpression",
        "operator": "=",
        "left": ident("x"),
        "right": {
            "type": "BinaryExpression",
            "operator": "+",
            "left": num(1.0),
            "right": num(2.0),
        },
    }))]);
    let (arena, root) = import(&source);

    let func = arena.function(root).expect("program function");
    assert!(func.flags.contains(FunctionFlags::IS_PROGRAM));
    assert!(!func.flags.contains(FunctionFlags::HAS_DECLARED_FUNCTIONS));
    assert_eq!(print(&arena, root), "x = 1 + 2;\n");
}

#[test]
fn test_import_hoists_function_declarations() {
    let source = program(vec![
        expr_stmt(call("f", vec![])),
        function_declaration("f", vec![]),
        function_declaration("g", vec![]),
    ]);
    let (arena, root) = import(&source);

    let func = arena.function(root).expect("program function");
    assert!(func.flags.contains(FunctionFlags::HAS_DECLARED_FUNCTIONS));
    let statements = arena.statements(func.body);
    assert_eq!(statements.len(), 3);
    assert!(arena.has_flag(statements[0], NodeFlags::IS_FUNCTION_DECLARATION));
    assert!(!arena.has_flag(statements[0], NodeFlags::IS_LAST_FUNCTION_DECLARATION));
    assert!(arena.has_flag(statements[1], NodeFlags::IS_LAST_FUNCTION_DECLARATION));
    assert_eq!(
        print(&arena, root),
        "function f() { }\nfunction g() { }\nf();\n"
    );
}

#[test]
fn test_use_strict_is_inherited() {
    let source = program(vec![
        json!({
            "type": "ExpressionStatement",
            "expression": { "type": "Literal", "value": "use strict" },
            "directive": "use strict",
        }),
        function_declaration("f", vec![]),
    ]);
    let (arena, root) = import(&source);

    let func = arena.function(root).expect("program function");
    assert!(func.is_strict());
    let Some(NodeData::Var(var)) = arena.data(arena.statements(func.body)[0]) else {
        panic!("expected hoisted declaration first");
    };
    let nested = arena.function(var.init.expect("initializer")).expect("function");
    assert!(nested.is_strict());
}

#[test]
fn test_for_var_is_hoisted_before_loop() {
    let source = program(vec![json!({
        "type": "ForStatement",
        "init": {
            "type": "VariableDeclaration",
            "kind": "var",
            "declarations": [{ "type": "VariableDeclarator", "id": ident("i"), "init": num(0.0) }],
        },
        "test": { "type": "BinaryExpression", "operator": "<", "left": ident("i"), "right": ident("n") },
        "update": { "type": "UpdateExpression", "operator": "++", "prefix": false, "argument": ident("i") },
        "body": block(vec![expr_stmt(call("f", vec![ident("i")]))]),
    })]);
    let (arena, root) = import(&source);

    assert_eq!(
        print(&arena, root),
        "var i = 0;\nfor (; i < n; i++) {\n    f(i);\n}\n"
    );
}

#[test]
fn test_legacy_guarded_handlers() {
    let source = program(vec![json!({
        "type": "TryStatement",
        "block": block(vec![expr_stmt(call("f", vec![]))]),
        "guardedHandlers": [{
            "type": "CatchClause",
            "param": ident("e"),
            "guard": { "type": "BinaryExpression", "operator": "instanceof", "left": ident("e"), "right": ident("TypeError") },
            "body": block(vec![]),
        }],
        "handlers": [{ "type": "CatchClause", "param": ident("e"), "body": block(vec![]) }],
        "finalizer": null,
    })]);
    let (arena, root) = import(&source);

    assert_eq!(
        print(&arena, root),
        "try {\n    f();\n} catch (e if e instanceof TypeError) { } catch (e) { }\n"
    );
}

#[test]
fn test_sequence_folds_to_comma() {
    let source = program(vec![expr_stmt(json!({
        "type": "SequenceExpression",
        "expressions": [call("a", vec![]), call("b", vec![]), call("c", vec![])],
    }))]);
    let (arena, root) = import(&source);
    assert_eq!(print(&arena, root), "a(), b(), c();\n");
}

#[test]
fn test_spans_and_lines_are_read() {
    let source = program(vec![json!({
        "type": "ExpressionStatement",
        "start": 4,
        "end": 9,
        "loc": { "start": { "line": 2, "column": 0 }, "end": { "line": 2, "column": 5 } },
        "expression": ident("x"),
    })]);
    let (arena, root) = import(&source);
    let func = arena.function(root).expect("program function");
    let stmt = arena.statements(func.body)[0];
    let span = arena.span(stmt);
    assert_eq!((span.start, span.end, span.line), (4, 9, 2));
}

#[test]
fn test_lazy_functions_option() {
    let source = program(vec![function_declaration("f", vec![])]);
    let options = ImportOptions {
        lazy_functions: true,
        ..ImportOptions::default()
    };
    let (arena, root) = import_value(&source, &options).expect("import");
    let func = arena.function(root).expect("program function");
    assert!(!func.is_lazy(), "the program itself is never lazy");
    let Some(NodeData::Var(var)) = arena.data(arena.statements(func.body)[0]) else {
        panic!("expected declaration");
    };
    assert!(arena.function(var.init.expect("init")).expect("function").is_lazy());
}

#[test]
fn test_let_declarations_are_rejected() {
    let source = program(vec![json!({
        "type": "VariableDeclaration",
        "kind": "let",
        "declarations": [{ "type": "VariableDeclarator", "id": ident("x"), "init": null }],
    })]);
    let err = import_value(&source, &ImportOptions::default()).expect_err("let is unsupported");
    assert!(matches!(err, ImportError::Unsupported { .. }), "{err}");
}

#[test]
fn test_unknown_node_type_is_rejected() {
    let source = program(vec![json!({ "type": "ClassDeclaration", "id": ident("A") })]);
    let err = import_value(&source, &ImportOptions::default()).expect_err("classes are unsupported");
    match err {
        ImportError::UnsupportedNode { node_type, .. } => assert_eq!(node_type, "ClassDeclaration"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_field_is_reported() {
    let source = program(vec![json!({ "type": "ThrowStatement" })]);
    let err = import_value(&source, &ImportOptions::default()).expect_err("argument is required");
    assert!(
        matches!(err, ImportError::MissingField { field: "argument", .. }),
        "{err}"
    );
}

#[test]
fn test_malformed_json_is_reported() {
    let err = import_program("{ not json", &ImportOptions::default()).expect_err("bad json");
    assert!(matches!(err, ImportError::Json(_)));
}

#[test]
fn test_regex_literals_are_rejected() {
    let source = program(vec![expr_stmt(json!({
        "type": "Literal",
        "value": {},
        "regex": { "pattern": "a", "flags": "" },
    }))]);
    let err = import_value(&source, &ImportOptions::default()).expect_err("regex unsupported");
    assert!(matches!(err, ImportError::Unsupported { .. }));
}
