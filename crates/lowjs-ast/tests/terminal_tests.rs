use crate::*;

#[test]
fn test_return_and_throw_are_terminal() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let ret = b.ret(None);
    let e = b.ident("e");
    let throw = b.throw(e);
    let x = b.ident("x");
    let stmt = b.expr(x);

    assert!(arena.is_terminal(ret));
    assert!(arena.is_terminal(throw));
    assert!(!arena.is_terminal(stmt));
}

#[test]
fn test_if_needs_both_branches_terminal() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let c = b.ident("c");
    let r1 = b.ret(None);
    let only_pass = b.if_else(c, vec![r1], None);
    let c = b.ident("c");
    let r2 = b.ret(None);
    let r3 = b.ret(None);
    let both = b.if_else(c, vec![r2], Some(vec![r3]));

    assert!(!arena.is_terminal(only_pass));
    assert!(arena.is_terminal(both));
}

#[test]
fn test_jumps_have_terminal_flags_but_are_not_terminal() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let brk = b.break_to(None);
    let cont = b.continue_to(Some("outer"));

    assert!(!arena.is_terminal(brk));
    assert!(arena.has_goto(brk));
    assert!(arena.has_terminal_flags(brk));
    assert!(arena.has_terminal_flags(cont));
}

#[test]
fn test_loop_termination() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let x = b.ident("x");
    let stmt = b.expr(x);
    let forever = b.for_ever(vec![stmt]);
    let c = b.ident("c");
    let x = b.ident("x");
    let stmt = b.expr(x);
    let tested = b.while_loop(Some(c), vec![stmt]);
    let c = b.ident("c");
    let r = b.ret(None);
    let do_return = b.do_while(vec![r], Some(c));
    let c = b.ident("c");
    let x = b.ident("x");
    let stmt = b.expr(x);
    let do_plain = b.do_while(vec![stmt], Some(c));

    assert!(arena.is_terminal(forever), "for(;;) never falls through");
    assert!(!arena.is_terminal(tested), "a tested while may never be entered");
    assert!(arena.is_terminal(do_return));
    assert!(!arena.is_terminal(do_plain));
}

#[test]
fn test_try_needs_every_catch_terminal() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let r1 = b.ret(None);
    let r2 = b.ret(None);
    let all = b.try_catch_finally(vec![r1], vec![("e", vec![r2])], None);
    let r3 = b.ret(None);
    let x = b.ident("x");
    let stmt = b.expr(x);
    let open_catch = b.try_catch_finally(vec![r3], vec![("e", vec![stmt])], None);

    assert!(arena.is_terminal(all));
    assert!(!arena.is_terminal(open_catch));
}

#[test]
fn test_always_true_is_conservative() {
    let mut arena = NodeArena::new();
    let mut b = AstBuilder::new(&mut arena);
    let yes = b.boolean(true);
    let no = b.boolean(false);
    let one = b.num(1.0);

    assert!(arena.is_always_true(None));
    assert!(arena.is_always_true(Some(yes)));
    assert!(!arena.is_always_true(Some(no)));
    assert!(!arena.is_always_true(Some(one)), "truthy numbers are not folded");
}
