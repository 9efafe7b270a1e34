//! Lowering pass benchmarks.
//!
//! Nested `try`/`finally` is the expensive case: every level copies its
//! finally code in front of each exit of the levels inside it.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use lowjs_ast::{AstBuilder, NodeArena, NodeIndex};
use lowjs_lowering::{LoweringOptions, lower_program};

/// `for (;;) { try { ... if (c) break; return n; } finally { cleanup(); } }`
/// nested `depth` times inside a single function.
fn nested_try_finally(depth: usize) -> (NodeArena, NodeIndex) {
    let mut arena = NodeArena::new();
    let root = {
        let mut b = AstBuilder::new(&mut arena);
        let call = b.call_named("work", vec![]);
        let mut body = vec![b.expr(call)];
        for level in 0..depth {
            let c = b.ident("c");
            let brk = b.break_to(None);
            let guard = b.if_else(c, vec![brk], None);
            let value = b.num(level as f64);
            let ret = b.ret(Some(value));
            body.push(guard);
            body.push(ret);
            let cleanup = b.call_named("cleanup", vec![]);
            let cleanup = b.expr(cleanup);
            let guarded = b.try_finally(body, vec![cleanup]);
            body = vec![b.for_ever(vec![guarded])];
        }
        b.function(Some("f"), &[], body)
    };
    (arena, root)
}

/// A flat program of plain statements, the common case.
fn straight_line(statements: usize) -> (NodeArena, NodeIndex) {
    let mut arena = NodeArena::new();
    let root = {
        let mut b = AstBuilder::new(&mut arena);
        let body = (0..statements)
            .map(|i| {
                let value = b.num(i as f64);
                let assign = b.assign("x", value);
                b.expr(assign)
            })
            .collect();
        b.program(body)
    };
    (arena, root)
}

fn bench_nested_try_finally(c: &mut Criterion) {
    let mut group = c.benchmark_group("lowering_try_finally");
    let options = LoweringOptions::default();

    for depth in [1, 2, 4, 6] {
        group.bench_with_input(BenchmarkId::new("nested", depth), &depth, |b, &depth| {
            b.iter_batched(
                || nested_try_finally(depth),
                |(mut arena, root)| {
                    let lowered = lower_program(&mut arena, root, &options);
                    black_box(lowered.is_ok());
                    arena
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_straight_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("lowering_straight_line");
    let options = LoweringOptions::default();

    for statements in [100, 1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("statements", statements),
            &statements,
            |b, &statements| {
                b.iter_batched(
                    || straight_line(statements),
                    |(mut arena, root)| {
                        let lowered = lower_program(&mut arena, root, &options);
                        black_box(lowered.is_ok());
                        arena
                    },
                    criterion::BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_nested_try_finally, bench_straight_line);
criterion_main!(benches);
