use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use retree::{engine, table};
use std::time::Duration;

/// DFA が n とともに大きくなる `a?^n a^n`。
fn nested_optional(n: usize) -> String {
    format!("{}{}", "a?".repeat(n), "a".repeat(n))
}

fn automata(c: &mut Criterion) {
    let mut group = c.benchmark_group("Automata");
    group.measurement_time(Duration::from_secs(5));

    for n in [4, 8, 16] {
        let expr = nested_optional(n);

        group.bench_with_input(BenchmarkId::new("nfa", n), &expr, |b, expr| {
            b.iter(|| engine::to_nfa(black_box(expr)))
        });

        group.bench_with_input(BenchmarkId::new("dfa+minimize", n), &expr, |b, expr| {
            b.iter(|| {
                if let Ok(mut dfa) = engine::to_dfa(black_box(expr)) {
                    dfa.minimize();
                }
            })
        });
    }

    group.finish();
}

fn rendering(c: &mut Criterion) {
    let nfa = engine::to_nfa("(a|b)*abb(c|d)+").ok();
    c.bench_function("render nfa table", |b| {
        b.iter(|| nfa.as_ref().map(|nfa| table::nfa_table(nfa).to_string()))
    });

    c.bench_function("optimize", |b| {
        b.iter(|| engine::optimize(black_box("/[a-zA-Z_0-9]{1,}(?:x|y|z)aa*/")))
    });
}

criterion_group!(benches, automata, rendering);
criterion_main!(benches);
