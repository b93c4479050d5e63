//! Plan search benchmarks: growth in distinct predicates, memo on/off.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::time::Duration;
use tdplan::parser::parse_expression;
use tdplan::{BooleanExp, Executor, NormalForm, StepCost, Table, TopDownSearch};

/// `n` predicates split into pairs: (p0 AND p1) OR (p2 AND p3) OR ...
fn paired_dnf(n: usize) -> BooleanExp {
    let groups: Vec<String> = (0..n)
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|chunk| {
            let preds: Vec<String> = chunk.iter().map(|i| format!("c{i} > 0")).collect();
            format!("({})", preds.join(" AND "))
        })
        .collect();
    parse_expression(&groups.join(" OR "), NormalForm::Dnf).expect("expression")
}

fn bench_search_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_growth");
    for n in [2usize, 3, 4, 5, 6] {
        let exp = paired_dnf(n);
        let search = TopDownSearch::new(StepCost::default());
        group.bench_with_input(BenchmarkId::from_parameter(n), &exp, |b, exp| {
            b.iter(|| search.search(black_box(exp)).expect("search"));
        });
    }
    group.finish();
}

fn bench_memoized_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("memoized_search");
    for n in [4usize, 6, 7] {
        let exp = paired_dnf(n);
        let search = TopDownSearch::new(StepCost::default()).memoize(true);
        group.bench_with_input(BenchmarkId::from_parameter(n), &exp, |b, exp| {
            b.iter(|| search.search(black_box(exp)).expect("search"));
        });
    }
    group.finish();
}

fn bench_execute_best_plan(c: &mut Criterion) {
    let exp = paired_dnf(4);
    let plan = TopDownSearch::new(StepCost::default())
        .search(&exp)
        .expect("search")
        .best
        .expect("plan")
        .plan;

    let mut group = c.benchmark_group("execute_best_plan");
    for rows in [1_000usize, 10_000] {
        let mut csv = String::from("c0,c1,c2,c3\n");
        for i in 0..rows {
            csv.push_str(&format!("{},{},{},{}\n", i % 2, i % 3, i % 5, i % 7));
        }
        let table = Table::from_csv_str(&csv).expect("table");
        group.bench_with_input(BenchmarkId::from_parameter(rows), &table, |b, table| {
            b.iter(|| Executor::new(table).execute(black_box(&plan)).expect("execute"));
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));
    targets = bench_search_growth, bench_memoized_search, bench_execute_best_plan
}
criterion_main!(benches);
