//! Alias query benchmarks
//!
//! - Backward query over a copy chain of growing length
//! - Backward query through a chain of nested identity calls
//! - Whole-program forward run over every allocation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use syncpds_engine::config::AnalysisConfig;
use syncpds_engine::features::query::{InMemoryProgram, MethodBuilder};
use syncpds_engine::{
    AnalysisContext, AnalysisScope, BackwardQuery, Method, OneWeightFunctions, QueryEngine,
    Reachability, Statement, Val, WeightFunctions, WholeProgramAnalysis,
};

fn main_method() -> Method {
    Method::new("Bench", "main")
}

/// `v0 = new T; v1 = v0; ...; vn = v(n-1); ret`
fn copy_chain(len: usize) -> InMemoryProgram {
    let mut b = MethodBuilder::new(main_method());
    b.alloc("v0", "T");
    for i in 1..=len {
        b.copy(&format!("v{}", i), &format!("v{}", i - 1));
    }
    b.ret(None);
    let mut program = InMemoryProgram::new();
    program.add_method(b);
    program
}

/// `f_i(p) { r = f_(i+1)(p); ret r }`, the last one returns `p`
fn call_chain(depth: usize) -> InMemoryProgram {
    let mut program = InMemoryProgram::new();
    let methods: Vec<Method> = (0..depth).map(|i| Method::new("Chain", format!("f{}", i))).collect();
    for (i, method) in methods.iter().enumerate() {
        let mut b = MethodBuilder::new(method.clone());
        b.params(&["p"]);
        match methods.get(i + 1) {
            Some(next) => {
                b.call(Some("r"), next, &["p"]);
                b.ret(Some("r"));
            }
            None => {
                b.ret(Some("p"));
            }
        }
        program.add_method(b);
    }

    let mut b = MethodBuilder::new(main_method());
    b.alloc("a", "A");
    b.call(Some("b"), &methods[0], &["a"]);
    b.nop();
    b.ret(None);
    program.add_method(b);
    program
}

fn bench_copy_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("backward_copy_chain");
    let main = main_method();

    for len in [10usize, 100, 500] {
        let program: Arc<dyn syncpds_engine::ProgramModel> = Arc::new(copy_chain(len));
        let query = BackwardQuery::new(
            Statement::new(main.clone(), len + 1),
            Val::local(format!("v{}", len), &main),
        );
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &query, |b, query| {
            b.iter(|| {
                let mut engine: QueryEngine<Reachability> =
                    QueryEngine::new(program.clone(), AnalysisConfig::default());
                black_box(engine.solve_backward(query.clone()).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_call_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("backward_call_chain");
    let main = main_method();

    for depth in [4usize, 16, 64] {
        let program: Arc<dyn syncpds_engine::ProgramModel> = Arc::new(call_chain(depth));
        let query = BackwardQuery::new(Statement::new(main.clone(), 3), Val::local("b", &main));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &query, |b, query| {
            b.iter(|| {
                let mut engine: QueryEngine<Reachability> =
                    QueryEngine::new(program.clone(), AnalysisConfig::default());
                black_box(engine.solve_backward(query.clone()).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_whole_program(c: &mut Criterion) {
    let program: Arc<dyn syncpds_engine::ProgramModel> = Arc::new(copy_chain(200));
    let queries = AnalysisScope::new(program.as_ref()).allocation_sites();
    let weights: Arc<dyn WeightFunctions<Reachability>> = Arc::new(OneWeightFunctions);

    c.bench_function("whole_program_forward", |b| {
        b.iter(|| {
            let context = AnalysisContext::new(program.clone(), AnalysisConfig::default()).unwrap();
            let analysis = WholeProgramAnalysis::new(context);
            black_box(analysis.run_forward(&queries, weights.clone()).unwrap())
        });
    });
}

criterion_group!(benches, bench_copy_chain, bench_call_chain, bench_whole_program);
criterion_main!(benches);
