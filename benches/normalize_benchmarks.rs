//! Benchmarks for parsing and normalization.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sparsepoly::backend::NativeBackend;
use sparsepoly::env::{Environment, Monotonicity, UninterpFunc};
use sparsepoly::frontend::{parse_set, Lexer};

const GAUSS_SEIDEL: &str = "[n] -> { [i, ip, k, kp] : i < ip && 0 <= i < n && 0 <= ip < n \
     && rowptr(i) <= k < diagptr(i) && rowptr(ip) <= kp < diagptr(ip) \
     && colidx(k) = colidx(kp) && k = kp }";

fn sparse_env() -> Environment {
    let interval = |p: &str| {
        parse_set(&format!("[{p}] -> {{ [x] : 0 <= x < {p} }}", p = p)).unwrap()
    };
    let mut env = Environment::new();
    for name in ["rowptr", "diagptr"] {
        env.declare(UninterpFunc::new(
            name,
            interval("m"),
            interval("nnz"),
            false,
            Monotonicity::Nondecreasing,
        ))
        .unwrap();
    }
    env.declare(UninterpFunc::new(
        "colidx",
        interval("nnz"),
        interval("m"),
        false,
        Monotonicity::None,
    ))
    .unwrap();
    env
}

/// Benchmark lexer speed.
fn bench_lexing(c: &mut Criterion) {
    c.bench_function("lex_gauss_seidel", |b| {
        b.iter(|| Lexer::new(black_box(GAUSS_SEIDEL)).tokenize().unwrap())
    });
}

/// Benchmark parsing speed.
fn bench_parsing(c: &mut Criterion) {
    c.bench_function("parse_gauss_seidel", |b| {
        b.iter(|| parse_set(black_box(GAUSS_SEIDEL)).unwrap())
    });
}

/// Benchmark UFC promotion plus the full normalize pipeline.
fn bench_normalize(c: &mut Criterion) {
    let env = sparse_env();
    let backend = NativeBackend::new();
    let set = parse_set("{ [i, k] : rowptr(i) <= k < rowptr(i + 1) }").unwrap();

    c.bench_function("promote_uf_calls", |b| {
        b.iter(|| {
            sparsepoly::constraints::normalize::ufc_to_temp_vars(
                black_box(&set.conjunctions()[0]),
                &env,
            )
            .unwrap()
        })
    });

    c.bench_function("normalize_csr_row", |b| {
        b.iter(|| {
            let mut s = set.clone();
            s.normalize(&env, &backend).unwrap();
            s
        })
    });

    let gs = parse_set(GAUSS_SEIDEL).unwrap();
    c.bench_function("normalize_gauss_seidel", |b| {
        b.iter(|| {
            let mut s = gs.clone();
            s.normalize(&env, &backend).unwrap();
            s
        })
    });
}

/// Benchmark set algebra on affine operands.
fn bench_set_ops(c: &mut Criterion) {
    let a = parse_set("[n] -> { [i, j] : 0 <= i < n && 0 <= j < n }").unwrap();
    let b2 = parse_set("[n] -> { [i, j] : i < j }").unwrap();

    c.bench_function("set_intersect", |b| {
        b.iter(|| black_box(&a).intersect(black_box(&b2)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_lexing,
    bench_parsing,
    bench_normalize,
    bench_set_ops
);
criterion_main!(benches);
