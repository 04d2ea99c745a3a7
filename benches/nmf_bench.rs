use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use topic_nmf::algo::nmf::{self, UpdateSchedule, DEFAULT_EPSILON};
use topic_nmf::algo::vocabulary::Vocabulary;
use topic_nmf::algo::{corpus, topics};
use topic_nmf::{train, CountMatrix};

/// Synthetic corpus: each document draws most of its words from one of `k` blocks
fn generate_counts(n_words: usize, n_docs: usize, k: usize) -> CountMatrix {
    let mut rng = StdRng::seed_from_u64(7);
    let block = (n_words / k).max(1);
    let data = Array2::from_shape_fn((n_words, n_docs), |(i, j)| {
        let home = (j % k) * block;
        let in_block = i >= home && i < home + block;
        if in_block && rng.gen_bool(0.4) {
            rng.gen_range(1..=6) as f64
        } else if rng.gen_bool(0.02) {
            1.0
        } else {
            0.0
        }
    });
    CountMatrix::new(data).unwrap()
}

/// Render a count matrix in the `index:count` line format
fn generate_document_text(x: &CountMatrix) -> String {
    let view = x.view();
    let mut out = String::new();
    for doc in view.columns() {
        let pairs: Vec<String> = doc
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.0)
            .map(|(i, &v)| format!("{}:{}", i + 1, v as u64))
            .collect();
        out.push_str(&pairs.join(","));
        out.push('\n');
    }
    out
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    for (n_words, n_docs) in [(200, 100), (1000, 500)] {
        let x = generate_counts(n_words, n_docs, 10);
        let mut rng = StdRng::seed_from_u64(42);
        let (w0, h0) = nmf::initialize(n_words, n_docs, 10, &mut rng).unwrap();

        for schedule in [UpdateSchedule::Refreshed, UpdateSchedule::Stale] {
            let id = BenchmarkId::new(schedule.as_str(), format!("{n_words}x{n_docs}"));
            group.bench_with_input(id, &x, |b, x| {
                b.iter_batched(
                    || (w0.clone(), h0.clone()),
                    |(mut w, mut h)| {
                        nmf::update(x.view(), &mut w, &mut h, DEFAULT_EPSILON, schedule).unwrap();
                        black_box((w, h))
                    },
                    criterion::BatchSize::SmallInput,
                )
            });
        }
    }
    group.finish();
}

fn bench_objective(c: &mut Criterion) {
    let x = generate_counts(1000, 500, 10);
    let mut rng = StdRng::seed_from_u64(42);
    let (w, h) = nmf::initialize(1000, 500, 10, &mut rng).unwrap();

    c.bench_function("objective/1000x500", |b| {
        b.iter(|| black_box(nmf::objective(x.view(), w.view(), h.view(), DEFAULT_EPSILON)))
    });
}

fn bench_train(c: &mut Criterion) {
    let mut group = c.benchmark_group("train");
    group.sample_size(10); // Expensive: full runs
    for n_docs in [100, 400] {
        let x = generate_counts(500, n_docs, 10);
        group.bench_with_input(BenchmarkId::from_parameter(n_docs), &x, |b, x| {
            b.iter(|| black_box(train(x, 10, 20, 42).unwrap()))
        });
    }
    group.finish();
}

fn bench_parse_counts(c: &mut Criterion) {
    let x = generate_counts(2000, 1000, 20);
    let text = generate_document_text(&x);

    c.bench_function("parse_counts/2000x1000", |b| {
        b.iter(|| black_box(corpus::parse_counts(black_box(&text), Some(2000)).unwrap()))
    });
}

fn bench_top_terms(c: &mut Criterion) {
    let x = generate_counts(2000, 200, 25);
    let result = train(&x, 25, 5, 42).unwrap();
    let vocab = Vocabulary::numbered(2000);

    c.bench_function("top_terms/2000x25", |b| {
        b.iter(|| black_box(topics::top_terms(result.w(), &vocab, 10).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_update,
    bench_objective,
    bench_train,
    bench_parse_counts,
    bench_top_terms,
);
criterion_main!(benches);
