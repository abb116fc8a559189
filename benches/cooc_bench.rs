use cooc_engine::{
    CoocConfig, CooccurrenceVectorizer, Document, Kernel, Orientation, Token,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn synthetic_corpus(n_docs: usize, doc_len: usize, vocabulary: i64) -> Vec<Document> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..n_docs)
        .map(|_| {
            Document::Plain(
                (0..doc_len)
                    .map(|_| Token::from(rng.gen_range(0..vocabulary)))
                    .collect(),
            )
        })
        .collect()
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");

    for n_docs in [10, 100].iter() {
        let docs = synthetic_corpus(*n_docs, 200, 500);
        let config = CoocConfig::default()
            .window_radius(3)
            .kernel(Kernel::Geometric);

        group.throughput(Throughput::Elements((*n_docs as u64) * 200));
        group.bench_with_input(BenchmarkId::from_parameter(n_docs), &docs, |b, docs| {
            b.iter(|| {
                let model = CooccurrenceVectorizer::new(config.clone())
                    .fit(docs)
                    .unwrap();
                black_box(model.matrix().nnz());
            });
        });
    }

    group.finish();
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");

    let docs = synthetic_corpus(100, 200, 500);
    let model = CooccurrenceVectorizer::new(
        CoocConfig::default()
            .window_radius(3)
            .window_orientation(Orientation::After),
    )
    .fit(&docs)
    .unwrap();

    group.throughput(Throughput::Elements(100 * 200));
    group.bench_function("after_radius_3", |b| {
        b.iter(|| black_box(model.transform(&docs).unwrap().nnz()));
    });

    group.finish();
}

fn bench_refinement(c: &mut Criterion) {
    let mut group = c.benchmark_group("refinement");

    let docs = synthetic_corpus(50, 200, 500);
    for n_iter in [0, 2].iter() {
        let config = CoocConfig::default().window_radius(3).n_iter(*n_iter);
        group.bench_with_input(BenchmarkId::from_parameter(n_iter), &config, |b, config| {
            b.iter(|| {
                let model = CooccurrenceVectorizer::new(config.clone())
                    .fit(&docs)
                    .unwrap();
                black_box(model.matrix().nnz());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_transform, bench_refinement);
criterion_main!(benches);
