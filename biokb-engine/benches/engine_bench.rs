//! Build and query timings over a synthetic corpus.

use biokb_engine::{ingest, IndexSnapshot, KnowledgeEngine, QueryResolver, RawRecord};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

const SUBJECTS: &[&str] = &["mice", "rats", "arabidopsis", "yeast", "human cells", "lettuce"];
const STRESSORS: &[&str] = &[
    "microgravity",
    "space radiation",
    "hypoxia",
    "isolation",
    "cosmic rays",
    "heat",
];
const FINDINGS: &[&str] = &[
    "bone density decreased",
    "gene expression shifted",
    "root growth slowed",
    "immune response weakened",
    "muscle protein synthesis dropped",
];

// =============================================================================
// Helper Functions: Deterministic Data Generation
// =============================================================================

fn generate_corpus(count: usize) -> Vec<RawRecord> {
    (0..count)
        .map(|i| {
            let subject = SUBJECTS[i % SUBJECTS.len()];
            let stressor = STRESSORS[(i / SUBJECTS.len()) % STRESSORS.len()];
            let finding = FINDINGS[i % FINDINGS.len()];
            RawRecord::new(
                format!("Effects of {stressor} on {subject} ({i})"),
                format!("In {subject} exposed to {stressor}, {finding} over the mission."),
            )
            .with_year(2000 + (i % 25) as i64)
        })
        .collect()
}

fn build_snapshot(count: usize) -> Arc<IndexSnapshot> {
    Arc::new(ingest(generate_corpus(count)).expect("synthetic corpus ingests"))
}

// =============================================================================
// Ingestion
// =============================================================================

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    for size in [100usize, 600, 2000] {
        let rows = generate_corpus(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| ingest(black_box(rows.clone())))
        });
    }
    group.finish();
}

// =============================================================================
// Queries
// =============================================================================

fn bench_keyword_search(c: &mut Criterion) {
    let snapshot = build_snapshot(600);
    c.bench_function("keyword_search", |b| {
        b.iter(|| snapshot.search(black_box("bone density microgravity"), 20).len())
    });
}

fn bench_resolve_uncached(c: &mut Criterion) {
    let snapshot = build_snapshot(600);
    let resolver = QueryResolver::default();
    c.bench_function("resolve_uncached", |b| {
        b.iter(|| {
            resolver
                .resolve_uncached(&snapshot, black_box("effects of microgravity on mice"))
                .publication_ids
                .len()
        })
    });
}

fn bench_resolve_cached(c: &mut Criterion) {
    let engine =
        KnowledgeEngine::from_rows(generate_corpus(600)).expect("synthetic corpus ingests");
    engine.resolve_query("effects of microgravity on mice");
    c.bench_function("resolve_cached", |b| {
        b.iter(|| engine.resolve_query(black_box("effects of microgravity on mice")).len())
    });
}

fn bench_related_subjects(c: &mut Criterion) {
    let snapshot = build_snapshot(600);
    c.bench_function("related_subjects", |b| {
        b.iter(|| snapshot.related_subjects(black_box("Mice")).len())
    });
}

criterion_group!(
    benches,
    bench_ingest,
    bench_keyword_search,
    bench_resolve_uncached,
    bench_resolve_cached,
    bench_related_subjects
);
criterion_main!(benches);
