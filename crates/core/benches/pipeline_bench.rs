//! Pipeline performance benchmarks for tagtree-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tagtree_core::{
    now_millis, refresh, run_pipeline, DocumentRecord, HidePolicy, IngestContext, ResolvedLinks, SearchFilter,
    TagInfoDict, TreeSettings,
};

fn corpus(count: usize) -> Vec<DocumentRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let vocab: Vec<String> = (0..40)
        .map(|i| match i % 4 {
            0 => format!("area{i}"),
            1 => format!("area{}/topic{i}", i - 1),
            2 => format!("area{}/topic{}/detail{i}", i - 2, i - 1),
            _ => format!("misc{i}"),
        })
        .collect();
    (0..count)
        .map(|i| {
            let n = rng.gen_range(0..5);
            let tags: Vec<String> = vocab.choose_multiple(&mut rng, n).cloned().collect();
            DocumentRecord::new(format!("notes/doc{i:05}.md"), tags).with_times(rng.gen_range(0..1_000_000), 0)
        })
        .collect()
}

fn bench_full_pipeline(c: &mut Criterion) {
    let settings = TreeSettings::default();
    let tag_info = TagInfoDict::new();
    let search = SearchFilter::default();
    let links = ResolvedLinks::new();
    let ctx = IngestContext {
        settings: &settings,
        tag_info: &tag_info,
        search: &search,
        links: &links,
        now: now_millis(),
    };

    let mut group = c.benchmark_group("pipeline");
    for size in [100usize, 1_000, 5_000] {
        let records = corpus(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| black_box(run_pipeline(records, &ctx, &[] as &[&str]).map(|t| t.arena_len())));
        });
    }
    group.finish();
}

fn bench_incremental_refresh(c: &mut Criterion) {
    let settings = TreeSettings::default();
    let tag_info = TagInfoDict::new();
    let search = SearchFilter::default();
    let links = ResolvedLinks::new();
    let ctx = IngestContext {
        settings: &settings,
        tag_info: &tag_info,
        search: &search,
        links: &links,
        now: now_millis(),
    };
    let records = corpus(5_000);
    let Ok(tree) = run_pipeline(&records, &ctx, &[] as &[&str]) else {
        return;
    };
    let Some(target) = tree.node(tree.root()).all_descendants.clone().and_then(|all| all.first().cloned()) else {
        return;
    };

    c.bench_function("refresh_after_single_change", |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| {
                let mut changed = (*target).clone();
                changed.mtime += 1;
                tree.replace_item(Arc::new(changed));
                black_box(refresh(&mut tree, HidePolicy::None).len())
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_full_pipeline, bench_incremental_refresh);
criterion_main!(benches);
