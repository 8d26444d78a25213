use criterion::{criterion_group, criterion_main, Criterion};
use daat_core::tokenizer::tokenize;
use daat_core::{daat_and, MergeStrategy, Posting, PostingsList};

const TEXT: &str = "The novel coronavirus spread quickly across cities, and researchers \
    raced to sequence the virus while hospitals prepared for a surge of patients.";

fn list_every(step: u32, len: u32) -> PostingsList {
    let mut list: PostingsList = (0..len).map(|i| Posting::new(i * step, 1, 10)).collect();
    list.install_skip_connections();
    list.compute_tf_idf(len * step, false);
    list
}

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_sentence", |b| b.iter(|| tokenize(TEXT)));
}

fn bench_merge(c: &mut Criterion) {
    let dense = list_every(1, 20_000);
    let sparse = list_every(97, 200);
    let medium = list_every(3, 6_000);
    let lists = [&dense, &sparse, &medium];
    for (name, strategy) in [
        ("daat_and", MergeStrategy::DAAT_AND),
        ("daat_and_skip", MergeStrategy::DAAT_AND_SKIP),
        ("daat_and_tf_idf", MergeStrategy::DAAT_AND_TF_IDF),
        ("daat_and_skip_tf_idf", MergeStrategy::DAAT_AND_SKIP_TF_IDF),
    ] {
        c.bench_function(name, |b| b.iter(|| daat_and(&lists, strategy)));
    }
}

criterion_group!(benches, bench_tokenize, bench_merge);
criterion_main!(benches);
