use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use movierec::algorithms::{DenseSimilarityIndex, LazySimilarityIndex, SimilarityIndex, TfIdfVectorizer};
use movierec::config::{FeatureConfig, IndexStrategy};
use movierec::*;
use std::sync::Arc;

const WORDS: &[&str] = &[
    "space", "travel", "astronaut", "crime", "heist", "detective", "romance", "paris", "war",
    "soldier", "dream", "robot", "alien", "ocean", "pirate", "magic", "school", "dragon",
    "family", "comedy", "horror", "ghost", "city", "police", "music", "band", "desert",
    "racing", "car", "spy", "king", "empire",
];

fn synthetic_corpus(size: usize) -> Corpus {
    let items = (0..size)
        .map(|i| {
            let overview: Vec<&str> = (0..12)
                .map(|j| WORDS[(i * 7 + j * 13 + i / 3) % WORDS.len()])
                .collect();
            Item::new(i as u64, format!("Movie {i}"), overview.join(" "))
                .with_genres(WORDS[i % WORDS.len()])
                .with_director(format!("Director {}", i % 40))
        })
        .collect();
    Corpus::from_items(items)
}

fn benchmark_vectorizer(c: &mut Criterion) {
    let corpus = synthetic_corpus(2_000);
    let documents: Vec<&str> = corpus.items().iter().map(|item| item.tags.as_str()).collect();

    c.bench_function("tfidf_fit_transform_2000", |b| {
        b.iter(|| black_box(TfIdfVectorizer::fit_transform(&documents, &FeatureConfig::default())));
    });
}

fn benchmark_similarity_index(c: &mut Criterion) {
    let corpus = synthetic_corpus(2_000);
    let documents: Vec<&str> = corpus.items().iter().map(|item| item.tags.as_str()).collect();
    let matrix = Arc::new(TfIdfVectorizer::fit_transform(&documents, &FeatureConfig::default()).1);

    c.bench_function("dense_index_build_2000", |b| {
        b.iter(|| black_box(DenseSimilarityIndex::build(&matrix)));
    });

    let dense = DenseSimilarityIndex::build(&matrix);
    let lazy = LazySimilarityIndex::new(matrix.clone());

    let mut group = c.benchmark_group("top_k_neighbors");
    for k in [6usize, 50] {
        group.bench_with_input(BenchmarkId::new("dense", k), &k, |b, &k| {
            b.iter(|| black_box(dense.top_k_neighbors(17, k).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("lazy", k), &k, |b, &k| {
            b.iter(|| black_box(lazy.top_k_neighbors(17, k).unwrap()));
        });
    }
    group.finish();
}

fn benchmark_recommend(c: &mut Criterion) {
    let mut config = Config::default();
    config.cache.max_entries = 0;
    config.index.strategy = IndexStrategy::Dense;
    let recommender = Recommender::build(Arc::new(config), synthetic_corpus(2_000));

    c.bench_function("recommend_uncached", |b| {
        b.iter(|| black_box(recommender.recommend("movie 1234", 6)));
    });

    let cached = Recommender::build(Arc::new(Config::default()), synthetic_corpus(2_000));
    c.bench_function("recommend_cached", |b| {
        b.iter(|| black_box(cached.recommend("Movie 1234", 6)));
    });
}

criterion_group!(
    benches,
    benchmark_vectorizer,
    benchmark_similarity_index,
    benchmark_recommend
);
criterion_main!(benches);
