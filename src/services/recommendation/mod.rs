use crate::algorithms::{build_index, SimilarityIndex};
use crate::config::Config;
use crate::error::{BuildError, QueryError};
use crate::models::*;
use crate::services::corpus::Corpus;
use crate::services::features::{FeatureBuilder, FeatureSet};
use crate::services::resolver::QueryResolver;
use crate::services::snapshot::SnapshotStore;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Neighbor lists keyed by `(resolved row, count)`.
///
/// Owned by one [`Recommender`] and valid for exactly its corpus; it is
/// dropped with the recommender and can be emptied with [`clear`](Self::clear).
/// Inserts stop once `max_entries` is reached.
#[derive(Debug)]
pub struct RecommendationCache {
    entries: DashMap<(usize, usize), Arc<Vec<Neighbor>>>,
    max_entries: usize,
}

impl RecommendationCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
        }
    }

    pub fn get(&self, source: usize, count: usize) -> Option<Arc<Vec<Neighbor>>> {
        self.entries.get(&(source, count)).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, source: usize, count: usize, neighbors: Arc<Vec<Neighbor>>) {
        if self.entries.len() < self.max_entries {
            self.entries.insert((source, count), neighbors);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// The recommendation facade.
///
/// Built once from a corpus and read-only afterwards, so a shared
/// `Arc<Recommender>` can answer queries from any number of threads.
pub struct Recommender {
    config: Arc<Config>,
    corpus: Corpus,
    features: FeatureSet,
    index: Arc<dyn SimilarityIndex>,
    resolver: QueryResolver,
    cache: RecommendationCache,
    built_at: DateTime<Utc>,
    build_millis: u64,
}

impl Recommender {
    /// Loads the configured corpus and builds the model, reusing an on-disk
    /// snapshot when `cache.snapshot_dir` is set.
    pub fn from_config(config: Arc<Config>) -> Result<Self, BuildError> {
        Self::load(config, false)
    }

    /// Like [`from_config`](Self::from_config), but deletes any snapshot for
    /// the corpus first so the model is always refitted and rewritten.
    pub fn rebuild_from_config(config: Arc<Config>) -> Result<Self, BuildError> {
        Self::load(config, true)
    }

    fn load(config: Arc<Config>, discard_snapshot: bool) -> Result<Self, BuildError> {
        let start = Instant::now();
        let corpus = Corpus::load(&config.corpus.path, &config.corpus)?;

        let features = match &config.cache.snapshot_dir {
            Some(dir) => {
                let store = SnapshotStore::new(dir);
                if discard_snapshot {
                    store.invalidate(&corpus)?;
                }
                store.load_or_build(&corpus, &config.features).0
            }
            None => FeatureBuilder::new(config.features.clone()).build(&corpus),
        };

        Ok(Self::assemble(config, corpus, features, start))
    }

    pub fn build(config: Arc<Config>, corpus: Corpus) -> Self {
        let start = Instant::now();
        let features = FeatureBuilder::new(config.features.clone()).build(&corpus);
        Self::assemble(config, corpus, features, start)
    }

    fn assemble(config: Arc<Config>, corpus: Corpus, features: FeatureSet, start: Instant) -> Self {
        let index = build_index(features.matrix.clone(), &config.index);
        let resolver = QueryResolver::new(&config.resolver);
        let cache = RecommendationCache::new(config.cache.max_entries);
        let build_millis = start.elapsed().as_millis() as u64;

        info!(
            "Recommender ready: {} items, {} terms, {} index, built in {}ms",
            corpus.len(),
            features.vectorizer.vocabulary().len(),
            index.kind(),
            build_millis
        );

        Self {
            config,
            corpus,
            features,
            index,
            resolver,
            cache,
            built_at: Utc::now(),
            build_millis,
        }
    }

    /// Items most similar to `title`, best first.
    ///
    /// Never fails: an unknown title, an invalid count and any internal fault
    /// all yield an empty list. Use [`try_recommend`](Self::try_recommend) to
    /// tell those cases apart.
    pub fn recommend(&self, title: &str, num: usize) -> Vec<Item> {
        match catch_unwind(AssertUnwindSafe(|| self.try_recommend(title, num))) {
            Ok(Ok(outcome)) => outcome.into_items(),
            Ok(Err(e)) => {
                error!("Recommendation for {:?} failed: {}", title, e);
                Vec::new()
            }
            Err(_) => {
                error!("Recommendation for {:?} panicked", title);
                Vec::new()
            }
        }
    }

    pub fn recommend_default(&self, title: &str) -> Vec<Item> {
        self.recommend(title, self.config.recommendation.default_count)
    }

    pub fn try_recommend(&self, title: &str, num: usize) -> Result<Outcome, QueryError> {
        if num == 0 {
            return Err(QueryError::InvalidCount);
        }

        let Some(resolution) = self.resolve(title) else {
            debug!("No corpus match for {:?}", title);
            return Ok(Outcome::NotFound);
        };

        let neighbors = match self.cache.get(resolution.index, num) {
            Some(hit) => hit,
            None => {
                let fresh = Arc::new(self.index.top_k_neighbors(resolution.index, num)?);
                self.cache.insert(resolution.index, num, fresh.clone());
                fresh
            }
        };

        let neighbors = neighbors
            .iter()
            .map(|n| {
                self.corpus
                    .get(n.index)
                    .map(|item| ScoredItem {
                        item: item.clone(),
                        score: n.score,
                    })
                    .ok_or_else(|| {
                        QueryError::InternalFault(format!("neighbor row {} is not in the corpus", n.index))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Outcome::Found {
            source: resolution.index,
            matched_by: resolution.matched_by,
            neighbors,
        })
    }

    pub fn resolve(&self, title: &str) -> Option<Resolution> {
        self.resolver.resolve(&self.features.title_index, title)
    }

    pub fn similarity(&self, i: usize, j: usize) -> Option<f32> {
        self.index.similarity(i, j)
    }

    pub fn top_k_neighbors(&self, i: usize, k: usize) -> Result<Vec<Neighbor>, QueryError> {
        Ok(self.index.top_k_neighbors(i, k)?)
    }

    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<&Item> {
        self.features
            .title_index
            .suggest(prefix, limit)
            .into_iter()
            .filter_map(|row| self.corpus.get(row))
            .collect()
    }

    pub fn item(&self, index: usize) -> Option<&Item> {
        self.corpus.get(index)
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            items: self.corpus.len(),
            vocabulary_size: self.features.vectorizer.vocabulary().len(),
            index_kind: self.index.kind().to_string(),
            cached_queries: self.cache.len(),
            built_at: self.built_at,
            build_millis: self.build_millis,
        }
    }
}
