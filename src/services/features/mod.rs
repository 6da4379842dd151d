use crate::algorithms::vectorizer::VectorMatrix;
use crate::algorithms::TfIdfVectorizer;
use crate::config::FeatureConfig;
use crate::services::corpus::Corpus;
use crate::services::resolver::TitleIndex;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Everything derived from the corpus in the one-time build.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub vectorizer: TfIdfVectorizer,
    pub matrix: Arc<VectorMatrix>,
    pub title_index: TitleIndex,
}

pub struct FeatureBuilder {
    config: FeatureConfig,
}

impl FeatureBuilder {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, corpus: &Corpus) -> FeatureSet {
        let start = Instant::now();
        let documents: Vec<&str> = corpus.items().iter().map(|item| item.tags.as_str()).collect();
        let (vectorizer, matrix) = TfIdfVectorizer::fit_transform(&documents, &self.config);

        info!(
            "Built {} tag vectors over a vocabulary of {} terms in {:?}",
            matrix.row_count(),
            vectorizer.vocabulary().len(),
            start.elapsed()
        );

        Self::assemble(corpus, vectorizer, matrix)
    }

    /// Pairs a fitted vectorizer (fresh or restored from a snapshot) with the
    /// corpus title index.
    pub fn assemble(corpus: &Corpus, vectorizer: TfIdfVectorizer, matrix: VectorMatrix) -> FeatureSet {
        debug_assert_eq!(matrix.row_count(), corpus.len());
        FeatureSet {
            vectorizer,
            matrix: Arc::new(matrix),
            title_index: TitleIndex::build(corpus.items()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;

    #[test]
    fn one_row_per_item() {
        let corpus = Corpus::from_items(vec![
            Item::new(0, "A", "space travel astronaut"),
            Item::new(1, "B", "space travel astronaut"),
            Item::new(2, "C", "cooking recipe kitchen"),
        ]);
        let features = FeatureBuilder::new(FeatureConfig::default()).build(&corpus);

        assert_eq!(features.matrix.row_count(), corpus.len());
        assert_eq!(features.vectorizer.vocabulary().len(), 6);
        assert_eq!(features.title_index.len(), 3);
        assert_eq!(features.matrix.rows()[0], features.matrix.rows()[1]);
    }

    #[test]
    fn empty_corpus_is_not_an_error() {
        let features = FeatureBuilder::new(FeatureConfig::default()).build(&Corpus::default());
        assert_eq!(features.matrix.row_count(), 0);
        assert!(features.vectorizer.vocabulary().is_empty());
        assert!(features.title_index.is_empty());
    }
}
