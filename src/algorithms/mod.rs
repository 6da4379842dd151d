pub mod retriever;
pub mod tokenizer;
pub mod vectorizer;

use crate::config::{IndexConfig, IndexStrategy};
use crate::error::IndexError;
use crate::models::Neighbor;
use std::sync::Arc;
use tracing::info;
use vectorizer::VectorMatrix;

pub use retriever::{DenseSimilarityIndex, LazySimilarityIndex};
pub use tokenizer::Tokenizer;
pub use vectorizer::{SparseVector, TfIdfVectorizer, Vocabulary};

/// Nearest-neighbor queries over a fixed vector matrix.
///
/// Implementations must agree exactly: scores lie in `[-1, 1]`,
/// `similarity(i, j) == similarity(j, i)`, and `top_k_neighbors` excludes `i`,
/// orders by descending score and breaks ties by ascending row.
pub trait SimilarityIndex: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str;

    /// `None` when either row is out of range.
    fn similarity(&self, i: usize, j: usize) -> Option<f32>;

    /// Returns `min(k, len - 1)` neighbors of row `i`.
    fn top_k_neighbors(&self, i: usize, k: usize) -> Result<Vec<Neighbor>, IndexError>;
}

pub fn build_index(matrix: Arc<VectorMatrix>, config: &IndexConfig) -> Arc<dyn SimilarityIndex> {
    let rows = matrix.row_count();
    let dense = match config.strategy {
        IndexStrategy::Dense => true,
        IndexStrategy::Lazy => false,
        IndexStrategy::Auto => rows <= config.dense_max_items,
    };

    if dense {
        info!("Precomputing dense similarity matrix for {} items", rows);
        Arc::new(DenseSimilarityIndex::build(&matrix))
    } else {
        info!("Using on-demand similarity index for {} items", rows);
        Arc::new(LazySimilarityIndex::new(matrix))
    }
}
