use super::vectorizer::VectorMatrix;
use super::SimilarityIndex;
use crate::error::IndexError;
use crate::models::Neighbor;
use crate::utils::{clamp_similarity, top_k_neighbors};
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::sync::Arc;

/// Self-similarity is 1 for any non-zero row and 0 for an all-zero row.
fn self_similarity(matrix: &VectorMatrix, i: usize) -> f32 {
    match matrix.row(i) {
        Some(row) if !row.is_zero() => 1.0,
        _ => 0.0,
    }
}

/// Eagerly computed `N x N` cosine matrix.
#[derive(Debug, Clone)]
pub struct DenseSimilarityIndex {
    scores: DMatrix<f32>,
}

impl DenseSimilarityIndex {
    pub fn build(matrix: &VectorMatrix) -> Self {
        let n = matrix.row_count();
        let rows = matrix.rows();

        // Upper triangle only, mirrored below, so symmetry holds exactly.
        let upper: Vec<Vec<f32>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i..n)
                    .map(|j| {
                        if i == j {
                            self_similarity(matrix, i)
                        } else {
                            clamp_similarity(rows[i].dot(&rows[j]))
                        }
                    })
                    .collect()
            })
            .collect();

        let scores = DMatrix::from_fn(n, n, |r, c| {
            if r <= c {
                upper[r][c - r]
            } else {
                upper[c][r - c]
            }
        });

        Self { scores }
    }
}

impl SimilarityIndex for DenseSimilarityIndex {
    fn len(&self) -> usize {
        self.scores.nrows()
    }

    fn kind(&self) -> &'static str {
        "dense"
    }

    fn similarity(&self, i: usize, j: usize) -> Option<f32> {
        self.scores.get((i, j)).copied()
    }

    fn top_k_neighbors(&self, i: usize, k: usize) -> Result<Vec<Neighbor>, IndexError> {
        let len = self.len();
        if i >= len {
            return Err(IndexError::OutOfRange { index: i, len });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self
            .scores
            .column(i)
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(index, &score)| Neighbor { index, score })
            .collect();

        Ok(top_k_neighbors(candidates, k))
    }
}

/// Computes similarities per query from the sparse rows.
#[derive(Debug, Clone)]
pub struct LazySimilarityIndex {
    matrix: Arc<VectorMatrix>,
}

impl LazySimilarityIndex {
    pub fn new(matrix: Arc<VectorMatrix>) -> Self {
        Self { matrix }
    }
}

impl SimilarityIndex for LazySimilarityIndex {
    fn len(&self) -> usize {
        self.matrix.row_count()
    }

    fn kind(&self) -> &'static str {
        "lazy"
    }

    fn similarity(&self, i: usize, j: usize) -> Option<f32> {
        let a = self.matrix.row(i)?;
        let b = self.matrix.row(j)?;
        if i == j {
            Some(self_similarity(&self.matrix, i))
        } else {
            Some(clamp_similarity(a.dot(b)))
        }
    }

    fn top_k_neighbors(&self, i: usize, k: usize) -> Result<Vec<Neighbor>, IndexError> {
        let len = self.len();
        let query = self
            .matrix
            .row(i)
            .ok_or(IndexError::OutOfRange { index: i, len })?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self
            .matrix
            .rows()
            .par_iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(index, row)| Neighbor {
                index,
                score: clamp_similarity(query.dot(row)),
            })
            .collect();

        Ok(top_k_neighbors(candidates, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::TfIdfVectorizer;
    use crate::config::FeatureConfig;

    const DOCS: &[&str] = &[
        "space travel astronaut",
        "space travel astronaut",
        "cooking recipe kitchen",
        "space kitchen",
        "",
        "astronaut cooking travel",
    ];

    fn matrix() -> Arc<VectorMatrix> {
        Arc::new(TfIdfVectorizer::fit_transform(DOCS, &FeatureConfig::default()).1)
    }

    fn indexes() -> Vec<Box<dyn SimilarityIndex>> {
        let m = matrix();
        vec![
            Box::new(DenseSimilarityIndex::build(&m)),
            Box::new(LazySimilarityIndex::new(m)),
        ]
    }

    #[test]
    fn similarity_is_bounded_and_symmetric() {
        for index in indexes() {
            for i in 0..index.len() {
                for j in 0..index.len() {
                    let s = index.similarity(i, j).unwrap();
                    assert!((-1.0..=1.0).contains(&s));
                    assert_eq!(s, index.similarity(j, i).unwrap());
                }
            }
            assert_eq!(index.similarity(0, 0), Some(1.0));
            assert_eq!(index.similarity(4, 4), Some(0.0));
            assert_eq!(index.similarity(0, DOCS.len()), None);
        }
    }

    #[test]
    fn neighbors_exclude_self_and_are_ordered() {
        for index in indexes() {
            for i in 0..index.len() {
                let neighbors = index.top_k_neighbors(i, 10).unwrap();
                assert_eq!(neighbors.len(), DOCS.len() - 1);
                assert!(neighbors.iter().all(|n| n.index != i));
                for pair in neighbors.windows(2) {
                    assert!(pair[0].score >= pair[1].score);
                    if pair[0].score == pair[1].score {
                        assert!(pair[0].index < pair[1].index);
                    }
                }
            }
        }
    }

    #[test]
    fn identical_documents_rank_first() {
        for index in indexes() {
            let neighbors = index.top_k_neighbors(0, 2).unwrap();
            assert_eq!(neighbors[0].index, 1);
            assert!((neighbors[0].score - 1.0).abs() < 1e-5);
            assert_eq!(neighbors.len(), 2);
        }
    }

    #[test]
    fn dense_and_lazy_agree() {
        let m = matrix();
        let dense = DenseSimilarityIndex::build(&m);
        let lazy = LazySimilarityIndex::new(m);
        for i in 0..DOCS.len() {
            assert_eq!(
                dense.top_k_neighbors(i, 3).unwrap(),
                lazy.top_k_neighbors(i, 3).unwrap()
            );
        }
    }

    #[test]
    fn out_of_range_is_an_error() {
        for index in indexes() {
            assert_eq!(
                index.top_k_neighbors(99, 3),
                Err(IndexError::OutOfRange { index: 99, len: DOCS.len() })
            );
            assert!(index.top_k_neighbors(0, 0).unwrap().is_empty());
        }
    }

    #[test]
    fn single_item_has_no_neighbors() {
        let m = Arc::new(TfIdfVectorizer::fit_transform(&["lonely"], &FeatureConfig::default()).1);
        let dense = DenseSimilarityIndex::build(&m);
        assert!(dense.top_k_neighbors(0, 5).unwrap().is_empty());
    }
}
