//! TF-IDF vectorization of item tag documents.
//!
//! The vocabulary is the sorted set of corpus terms, so dimension `d` is the
//! `d`-th term in lexical order. Weights are `tf * idf` with
//! `idf(t) = ln((1 + N) / (1 + df(t))) + 1`, and every row is L2-normalized.

use super::tokenizer::Tokenizer;
use crate::config::FeatureConfig;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: Vec<String>,
}

impl Vocabulary {
    fn from_sorted(terms: Vec<String>) -> Self {
        Self { terms }
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Sparse row with strictly ascending dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    pub fn from_sorted(indices: Vec<u32>, values: Vec<f32>) -> Self {
        debug_assert_eq!(indices.len(), values.len());
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        Self { indices, values }
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    pub fn normalize(&mut self) {
        crate::utils::normalize_vector(&mut self.values);
    }

    /// Merge-join dot product. Matched dimensions are summed in ascending
    /// order, so `a.dot(b)` and `b.dot(a)` are bit-identical.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0f32;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// One row per corpus item, all sharing the vocabulary's dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorMatrix {
    dimension: usize,
    rows: Vec<SparseVector>,
}

impl VectorMatrix {
    pub fn new(dimension: usize, rows: Vec<SparseVector>) -> Self {
        Self { dimension, rows }
    }

    pub fn row(&self, index: usize) -> Option<&SparseVector> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    tokenizer: Tokenizer,
    vocabulary: Vocabulary,
    idf: Vec<f32>,
    document_count: usize,
}

type TermCounts = BTreeMap<String, u32>;

impl TfIdfVectorizer {
    pub fn fit(documents: &[&str], config: &FeatureConfig) -> Self {
        Self::fit_transform(documents, config).0
    }

    pub fn fit_transform(documents: &[&str], config: &FeatureConfig) -> (Self, VectorMatrix) {
        let tokenizer = Tokenizer::new(config);
        let counts: Vec<TermCounts> = documents
            .par_iter()
            .map(|doc| count_terms(&tokenizer, doc))
            .collect();

        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        let mut corpus_frequency: BTreeMap<&str, u64> = BTreeMap::new();
        for doc in &counts {
            for (term, &tf) in doc {
                *document_frequency.entry(term.as_str()).or_insert(0) += 1;
                *corpus_frequency.entry(term.as_str()).or_insert(0) += u64::from(tf);
            }
        }

        let terms = select_terms(&corpus_frequency, config.max_features);
        let n = documents.len() as f64;
        let idf = terms
            .iter()
            .map(|term| {
                let df = document_frequency.get(term.as_str()).copied().unwrap_or(0) as f64;
                (((1.0 + n) / (1.0 + df)).ln() + 1.0) as f32
            })
            .collect();

        let vectorizer = Self {
            tokenizer,
            vocabulary: Vocabulary::from_sorted(terms),
            idf,
            document_count: documents.len(),
        };

        let rows = counts
            .par_iter()
            .map(|doc| vectorizer.weigh(doc))
            .collect();
        let matrix = VectorMatrix::new(vectorizer.vocabulary.len(), rows);

        (vectorizer, matrix)
    }

    /// Vectorizes text against the fitted vocabulary; unseen terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&count_terms(&self.tokenizer, text))
    }

    fn weigh(&self, counts: &TermCounts) -> SparseVector {
        let mut indices = Vec::with_capacity(counts.len());
        let mut values = Vec::with_capacity(counts.len());
        // BTreeMap iterates in the same lexical order as the vocabulary.
        for (term, &tf) in counts {
            if let Some(index) = self.vocabulary.index_of(term) {
                indices.push(index as u32);
                values.push(tf as f32 * self.idf[index]);
            }
        }
        let mut vector = SparseVector::from_sorted(indices, values);
        vector.normalize();
        vector
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[f32] {
        &self.idf
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }
}

fn count_terms(tokenizer: &Tokenizer, text: &str) -> TermCounts {
    let mut counts = TermCounts::new();
    for token in tokenizer.tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// All terms in lexical order, or the `max_features` most frequent ones
/// (ties by term) re-sorted lexically.
fn select_terms(corpus_frequency: &BTreeMap<&str, u64>, max_features: Option<usize>) -> Vec<String> {
    match max_features {
        Some(limit) if limit < corpus_frequency.len() => {
            let mut ranked: Vec<(&str, u64)> =
                corpus_frequency.iter().map(|(t, c)| (*t, *c)).collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            ranked.truncate(limit);
            let mut terms: Vec<String> = ranked.into_iter().map(|(t, _)| t.to_string()).collect();
            terms.sort();
            terms
        }
        _ => corpus_frequency.keys().map(|t| t.to_string()).collect(),
    }
}
