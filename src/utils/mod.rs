use crate::models::Neighbor;
use std::cmp::Ordering;

pub mod validation;

/// Joins text fields with single spaces, lower-cases and collapses whitespace.
pub fn build_tags(fields: &[&str]) -> String {
    let mut tags = String::new();
    for word in fields.iter().flat_map(|field| field.split_whitespace()) {
        if !tags.is_empty() {
            tags.push(' ');
        }
        tags.extend(word.chars().flat_map(char::to_lowercase));
    }
    tags
}

/// Title normalization shared by the title index and the resolver.
pub fn normalize_title(title: &str) -> String {
    build_tags(&[title])
}

pub fn normalize_vector(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Descending score, ascending index on ties.
pub fn neighbor_order(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.index.cmp(&b.index))
}

/// Keeps the best `k` entries under [`neighbor_order`].
pub fn top_k_neighbors(mut candidates: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    if k < candidates.len() {
        candidates.select_nth_unstable_by(k, neighbor_order);
        candidates.truncate(k);
    }
    candidates.sort_by(neighbor_order);
    candidates
}

pub fn clamp_similarity(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(-1.0, 1.0)
    }
}

/// Edit distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(index: usize, score: f32) -> Neighbor {
        Neighbor { index, score }
    }

    #[test]
    fn test_build_tags() {
        assert_eq!(build_tags(&["  Space Travel ", "", "ASTRONAUT\tcrew"]), "space travel astronaut crew");
        assert_eq!(build_tags(&["", "   "]), "");
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  The   Dark\nKnight "), "the dark knight");
        assert_eq!(normalize_title("INCEPTION"), normalize_title("inception"));
    }

    #[test]
    fn test_normalize_vector() {
        let mut v = vec![3.0, 4.0];
        normalize_vector(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize_vector(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_top_k_breaks_ties_by_index() {
        let candidates = vec![n(4, 0.5), n(1, 0.9), n(3, 0.5), n(0, 0.1), n(2, 0.5)];
        let top = top_k_neighbors(candidates, 3);
        let indices: Vec<usize> = top.iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_top_k_larger_than_input() {
        let top = top_k_neighbors(vec![n(1, 0.2), n(0, 0.7)], 10);
        assert_eq!(top, vec![n(0, 0.7), n(1, 0.2)]);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("avatar", "avatr"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
    }

    #[test]
    fn test_clamp_similarity() {
        assert_eq!(clamp_similarity(1.0000001), 1.0);
        assert_eq!(clamp_similarity(f32::NAN), 0.0);
        assert_eq!(clamp_similarity(-0.5), -0.5);
    }
}
