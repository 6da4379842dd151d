use crate::config::ResolverConfig;
use crate::models::{Item, MatchKind, Resolution};
use crate::utils::{levenshtein, normalize_title};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Title lookup built once alongside the corpus.
///
/// Every posting list is in ascending corpus order, so the first entry is the
/// lowest index, which is the row picked when titles collide.
#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    exact: HashMap<String, Vec<usize>>,
    normalized: BTreeMap<String, Vec<usize>>,
}

impl TitleIndex {
    pub fn build(items: &[Item]) -> Self {
        let mut index = Self::default();
        for (row, item) in items.iter().enumerate() {
            index.exact.entry(item.title.clone()).or_default().push(row);
            index
                .normalized
                .entry(normalize_title(&item.title))
                .or_default()
                .push(row);
        }
        index
    }

    pub fn exact(&self, title: &str) -> Option<usize> {
        self.exact.get(title).and_then(|rows| rows.first().copied())
    }

    /// All rows sharing a normalized title, ascending.
    pub fn rows(&self, normalized: &str) -> &[usize] {
        self.normalized.get(normalized).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.normalized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    /// Closest normalized title within `max_distance`; ties go to the lowest row.
    fn nearest(&self, normalized: &str, max_distance: usize) -> Option<(usize, usize)> {
        let query_len = normalized.chars().count();
        self.normalized
            .iter()
            .filter(|(title, _)| title.chars().count().abs_diff(query_len) <= max_distance)
            .filter_map(|(title, rows)| {
                let distance = levenshtein(normalized, title);
                (distance <= max_distance).then(|| (distance, rows[0]))
            })
            .min()
            .map(|(distance, row)| (row, distance))
    }

    /// Rows whose normalized title starts with the normalized prefix, one row
    /// per distinct title, in corpus order.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<usize> {
        let prefix = normalize_title(prefix);
        if prefix.is_empty() {
            return Vec::new();
        }
        let mut rows: Vec<usize> = self
            .normalized
            .range(prefix.clone()..)
            .take_while(|(title, _)| title.starts_with(&prefix))
            .map(|(_, rows)| rows[0])
            .collect();
        rows.sort_unstable();
        rows.truncate(limit);
        rows
    }
}

/// Maps a free-text title query to a corpus row.
#[derive(Debug, Clone)]
pub struct QueryResolver {
    fuzzy_max_distance: Option<usize>,
}

impl QueryResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            fuzzy_max_distance: config.fuzzy_max_distance,
        }
    }

    /// Case/whitespace-insensitive title, then the optional edit-distance
    /// fallback. `None` is the normal "not found" outcome.
    ///
    /// Spellings that normalize alike always resolve to the same row, the
    /// lowest one; `Exact` only labels a match whose title is the query as typed.
    pub fn resolve(&self, index: &TitleIndex, query: &str) -> Option<Resolution> {
        let normalized = normalize_title(query);
        if normalized.is_empty() {
            return None;
        }

        if let Some(&row) = index.rows(&normalized).first() {
            let matched_by = if index.exact(query.trim()) == Some(row) {
                MatchKind::Exact
            } else {
                MatchKind::CaseInsensitive
            };
            return Some(Resolution { index: row, matched_by });
        }

        let max_distance = self.fuzzy_max_distance?;
        let (row, distance) = index.nearest(&normalized, max_distance)?;
        debug!("Fuzzy-matched {:?} to row {} at distance {}", query, row, distance);
        Some(Resolution {
            index: row,
            matched_by: MatchKind::Fuzzy { distance },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(titles: &[&str]) -> Vec<Item> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| Item::new(i as u64, *t, ""))
            .collect()
    }

    fn resolver(fuzzy: Option<usize>) -> QueryResolver {
        QueryResolver::new(&ResolverConfig {
            fuzzy_max_distance: fuzzy,
        })
    }

    #[test]
    fn labels_exact_and_case_insensitive_matches() {
        let index = TitleIndex::build(&items(&["Inception", "Heat", "The Matrix"]));
        let resolver = resolver(None);

        assert_eq!(
            resolver.resolve(&index, "Inception"),
            Some(Resolution { index: 0, matched_by: MatchKind::Exact })
        );
        assert_eq!(
            resolver.resolve(&index, "  INCEPTION "),
            Some(Resolution { index: 0, matched_by: MatchKind::CaseInsensitive })
        );
        assert_eq!(
            resolver.resolve(&index, "the   matrix").map(|r| r.index),
            Some(2)
        );
        assert_eq!(resolver.resolve(&index, "Matrix"), None);
        assert_eq!(resolver.resolve(&index, "   "), None);
    }

    #[test]
    fn duplicate_titles_pick_lowest_row() {
        let index = TitleIndex::build(&items(&["Heat", "Alien", "heat", "Heat"]));
        let resolver = resolver(None);

        for query in ["Heat", "heat", "HEAT", " heat  "] {
            assert_eq!(resolver.resolve(&index, query).unwrap().index, 0, "{query:?}");
        }
        assert_eq!(resolver.resolve(&index, "Heat").unwrap().matched_by, MatchKind::Exact);
        // row 2 is titled "heat" exactly, but row 0 wins
        assert_eq!(
            resolver.resolve(&index, "heat").unwrap().matched_by,
            MatchKind::CaseInsensitive
        );
        assert_eq!(index.rows("heat"), &[0, 2, 3]);
        assert!(index.rows("Heat").is_empty());
    }

    #[test]
    fn fuzzy_fallback_is_opt_in_and_bounded() {
        let index = TitleIndex::build(&items(&["Avatar", "Alien", "Aliens"]));

        assert_eq!(resolver(None).resolve(&index, "Avatr"), None);
        assert_eq!(
            resolver(Some(2)).resolve(&index, "Avatr"),
            Some(Resolution { index: 0, matched_by: MatchKind::Fuzzy { distance: 1 } })
        );
        assert_eq!(resolver(Some(2)).resolve(&index, "Zodiac"), None);
        // exact wins over a fuzzy neighbour
        assert_eq!(
            resolver(Some(2)).resolve(&index, "Aliens").unwrap().matched_by,
            MatchKind::Exact
        );
        // equal distance goes to the lower row
        assert_eq!(resolver(Some(1)).resolve(&index, "alienx").unwrap().index, 1);
    }

    #[test]
    fn suggests_by_prefix_in_corpus_order() {
        let index = TitleIndex::build(&items(&["The Matrix", "Heat", "The Thing", "the matrix", "Alien"]));
        assert_eq!(index.suggest("the", 10), vec![0, 2]);
        assert_eq!(index.suggest("THE T", 10), vec![2]);
        assert_eq!(index.suggest("the", 1), vec![0]);
        assert!(index.suggest("", 10).is_empty());
        assert!(index.suggest("zzz", 10).is_empty());
    }
}
