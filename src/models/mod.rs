use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the corpus, fixed at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub title: String,
    pub overview: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub genres: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub cast: String,
    #[serde(default)]
    pub director: String,
    /// Lower-cased, whitespace-collapsed concatenation of the descriptive fields.
    #[serde(default)]
    pub tags: String,
}

impl Item {
    pub fn new(id: u64, title: impl Into<String>, overview: impl Into<String>) -> Self {
        let mut item = Self {
            id,
            title: title.into(),
            overview: overview.into(),
            tagline: String::new(),
            genres: String::new(),
            keywords: String::new(),
            cast: String::new(),
            director: String::new(),
            tags: String::new(),
        };
        item.refresh_tags();
        item
    }

    pub fn with_genres(mut self, genres: impl Into<String>) -> Self {
        self.genres = genres.into();
        self.refresh_tags();
        self
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = keywords.into();
        self.refresh_tags();
        self
    }

    pub fn with_cast(mut self, cast: impl Into<String>) -> Self {
        self.cast = cast.into();
        self.refresh_tags();
        self
    }

    pub fn with_director(mut self, director: impl Into<String>) -> Self {
        self.director = director.into();
        self.refresh_tags();
        self
    }

    pub fn with_tagline(mut self, tagline: impl Into<String>) -> Self {
        self.tagline = tagline.into();
        self.refresh_tags();
        self
    }

    /// Recomputes `tags` from the descriptive fields.
    pub fn refresh_tags(&mut self) {
        self.tags = crate::utils::build_tags(&[
            &self.overview,
            &self.tagline,
            &self.genres,
            &self.keywords,
            &self.cast,
            &self.director,
        ]);
    }
}

/// Which resolver stage matched a title query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    CaseInsensitive,
    Fuzzy { distance: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub index: usize,
    pub matched_by: MatchKind,
}

/// A corpus row and its similarity to the query item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item: Item,
    pub score: f32,
}

/// Result of a recommendation query that did not fault.
///
/// `NotFound` and `Found` with no neighbors are distinct end states even
/// though presentation may render both as "no results".
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    NotFound,
    Found {
        source: usize,
        matched_by: MatchKind,
        neighbors: Vec<ScoredItem>,
    },
}

impl Outcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found { .. })
    }

    pub fn into_items(self) -> Vec<Item> {
        match self {
            Outcome::NotFound => Vec::new(),
            Outcome::Found { neighbors, .. } => neighbors.into_iter().map(|n| n.item).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub title: String,
    pub num_recommendations: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub found: bool,
    pub query: String,
    pub matched_title: Option<String>,
    pub matched_by: Option<MatchKind>,
    pub recommendations: Vec<RecommendationItem>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub id: u64,
    pub title: String,
    pub overview: String,
    pub score: f32,
    pub poster_url: Option<String>,
}

impl RecommendationItem {
    pub fn from_scored(scored: &ScoredItem) -> Self {
        Self {
            id: scored.item.id,
            title: scored.item.title.clone(),
            overview: scored.item.overview.clone(),
            score: scored.score,
            poster_url: None,
        }
    }

    pub fn with_poster(mut self, url: String) -> Self {
        self.poster_url = Some(url);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub items: usize,
    pub vocabulary_size: usize,
    pub index_kind: String,
    pub cached_queries: usize,
    pub built_at: DateTime<Utc>,
    pub build_millis: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_follow_descriptive_fields() {
        let item = Item::new(1, "Alien", "In  space,\nno one CAN hear")
            .with_genres("Horror Science Fiction")
            .with_director("Ridley Scott");

        assert_eq!(
            item.tags,
            "in space, no one can hear horror science fiction ridley scott"
        );
    }

    #[test]
    fn not_found_and_empty_found_are_distinct() {
        let empty = Outcome::Found {
            source: 0,
            matched_by: MatchKind::Exact,
            neighbors: Vec::new(),
        };
        assert!(empty.is_found());
        assert!(!Outcome::NotFound.is_found());
        assert_ne!(empty, Outcome::NotFound);
        assert!(empty.into_items().is_empty());
    }
}
