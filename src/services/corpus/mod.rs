//! Corpus loading.
//!
//! Reads CSV or JSON item records into a fixed-shape [`Item`] table. Rows with
//! an empty or whitespace-only title are dropped and counted; every missing
//! descriptive field becomes an empty string.

use crate::config::CorpusConfig;
use crate::error::CorpusLoadError;
use crate::models::Item;
use crate::utils::validation::validate_item;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    items: Vec<Item>,
}

#[derive(Debug, Default)]
struct RawRecord {
    id: Option<u64>,
    title: String,
    overview: String,
    tagline: String,
    genres: String,
    keywords: String,
    cast: String,
    director: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Csv,
    Json,
}

impl Corpus {
    /// Builds a corpus from in-memory items, dropping untitled ones.
    pub fn from_items(items: Vec<Item>) -> Self {
        let before = items.len();
        let items: Vec<Item> = items
            .into_iter()
            .filter(|item| validate_item(item).is_ok())
            .map(|mut item| {
                item.refresh_tags();
                item
            })
            .collect();

        let dropped = before - items.len();
        if dropped > 0 {
            warn!("Dropped {} items with an empty title", dropped);
        }

        Self { items }
    }

    pub fn load(path: &Path, config: &CorpusConfig) -> Result<Self, CorpusLoadError> {
        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Format::Csv,
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => {
                return Err(CorpusLoadError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        let contents = std::fs::read_to_string(path).map_err(|source| CorpusLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let records = match format {
            Format::Csv => parse_csv(path, &contents, config)?,
            Format::Json => parse_json(path, &contents, config)?,
        };

        let corpus = Self::from_records(records)?;
        info!("Loaded {} items from {}", corpus.len(), path.display());
        Ok(corpus)
    }

    /// Rows without an id are numbered after the largest explicit id, so a
    /// sparse id column never collides with a generated one. With no explicit
    /// ids at all, ids are the post-filter row index.
    fn from_records(records: Vec<RawRecord>) -> Result<Self, CorpusLoadError> {
        let total = records.len();
        let mut seen = HashSet::with_capacity(total);
        let mut items = Vec::with_capacity(total);
        let mut next_id = records
            .iter()
            .filter(|record| !record.title.trim().is_empty())
            .filter_map(|record| record.id)
            .max()
            .map_or(0, |max| max.saturating_add(1));

        for (row, record) in records.into_iter().enumerate() {
            if record.title.trim().is_empty() {
                continue;
            }

            let id = match record.id {
                Some(id) => id,
                None => {
                    let id = next_id;
                    next_id = next_id.saturating_add(1);
                    id
                }
            };
            if !seen.insert(id) {
                return Err(CorpusLoadError::DuplicateId { row: row + 1, id });
            }

            let item = Item::new(id, record.title.trim(), record.overview)
                .with_tagline(record.tagline)
                .with_genres(record.genres)
                .with_keywords(record.keywords)
                .with_cast(record.cast)
                .with_director(record.director);
            items.push(item);
        }

        let dropped = total - items.len();
        if dropped > 0 {
            warn!("Dropped {} of {} rows with an empty title", dropped, total);
        }

        Ok(Self { items })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// blake3 over every item's id, title and tags, in corpus order.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for item in &self.items {
            hasher.update(&item.id.to_le_bytes());
            hasher.update(item.title.as_bytes());
            hasher.update(&[0]);
            hasher.update(item.tags.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn parse_csv(path: &Path, contents: &str, config: &CorpusConfig) -> Result<Vec<RawRecord>, CorpusLoadError> {
    let csv_error = |source: csv::Error| CorpusLoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(contents.as_bytes());

    let headers = reader.headers().map_err(csv_error)?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let title_col = column("title").ok_or_else(|| CorpusLoadError::MissingTitleColumn {
        path: path.to_path_buf(),
    })?;
    let id_col = column("id");
    let overview_col = column("overview");
    let tagline_col = column("tagline");
    let genres_col = column("genres");
    let keywords_col = column("keywords");
    let cast_col = column("cast");
    let director_col = column("director");
    let crew_col = column("crew");

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(csv_error)?;
        let field = |col: Option<usize>| col.and_then(|c| record.get(c)).unwrap_or("");

        let id = match field(id_col).trim() {
            "" => None,
            raw => Some(raw.parse::<u64>().map_err(|_| CorpusLoadError::InvalidId {
                row: row + 1,
                value: raw.to_string(),
            })?),
        };

        let director = match director_col {
            Some(_) => flatten_text(field(director_col), None),
            None => directors_from_crew(field(crew_col)),
        };

        records.push(RawRecord {
            id,
            title: field(Some(title_col)).to_string(),
            overview: field(overview_col).to_string(),
            tagline: field(tagline_col).to_string(),
            genres: flatten_text(field(genres_col), None),
            keywords: flatten_text(field(keywords_col), None),
            cast: flatten_text(field(cast_col), Some(config.max_cast)),
            director,
        });
    }

    Ok(records)
}

fn parse_json(path: &Path, contents: &str, config: &CorpusConfig) -> Result<Vec<RawRecord>, CorpusLoadError> {
    let rows: Vec<serde_json::Map<String, Value>> =
        serde_json::from_str(contents).map_err(|source| CorpusLoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    rows.into_iter()
        .enumerate()
        .map(|(row, object)| {
            let text = |key: &str, limit: Option<usize>| {
                object.get(key).map(|v| flatten_value(v, limit)).unwrap_or_default()
            };

            let id = match object.get("id") {
                None | Some(Value::Null) => None,
                Some(Value::Number(n)) => Some(n.as_u64().ok_or_else(|| CorpusLoadError::InvalidId {
                    row: row + 1,
                    value: n.to_string(),
                })?),
                Some(Value::String(s)) if s.trim().is_empty() => None,
                Some(Value::String(s)) => Some(s.trim().parse::<u64>().map_err(|_| {
                    CorpusLoadError::InvalidId {
                        row: row + 1,
                        value: s.clone(),
                    }
                })?),
                Some(other) => {
                    return Err(CorpusLoadError::InvalidId {
                        row: row + 1,
                        value: other.to_string(),
                    })
                }
            };

            let director = if object.contains_key("director") {
                text("director", None)
            } else {
                object.get("crew").map(directors_from_value).unwrap_or_default()
            };

            Ok(RawRecord {
                id,
                title: text("title", None),
                overview: text("overview", None),
                tagline: text("tagline", None),
                genres: text("genres", None),
                keywords: text("keywords", None),
                cast: text("cast", Some(config.max_cast)),
                director,
            })
        })
        .collect()
}

/// Flattens a TMDb-style JSON list (`[{"name": ...}]` or `["..."]`) to
/// space-joined names. Anything else is returned as plain text.
pub fn flatten_text(raw: &str, limit: Option<usize>) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return flatten_value(&value, limit);
        }
    }
    trimmed.to_string()
}

fn flatten_value(value: &Value, limit: Option<usize>) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => flatten_text(s, limit),
        Value::Array(entries) => {
            let names = entries.iter().filter_map(|entry| match entry {
                Value::String(s) => Some(s.as_str()),
                Value::Object(map) => map.get("name").and_then(Value::as_str),
                _ => None,
            });
            match limit {
                Some(n) => names.take(n).collect::<Vec<_>>().join(" "),
                None => names.collect::<Vec<_>>().join(" "),
            }
        }
        other => other.to_string(),
    }
}

fn directors_from_crew(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) => directors_from_value(&value),
        Err(_) => String::new(),
    }
}

fn directors_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => directors_from_crew(s),
        Value::Array(entries) => entries
            .iter()
            .filter_map(Value::as_object)
            .filter(|member| member.get("job").and_then(Value::as_str) == Some("Director"))
            .filter_map(|member| member.get("name").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}
