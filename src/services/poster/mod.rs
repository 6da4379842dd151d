use crate::config::PosterConfig;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// Maps a title to a poster image URL.
///
/// Lookups only decorate a finished recommendation; the recommender works
/// without any catalog behind them.
#[async_trait::async_trait]
pub trait PosterLookup: Send + Sync {
    fn kind(&self) -> &'static str;

    async fn poster_url(&self, title: &str) -> Result<String>;
}

/// Deterministic placeholder image, coloured by a hash of the title.
#[derive(Debug, Clone)]
pub struct PlaceholderPoster {
    base_url: String,
}

impl PlaceholderPoster {
    pub fn new(config: &PosterConfig) -> Self {
        Self {
            base_url: config.placeholder_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, title: &str) -> String {
        let hash = blake3::hash(title.as_bytes());
        let bytes = hash.as_bytes();
        format!(
            "{}/{:02x}{:02x}{:02x}/FFFFFF?text={}",
            self.base_url,
            bytes[0],
            bytes[1],
            bytes[2],
            title.trim().replace(' ', "+")
        )
    }
}

#[async_trait::async_trait]
impl PosterLookup for PlaceholderPoster {
    fn kind(&self) -> &'static str {
        "placeholder"
    }

    async fn poster_url(&self, title: &str) -> Result<String> {
        Ok(self.url_for(title))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    poster_path: Option<String>,
}

/// TMDb movie search; the poster of the first hit wins.
pub struct TmdbPoster {
    client: reqwest::Client,
    api_key: String,
    search_url: String,
}

impl TmdbPoster {
    pub fn new(api_key: &str, config: &PosterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.lookup_timeout())
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            search_url: format!("{}/search/movie", config.api_base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait::async_trait]
impl PosterLookup for TmdbPoster {
    fn kind(&self) -> &'static str {
        "tmdb"
    }

    async fn poster_url(&self, title: &str) -> Result<String> {
        let response: SearchResponse = self
            .client
            .get(&self.search_url)
            .query(&[("api_key", self.api_key.as_str()), ("query", title)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        first_poster(&response).ok_or_else(|| anyhow!("no poster found for {:?}", title))
    }
}

fn first_poster(response: &SearchResponse) -> Option<String> {
    response
        .results
        .first()?
        .poster_path
        .as_deref()
        .and_then(tmdb_poster_url)
}

/// Full image URL for a catalog `poster_path` such as `/abc.jpg`.
pub fn tmdb_poster_url(poster_path: &str) -> Option<String> {
    let path = poster_path.trim();
    if path.is_empty() {
        None
    } else if path.starts_with('/') {
        Some(format!("{TMDB_IMAGE_BASE}{path}"))
    } else {
        Some(format!("{TMDB_IMAGE_BASE}/{path}"))
    }
}

/// The catalog lookup when an API key is configured, placeholders otherwise.
pub fn poster_lookup(config: &PosterConfig) -> Result<Arc<dyn PosterLookup>> {
    match config.api_key() {
        Some(key) => Ok(Arc::new(TmdbPoster::new(key, config)?)),
        None => Ok(Arc::new(PlaceholderPoster::new(config))),
    }
}

/// Looks a poster up and falls back to the placeholder on any error or once
/// `timeout` has passed.
pub async fn poster_or_placeholder(
    lookup: &dyn PosterLookup,
    fallback: &PlaceholderPoster,
    title: &str,
    timeout: Duration,
) -> String {
    match tokio::time::timeout(timeout, lookup.poster_url(title)).await {
        Ok(Ok(url)) => url,
        Ok(Err(e)) => {
            debug!("Poster lookup for {:?} failed, using placeholder: {}", title, e);
            fallback.url_for(title)
        }
        Err(_) => {
            warn!("Poster lookup for {:?} timed out after {:?}", title, timeout);
            fallback.url_for(title)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingLookup;

    #[async_trait::async_trait]
    impl PosterLookup for FailingLookup {
        fn kind(&self) -> &'static str {
            "failing"
        }

        async fn poster_url(&self, _title: &str) -> Result<String> {
            Err(anyhow::anyhow!("catalog unavailable"))
        }
    }

    struct StalledLookup;

    #[async_trait::async_trait]
    impl PosterLookup for StalledLookup {
        fn kind(&self) -> &'static str {
            "stalled"
        }

        async fn poster_url(&self, _title: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("https://example.invalid/too-late.jpg".to_string())
        }
    }

    #[test]
    fn placeholder_is_deterministic() {
        let poster = PlaceholderPoster::new(&PosterConfig::default());
        let url = poster.url_for("The Dark Knight");
        assert_eq!(url, poster.url_for("The Dark Knight"));
        assert!(url.starts_with("https://via.placeholder.com/300x450/"));
        assert!(url.ends_with("/FFFFFF?text=The+Dark+Knight"));
        assert_ne!(url, poster.url_for("Heat"));
    }

    #[test]
    fn tmdb_paths() {
        assert_eq!(
            tmdb_poster_url("/kqjL17yufvn9OVLyXYpvtyrFfak.jpg").as_deref(),
            Some("https://image.tmdb.org/t/p/w500/kqjL17yufvn9OVLyXYpvtyrFfak.jpg")
        );
        assert_eq!(tmdb_poster_url("  "), None);
    }

    #[test]
    fn search_response_takes_first_hit() {
        let parse = |body: &str| first_poster(&serde_json::from_str::<SearchResponse>(body).unwrap());

        assert_eq!(
            parse(r#"{"page": 1, "results": [{"id": 19995, "poster_path": "/avatar.jpg"}, {"poster_path": "/other.jpg"}]}"#)
                .as_deref(),
            Some("https://image.tmdb.org/t/p/w500/avatar.jpg")
        );
        assert_eq!(parse(r#"{"results": [{"poster_path": null}, {"poster_path": "/b.jpg"}]}"#), None);
        assert_eq!(parse(r#"{"results": []}"#), None);
        assert_eq!(parse(r#"{"status_message": "Invalid API key"}"#), None);
    }

    #[test]
    fn catalog_lookup_needs_a_real_key() {
        let mut config = PosterConfig::default();
        assert_eq!(poster_lookup(&config).unwrap().kind(), "placeholder");

        config.api_key = Some(crate::config::API_KEY_SENTINEL.to_string());
        assert_eq!(poster_lookup(&config).unwrap().kind(), "placeholder");

        config.api_key = Some("abc123".to_string());
        assert_eq!(poster_lookup(&config).unwrap().kind(), "tmdb");
    }

    #[tokio::test]
    async fn failures_fall_back_to_placeholder() {
        let fallback = PlaceholderPoster::new(&PosterConfig::default());
        let timeout = Duration::from_secs(1);
        let url = poster_or_placeholder(&FailingLookup, &fallback, "Heat", timeout).await;
        assert_eq!(url, fallback.url_for("Heat"));

        let url = poster_or_placeholder(&fallback, &fallback, "Heat", timeout).await;
        assert_eq!(url, fallback.url_for("Heat"));
    }

    #[tokio::test]
    async fn slow_lookups_are_cut_off() {
        let fallback = PlaceholderPoster::new(&PosterConfig::default());
        let start = std::time::Instant::now();
        let url = poster_or_placeholder(&StalledLookup, &fallback, "Heat", Duration::from_millis(20)).await;
        assert_eq!(url, fallback.url_for("Heat"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn placeholder_lookup_never_fails() {
        let poster = PlaceholderPoster::new(&PosterConfig::default());
        let url = tokio_test::block_on(poster.poster_url("Aliens")).unwrap();
        assert_eq!(url, poster.url_for("Aliens"));
    }
}
