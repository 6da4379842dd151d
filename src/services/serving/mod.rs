use crate::config::Config;
use crate::error::{BuildError, QueryError};
use crate::models::*;
use crate::services::poster::{poster_or_placeholder, PlaceholderPoster, PosterLookup};
use crate::services::recommendation::Recommender;
use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Async front of the recommender.
///
/// The one-time build runs on a blocking thread. Callers that arrive while it
/// is in progress wait on the same cell, so nobody sees a partial model. A
/// failed build leaves the cell empty and is reported to the caller that ran it.
pub struct ServingService {
    config: Arc<Config>,
    recommender: OnceCell<Arc<Recommender>>,
    poster: Arc<dyn PosterLookup>,
    placeholder: PlaceholderPoster,
    serving_stats: DashMap<String, u64>,
}

impl ServingService {
    pub fn new(config: Arc<Config>, poster: Arc<dyn PosterLookup>) -> Self {
        Self::with_cell(config, OnceCell::new(), poster)
    }

    pub fn with_recommender(config: Arc<Config>, recommender: Arc<Recommender>, poster: Arc<dyn PosterLookup>) -> Self {
        Self::with_cell(config, OnceCell::from(recommender), poster)
    }

    fn with_cell(config: Arc<Config>, recommender: OnceCell<Arc<Recommender>>, poster: Arc<dyn PosterLookup>) -> Self {
        let placeholder = PlaceholderPoster::new(&config.poster);
        Self {
            config,
            recommender,
            poster,
            placeholder,
            serving_stats: DashMap::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.recommender.initialized()
    }

    /// Returns the built recommender, building it on first use.
    pub async fn recommender(&self) -> Result<Arc<Recommender>, BuildError> {
        self.recommender
            .get_or_try_init(|| async {
                let config = self.config.clone();
                info!("Building recommender from {}", config.corpus.path.display());
                let recommender = tokio::task::spawn_blocking(move || Recommender::from_config(config))
                    .await
                    .map_err(|e| BuildError::Task(e.to_string()))??;
                Ok::<_, BuildError>(Arc::new(recommender))
            })
            .await
            .cloned()
    }

    pub async fn serve_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, QueryError> {
        self.increment_stat("total_requests");
        let start_time = std::time::Instant::now();

        let recommender = self.recommender().await.map_err(|e| {
            self.increment_stat("failed_requests");
            QueryError::InternalFault(e.to_string())
        })?;

        let num = request
            .num_recommendations
            .unwrap_or(self.config.recommendation.default_count);
        let outcome = match recommender.try_recommend(&request.title, num) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to get recommendations for {:?}: {}", request.title, e);
                self.increment_stat("failed_requests");
                return Err(e);
            }
        };

        let response = match outcome {
            Outcome::NotFound => {
                self.increment_stat("not_found_requests");
                RecommendationResponse {
                    found: false,
                    query: request.title.clone(),
                    matched_title: None,
                    matched_by: None,
                    recommendations: Vec::new(),
                    generated_at: Utc::now(),
                }
            }
            Outcome::Found {
                source,
                matched_by,
                neighbors,
            } => {
                let recommendations = self.attach_posters(&neighbors).await;
                RecommendationResponse {
                    found: true,
                    query: request.title.clone(),
                    matched_title: recommender.item(source).map(|item| item.title.clone()),
                    matched_by: Some(matched_by),
                    recommendations,
                    generated_at: Utc::now(),
                }
            }
        };

        let latency = start_time.elapsed().as_millis() as u64;
        self.update_latency_stat(latency);
        self.increment_stat("successful_requests");
        info!(
            "Served {} recommendations for {:?} in {}ms",
            response.recommendations.len(),
            request.title,
            latency
        );

        Ok(response)
    }

    /// Each lookup is bounded by `poster.lookup_timeout_ms`, so a slow catalog
    /// delays a response by at most one timeout.
    async fn attach_posters(&self, neighbors: &[ScoredItem]) -> Vec<RecommendationItem> {
        let timeout = self.config.poster.lookup_timeout();
        let urls = join_all(
            neighbors
                .iter()
                .map(|n| poster_or_placeholder(self.poster.as_ref(), &self.placeholder, &n.item.title, timeout)),
        )
        .await;

        neighbors
            .iter()
            .zip(urls)
            .map(|(n, url)| RecommendationItem::from_scored(n).with_poster(url))
            .collect()
    }

    pub async fn suggest_titles(&self, prefix: &str, limit: usize) -> Result<Vec<String>, BuildError> {
        let recommender = self.recommender().await?;
        Ok(recommender
            .suggest(prefix, limit)
            .into_iter()
            .map(|item| item.title.clone())
            .collect())
    }

    fn increment_stat(&self, key: &str) {
        *self.serving_stats.entry(key.to_string()).or_insert(0) += 1;
    }

    fn update_latency_stat(&self, latency_ms: u64) {
        *self.serving_stats.entry("total_latency_ms".to_string()).or_insert(0) += latency_ms;
        let mut max = self.serving_stats.entry("max_latency_ms".to_string()).or_insert(0);
        if latency_ms > *max {
            *max = latency_ms;
        }
    }

    pub fn get_serving_stats(&self) -> HashMap<String, u64> {
        self.serving_stats
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn reset_stats(&self) {
        self.serving_stats.clear();
    }
}
