pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{BuildError, CorpusLoadError, IndexError, QueryError};
pub use models::*;
pub use services::corpus::Corpus;
pub use services::recommendation::Recommender;

use anyhow::Result;
use services::poster::{poster_lookup, PosterLookup};
use services::serving::ServingService;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub serving_service: Arc<ServingService>,
}

impl AppState {
    /// Builds the recommender up front; a corpus that fails to load is fatal.
    pub async fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        let poster = poster_lookup(&config.poster)?;
        info!("Poster lookups use the {} source", poster.kind());
        let serving_service = Arc::new(ServingService::new(config.clone(), poster));
        serving_service.recommender().await?;

        Ok(Self {
            config,
            serving_service,
        })
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
