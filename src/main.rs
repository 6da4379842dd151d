use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use movierec::utils::validation::validate_recommendation_request;
use movierec::{init_tracing, AppState, Config, QueryError, RecommendationRequest, RecommendationResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve movie recommendations over HTTP", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Overrides `corpus.path` from the config file.
    #[arg(long)]
    corpus: Option<std::path::PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RecommendationQuery {
    title: String,
    num: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TitleQuery {
    prefix: String,
    limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<T>>)>;

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    let ready = state.serving_service.is_ready();
    status.insert("status".to_string(), if ready { "healthy" } else { "building" }.to_string());
    status.insert("service".to_string(), "movierec".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());

    Json(ApiResponse::success(status))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Query(params): Query<RecommendationQuery>,
) -> ApiResult<RecommendationResponse> {
    let request = RecommendationRequest {
        title: params.title,
        num_recommendations: params.num,
    };

    if let Err(e) = validate_recommendation_request(&request, state.config.recommendation.max_count) {
        return Err((StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string()))));
    }

    match state.serving_service.serve_recommendations(&request).await {
        Ok(response) if response.found => Ok(Json(ApiResponse::success(response))),
        Ok(response) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse {
                success: false,
                message: format!("No movie titled {:?}", response.query),
                data: Some(response),
            }),
        )),
        Err(QueryError::InvalidCount) => Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(QueryError::InvalidCount.to_string())),
        )),
        Err(e) => {
            tracing::error!("Failed to get recommendations: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Recommendations are unavailable".to_string())),
            ))
        }
    }
}

async fn get_titles(State(state): State<AppState>, Query(params): Query<TitleQuery>) -> ApiResult<Vec<String>> {
    let limit = params.limit.unwrap_or(10).min(100);
    match state.serving_service.suggest_titles(&params.prefix, limit).await {
        Ok(titles) => Ok(Json(ApiResponse::success(titles))),
        Err(e) => {
            tracing::error!("Failed to suggest titles: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Titles are unavailable".to_string())),
            ))
        }
    }
}

async fn get_stats(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    let serving = state.serving_service.get_serving_stats();
    match state.serving_service.recommender().await {
        Ok(recommender) => Ok(Json(ApiResponse::success(serde_json::json!({
            "index": recommender.stats(),
            "serving": serving,
        })))),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        )),
    }
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/recommendations", get(get_recommendations))
        .route("/titles", get(get_titles))
        .route("/stats", get(get_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let mut config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };
    if let Some(corpus) = args.corpus {
        config.corpus.path = corpus;
    }
    config.validate()?;

    info!("Starting movierec server with config: {:?}", config.server);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers)
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = config.server.socket_addr()?;

    let state = AppState::new(config).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
