use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::catalog::{KeywordCatalog, PresetInfo};
use crate::config::{DigestConfig, FilterRule};
use crate::digest::{build_digest, DigestOutcome, PassThrough, Translator};
use crate::filter::FilterEngine;
use crate::ingest::presets::google_news_presets_list;
use crate::ingest::types::FeedFetcher;
use crate::ingest::MAX_FETCH_WINDOW_HOURS;
use crate::news::{FeedSource, FilterMode, NewsItem};
use crate::notify::{parse_recipient, EmailSender};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<KeywordCatalog>,
    pub fetcher: Arc<dyn FeedFetcher>,
    pub translator: Arc<dyn Translator>,
    pub mailer: Option<Arc<EmailSender>>,
    /// Loaded digest configuration, run by `POST /digest/run`.
    pub config: Arc<DigestConfig>,
}

impl AppState {
    pub fn new(catalog: KeywordCatalog, fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            catalog: Arc::new(catalog),
            fetcher,
            translator: Arc::new(PassThrough),
            mailer: None,
            config: Arc::new(DigestConfig::default()),
        }
    }

    pub fn with_config(mut self, config: DigestConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_mailer(mut self, mailer: Option<EmailSender>) -> Self {
        self.mailer = mailer.map(Arc::new);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/filter-presets", get(filter_presets))
        .route("/source-presets", get(source_presets))
        .route("/filter/preview", post(filter_preview))
        .route("/digest/preview", post(digest_preview))
        .route("/digest/send", post(digest_send))
        .route("/digest/run", post(digest_run))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// JSON error body `{ "error": ... }` with a status code.
#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

fn parse_mode(raw: &str) -> Result<FilterMode, ApiError> {
    raw.parse::<FilterMode>()
        .map_err(|e| ApiError(StatusCode::BAD_REQUEST, e.to_string()))
}

async fn filter_presets(State(state): State<AppState>) -> Json<Vec<PresetInfo>> {
    Json(state.catalog.categories())
}

async fn source_presets() -> Json<Vec<PresetInfo>> {
    Json(google_news_presets_list())
}

#[derive(Deserialize)]
struct FilterPreviewReq {
    #[serde(default)]
    items: Vec<NewsItem>,
    mode: String,
    #[serde(default)]
    categories: Vec<String>,
}

async fn filter_preview(
    State(state): State<AppState>,
    Json(body): Json<FilterPreviewReq>,
) -> Result<Json<Vec<NewsItem>>, ApiError> {
    let mode = parse_mode(&body.mode)?;
    let kept = FilterEngine::new(&state.catalog).filter(body.items, mode, &body.categories);
    Ok(Json(kept))
}

#[derive(Deserialize)]
struct DigestReq {
    #[serde(default)]
    sources: Vec<FeedSource>,
    mode: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    fetch_window_hours: u64,
    #[serde(default)]
    to: Option<String>,
}

impl DigestReq {
    fn to_config(&self) -> Result<DigestConfig, ApiError> {
        if self.fetch_window_hours > MAX_FETCH_WINDOW_HOURS {
            return Err(ApiError(
                StatusCode::BAD_REQUEST,
                format!("fetch_window_hours must be at most {MAX_FETCH_WINDOW_HOURS}"),
            ));
        }
        Ok(DigestConfig {
            sources: self.sources.clone(),
            filter: FilterRule {
                mode: parse_mode(&self.mode)?,
                categories: self.categories.clone(),
            },
            fetch_window_hours: self.fetch_window_hours,
            recipients: self.to.iter().cloned().collect(),
        })
    }
}

async fn run_digest(state: &AppState, cfg: &DigestConfig) -> DigestOutcome {
    build_digest(
        state.fetcher.as_ref(),
        state.translator.as_ref(),
        &state.catalog,
        cfg,
    )
    .await
}

async fn digest_preview(
    State(state): State<AppState>,
    Json(body): Json<DigestReq>,
) -> Result<Json<DigestOutcome>, ApiError> {
    let cfg = body.to_config()?;
    Ok(Json(run_digest(&state, &cfg).await))
}

#[derive(Serialize)]
struct SendResp {
    sent_to: String,
    delivered: usize,
}

async fn digest_send(
    State(state): State<AppState>,
    Json(body): Json<DigestReq>,
) -> Result<Json<SendResp>, ApiError> {
    let to = body
        .to
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError(StatusCode::BAD_REQUEST, "missing 'to'".into()))?;
    parse_recipient(&to).map_err(|e| ApiError(StatusCode::BAD_REQUEST, format!("{e:#}")))?;
    let cfg = body.to_config()?;
    let Some(mailer) = state.mailer.clone() else {
        return Err(ApiError(
            StatusCode::SERVICE_UNAVAILABLE,
            "email delivery is not configured".into(),
        ));
    };

    let outcome = run_digest(&state, &cfg).await;
    mailer.send_digest(&to, &outcome.html).await.map_err(|e| {
        tracing::warn!(target: "digest", error = ?e, "digest email failed");
        ApiError(StatusCode::BAD_GATEWAY, format!("{e:#}"))
    })?;

    Ok(Json(SendResp {
        sent_to: to,
        delivered: outcome.stats.delivered,
    }))
}

#[derive(Serialize)]
struct RunResp {
    sent_to: Vec<String>,
    failed: Vec<String>,
    delivered: usize,
}

/// Build the configured digest once and mail it to every configured recipient.
async fn digest_run(State(state): State<AppState>) -> Result<Json<RunResp>, ApiError> {
    let cfg = state.config.clone();
    if cfg.recipients.is_empty() {
        return Err(ApiError(
            StatusCode::BAD_REQUEST,
            "no recipients configured".into(),
        ));
    }
    let Some(mailer) = state.mailer.clone() else {
        return Err(ApiError(
            StatusCode::SERVICE_UNAVAILABLE,
            "email delivery is not configured".into(),
        ));
    };

    let outcome = run_digest(&state, &cfg).await;
    let mut sent_to = Vec::new();
    let mut failed = Vec::new();
    for to in &cfg.recipients {
        match mailer.send_digest(to, &outcome.html).await {
            Ok(()) => sent_to.push(to.clone()),
            Err(e) => {
                tracing::warn!(target: "digest", error = ?e, "digest email failed");
                failed.push(to.clone());
            }
        }
    }
    if sent_to.is_empty() {
        return Err(ApiError(
            StatusCode::BAD_GATEWAY,
            format!("delivery failed for {} recipient(s)", failed.len()),
        ));
    }

    Ok(Json(RunResp {
        sent_to,
        failed,
        delivered: outcome.stats.delivered,
    }))
}
