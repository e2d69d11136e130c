//! News digest service: binary entrypoint.
//! Boots the Axum HTTP server, wiring the keyword catalog, feed fetcher,
//! optional SMTP sender and Prometheus metrics.

use std::sync::Arc;

use news_digest::api::{self, AppState};
use news_digest::catalog::KeywordCatalog;
use news_digest::config::load_digest_config_default;
use news_digest::ingest::rss::RssFetcher;
use news_digest::metrics::Metrics;
use news_digest::notify::EmailSender;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - DIGEST_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("DIGEST_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("filter=info,ingest=info,digest=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let catalog = KeywordCatalog::load_default()?;
    let fetcher = RssFetcher::http()?;
    let mailer = EmailSender::from_env()?;
    if mailer.is_none() {
        tracing::warn!("SMTP_HOST not set (or 'skip'); /digest/send is disabled");
    }

    let config = load_digest_config_default()?;
    tracing::info!(
        target: "digest",
        sources = config.sources.len(),
        recipients = config.recipients.len(),
        mode = %config.filter.mode,
        "digest config loaded"
    );

    let state = AppState::new(catalog, Arc::new(fetcher))
        .with_mailer(mailer)
        .with_config(config);
    let mut router = api::router(state);

    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics disabled"),
    }

    Ok(router.into())
}
