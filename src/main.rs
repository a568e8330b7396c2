mod aggregate;
mod config;
mod filter;
mod models;
mod presentation;
mod routes;
mod source;

#[cfg(not(unix))]
use std::future;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Extension, Router};
use clap::Parser;
use config::{Cli, Config};
use tokio::{net::TcpListener, signal};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{load_config, load_dotenv},
    filter::FilterOptions,
    models::Incident,
    routes::{
        filters, heatmap_chart, index, monthly_chart, provider_chart, recent_incidents, status_chart, summary,
        timeline_chart,
    },
    source::DataSource,
};

/// Everything a request needs; the incident table never changes once built.
#[derive(Clone)]
struct AppContext {
    config: Config,
    incidents: Arc<[Incident]>,
    options: Arc<FilterOptions>,
}

impl AppContext {
    fn new(config: Config, incidents: Vec<Incident>) -> Self {
        let options = Arc::new(FilterOptions::from_incidents(&incidents));
        AppContext { config, incidents: incidents.into(), options }
    }
}

fn app(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/filters", get(filters))
        .route("/api/summary", get(summary))
        .route("/api/charts/status", get(status_chart))
        .route("/api/charts/heatmap", get(heatmap_chart))
        .route("/api/charts/timeline", get(timeline_chart))
        .route("/api/charts/monthly", get(monthly_chart))
        .route("/api/charts/providers", get(provider_chart))
        .route("/api/incidents/recent", get(recent_incidents))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(Extension(ctx))
}

async fn start_api(ctx: AppContext) -> anyhow::Result<()> {
    let bind = ctx.config.api.bind();
    let listener = TcpListener::bind(&bind).await.with_context(|| format!("cannot bind {bind}"))?;
    info!("dashboard is running on http://{bind}");

    axum::serve(listener, app(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // before tracing, so RUST_LOG may come from .env
    let dotenv = load_dotenv(".env");
    init_tracing(cli.debug);
    match dotenv {
        Ok(Some(path)) => debug!(path = %path.display(), "loaded .env"),
        Ok(None) => {}
        Err(err) => warn!(%err, "ignoring unreadable .env"),
    }

    let config = load_config(&cli).await?;
    info!(
        url = %config.directus.url,
        collection = %config.directus.collection,
        refresh_interval = ?config.directus.refresh_interval,
        "loading incidents"
    );

    // blocks until the fetch returns or fails; a failure leaves an empty table
    let incidents = DataSource::new(&config.directus).load().await;

    start_api(AppContext::new(config, incidents)).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tracing::{subscriber::Subscriber, Event};
    use tracing_subscriber::{layer::Context, prelude::*, Layer};

    use super::*;

    #[derive(Clone, Default)]
    struct Recorded(Arc<Mutex<Vec<(Level, String)>>>);

    impl<S: Subscriber> Layer<S> for Recorded {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let meta = event.metadata();
            self.0.lock().unwrap().push((*meta.level(), meta.target().to_string()));
        }
    }

    #[tokio::test]
    async fn requests_are_logged_at_info() {
        let recorded = Recorded::default();
        let _guard = tracing_subscriber::registry().with(recorded.clone()).set_default();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app(AppContext::new(Config::default(), Vec::new()))).await.unwrap() });

        let res = reqwest::get(format!("http://{addr}/api/summary")).await.unwrap();
        assert!(res.status().is_success());

        let events = recorded.0.lock().unwrap();
        assert!(
            events.iter().any(|(level, target)| *level == Level::INFO && target.starts_with("tower_http::trace")),
            "no info-level request event in {events:?}"
        );
    }
}
