//! Quiz Rush Back binary entrypoint wiring the REST, WebSocket, and upstream layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dto;
mod error;
mod routes;
mod services;
mod state;
mod upstream;

#[cfg(test)]
mod testing;

use config::AppConfig;
use services::catalog_service;
use state::AppState;
use upstream::{AcceptAll, HttpEventCatalog, HttpPointsSink, HttpQuestionBank};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let client = reqwest::Client::builder()
        .build()
        .context("building http client")?;

    let events_api = Arc::new(HttpEventCatalog::new(
        client.clone(),
        &config.catalog_base_url,
    ));
    let questions_api = Arc::new(HttpQuestionBank::new(
        client.clone(),
        &config.question_bank_base_url,
    ));
    let points_api = Arc::new(HttpPointsSink::new(client, &config.points_base_url));

    let app_state = AppState::new(
        config,
        events_api,
        questions_api,
        points_api,
        Arc::new(AcceptAll),
    );

    // One-shot bootstrap: fetch the catalog and schedule the first event.
    tokio::spawn(catalog_service::run_catalog_bootstrap(app_state.clone()));

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: state::SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
