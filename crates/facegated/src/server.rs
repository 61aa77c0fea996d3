//! Process wiring shared by both service binaries.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use facegate_core::OnnxFaceEngine;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::engine::{spawn_engine, EngineHandle};
use crate::pipeline::PipelineSettings;

/// Install the global `tracing` subscriber (`RUST_LOG`, default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Load the ONNX models and move them onto the engine thread.
///
/// Fails fast if a model file is missing or unloadable.
pub fn start_engine(config: &Config) -> Result<EngineHandle> {
    let engine = OnnxFaceEngine::load(&config.model_dir, config.model, config.detector)
        .with_context(|| format!("loading models from {}", config.model_dir.display()))?;
    let handle = spawn_engine(engine, PipelineSettings::from(config), config.engine_queue)
        .context("spawning engine thread")?;
    Ok(handle)
}

/// Bind `config.bind_addr()` and serve `router` until Ctrl-C.
pub async fn serve(router: Router, config: &Config) -> Result<()> {
    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_addr()))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(service = config.service.name(), %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!(service = config.service.name(), "stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        return;
    }
    tracing::info!("shutting down");
}
