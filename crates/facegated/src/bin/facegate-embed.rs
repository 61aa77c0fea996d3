use anyhow::Result;
use facegated::routes::{embed_router, AppState};
use facegated::{server, Config, Service};

#[tokio::main]
async fn main() -> Result<()> {
    server::init_tracing();

    let config = Config::from_env(Service::Embed)?;
    config.validate()?;
    tracing::info!(
        model = %config.model,
        detector = %config.detector,
        target_width = config.target_width,
        "facegate-embed starting"
    );

    let engine = server::start_engine(&config)?;
    let router = embed_router(AppState::new(engine, config.clone()));
    server::serve(router, &config).await
}
