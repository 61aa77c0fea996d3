use std::sync::Arc;

use anyhow::{Context, Result};
use facegated::routes::{verify_router, AppState, VerifyState};
use facegated::{server, Config, Reference, Service};

#[tokio::main]
async fn main() -> Result<()> {
    server::init_tracing();

    let config = Config::from_env(Service::Verify)?;
    config.validate()?;
    tracing::info!(
        model = %config.model,
        metric = %config.metric,
        confidence_threshold = config.confidence_threshold,
        "facegate-verify starting"
    );

    let reference = Reference::load(&config.reference_image, config.target_width)
        .with_context(|| format!("loading reference image {}", config.reference_image.display()))?;
    let engine = server::start_engine(&config)?;

    let state = VerifyState {
        app: AppState::new(engine, config.clone()),
        reference: Arc::new(reference),
    };
    server::serve(verify_router(state), &config).await
}
