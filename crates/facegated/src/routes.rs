//! HTTP routers for the embedding and verify services.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Json, Router};
use facegate_core::{DetectorBackend, DistanceMetric, EmbeddingModel};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::engine::EngineHandle;
use crate::error::{EmbedRejection, RequestError, VerifyRejection};
use crate::reference::{Reference, ReferenceInfo};
use crate::response::{decide, EmbeddingResponse, VerifyResponse};

/// Multipart field carrying the uploaded photo.
pub const IMAGE_FIELD: &str = "image";

/// Shared state of both services.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(engine: EngineHandle, config: Config) -> Self {
        Self {
            engine,
            config: Arc::new(config),
        }
    }
}

#[derive(Clone)]
pub struct VerifyState {
    pub app: AppState,
    pub reference: Arc<Reference>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub model: EmbeddingModel,
    pub embedding_dim: usize,
    pub detector: DetectorBackend,
    pub target_width: u32,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub verify: Option<VerifyStatus>,
}

#[derive(Debug, Serialize)]
pub struct VerifyStatus {
    pub metric: DistanceMetric,
    pub confidence_threshold: f32,
    pub reference: ReferenceInfo,
}

impl StatusResponse {
    fn new(state: &AppState) -> Self {
        let info = state.engine.model_info();
        Self {
            service: state.config.service.name(),
            version: env!("CARGO_PKG_VERSION"),
            model: info.model,
            embedding_dim: info.embedding_dim,
            detector: info.detector,
            target_width: state.config.target_width,
            verify: None,
        }
    }
}

/// `POST /generate-embedding` and `GET /status`.
pub fn embed_router(state: AppState) -> Router {
    let limit = state.config.max_upload_bytes;
    Router::new()
        .route("/generate-embedding", post(generate_embedding))
        .route("/status", get(embed_status))
        .with_state(state)
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
}

/// `POST /verify` and `GET /status`.
pub fn verify_router(state: VerifyState) -> Router {
    let limit = state.app.config.max_upload_bytes;
    Router::new()
        .route("/verify", post(verify))
        .route("/status", get(verify_status))
        .with_state(state)
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
}

/// Root span of every request, tagged with a fresh `request_id`.
fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %uuid::Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    )
}

async fn generate_embedding(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<EmbeddingResponse>, EmbedRejection> {
    let image = read_image(multipart).await?;
    let embedding = state.engine.represent(image).await?;
    tracing::info!(dim = embedding.len(), "embedding generated");
    Ok(Json(EmbeddingResponse::success(embedding)))
}

async fn verify(
    State(state): State<VerifyState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VerifyResponse>, VerifyRejection> {
    let image = read_image(multipart).await?;
    let verification = state
        .app
        .engine
        .verify(image, Arc::clone(&state.reference.frame))
        .await?;
    let decision = decide(&verification, state.app.config.confidence_threshold);
    tracing::info!(
        verified = decision.verified,
        engine_matched = verification.matched,
        distance = decision.distance,
        "verification decided"
    );
    Ok(Json(decision.into()))
}

async fn embed_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::new(&state))
}

async fn verify_status(State(state): State<VerifyState>) -> Json<StatusResponse> {
    let mut status = StatusResponse::new(&state.app);
    status.verify = Some(VerifyStatus {
        metric: state.app.config.metric,
        confidence_threshold: state.app.config.confidence_threshold,
        reference: state.reference.info.clone(),
    });
    Json(status)
}

/// Bytes of the `image` field. Requests without one are `MissingInput`.
async fn read_image(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Vec<u8>, RequestError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "not a multipart request");
        RequestError::MissingInput
    })?;

    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field.bytes().await.map_err(field_error)?;
            tracing::debug!(bytes = bytes.len(), "image received");
            return Ok(bytes.to_vec());
        }
    }
    Err(RequestError::MissingInput)
}

fn field_error(err: MultipartError) -> RequestError {
    if err.status().is_client_error() {
        RequestError::InvalidImage(err.body_text())
    } else {
        RequestError::Server(err.body_text())
    }
}
