use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use facegate_imaging::DiagnosticVerdict;
use thiserror::Error;

use crate::engine::DispatchError;
use crate::pipeline::PipelineError;
use crate::response::{EmbeddingResponse, VerifyResponse};

/// Why a request failed, independent of which endpoint it hit.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("no image field in request")]
    MissingInput,
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("no face detected ({verdict:?})")]
    NoFaceDetected { verdict: DiagnosticVerdict },
    #[error("engine error: {0}")]
    Engine(String),
    #[error("server error: {0}")]
    Server(String),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingInput | Self::InvalidImage(_) | Self::NoFaceDetected { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Engine(_) | Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log(&self) {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::info!(error = %self, "request rejected");
        }
    }
}

impl From<PipelineError> for RequestError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidImage(e) => Self::InvalidImage(e.to_string()),
            PipelineError::NoFace(verdict) => Self::NoFaceDetected { verdict },
            PipelineError::Engine(e) => Self::Engine(e.to_string()),
        }
    }
}

impl From<DispatchError> for RequestError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Pipeline(e) => e.into(),
            DispatchError::ChannelClosed => Self::Server("engine thread exited".to_string()),
        }
    }
}

/// A [`RequestError`] rendered in the embedding service's response shape.
#[derive(Debug)]
pub struct EmbedRejection(pub RequestError);

impl IntoResponse for EmbedRejection {
    fn into_response(self) -> Response {
        self.0.log();
        let message = match &self.0 {
            RequestError::MissingInput => "No image sent".to_string(),
            RequestError::InvalidImage(cause) => format!("Invalid image: {cause}"),
            RequestError::NoFaceDetected { verdict } => verdict.message().to_string(),
            RequestError::Engine(cause) => format!("AI Error: {cause}"),
            RequestError::Server(cause) => format!("Server Error: {cause}"),
        };
        (self.0.status(), Json(EmbeddingResponse::failure(message))).into_response()
    }
}

impl From<RequestError> for EmbedRejection {
    fn from(err: RequestError) -> Self {
        Self(err)
    }
}

impl From<DispatchError> for EmbedRejection {
    fn from(err: DispatchError) -> Self {
        Self(err.into())
    }
}

/// A [`RequestError`] rendered in the verify service's response shape.
#[derive(Debug)]
pub struct VerifyRejection(pub RequestError);

impl IntoResponse for VerifyRejection {
    fn into_response(self) -> Response {
        self.0.log();
        let message = match &self.0 {
            RequestError::MissingInput => "No image sent".to_string(),
            RequestError::InvalidImage(cause) => format!("Invalid image: {cause}"),
            RequestError::NoFaceDetected { verdict } => verdict.message().to_string(),
            RequestError::Engine(cause) | RequestError::Server(cause) => format!("Error: {cause}"),
        };
        (self.0.status(), Json(VerifyResponse::failure(message))).into_response()
    }
}

impl From<RequestError> for VerifyRejection {
    fn from(err: RequestError) -> Self {
        Self(err)
    }
}

impl From<DispatchError> for VerifyRejection {
    fn from(err: DispatchError) -> Self {
        Self(err.into())
    }
}
