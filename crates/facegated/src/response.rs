//! Response bodies and the verification decision.

use facegate_core::{Embedding, Verification};
use serde::Serialize;

/// Body of every `/generate-embedding` response.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingResponse {
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub message: String,
}

impl EmbeddingResponse {
    pub fn success(embedding: Embedding) -> Self {
        Self {
            status: true,
            embedding: Some(embedding.values),
            message: "Success".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            embedding: None,
            message: message.into(),
        }
    }
}

/// Body of every `/verify` response.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl VerifyResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            verified: false,
            message: message.into(),
            distance: None,
        }
    }
}

/// Outcome of applying the confidence threshold to an engine verification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub verified: bool,
    pub distance: f32,
}

/// Accept only when the engine matched AND the distance is strictly below
/// `confidence_threshold`. The engine's own threshold is looser.
pub fn decide(verification: &Verification, confidence_threshold: f32) -> Decision {
    Decision {
        verified: verification.matched && verification.distance < confidence_threshold,
        distance: verification.distance,
    }
}

impl From<Decision> for VerifyResponse {
    fn from(decision: Decision) -> Self {
        if decision.verified {
            Self {
                verified: true,
                message: "Face Verified".to_string(),
                distance: Some(decision.distance),
            }
        } else {
            Self::failure("Face Mismatch")
        }
    }
}
