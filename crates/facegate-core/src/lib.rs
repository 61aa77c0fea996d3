//! facegate-core: face detection, alignment, embedding and comparison.
//!
//! SCRFD locates faces, ArcFace turns them into 512-d embeddings, both via
//! ONNX Runtime on the CPU. [`FaceEngine`] is the interface the services use.

pub mod alignment;
pub mod detector;
pub mod distance;
pub mod engine;
pub mod model;
pub mod recognizer;
pub mod types;

use std::path::PathBuf;

pub use detector::FaceDetector;
pub use distance::DistanceMetric;
pub use engine::{EngineError, FaceEngine, ModelInfo, OnnxFaceEngine, RepresentOptions, VerifyOptions};
pub use model::{DetectorBackend, EmbeddingModel, FacePolicy};
pub use recognizer::FaceRecognizer;
pub use types::{BoundingBox, Embedding, FaceRepresentation, Verification};

/// `$XDG_DATA_HOME/facegate/models`, falling back to `~/.local/share`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facegate")
        .join("models")
}
