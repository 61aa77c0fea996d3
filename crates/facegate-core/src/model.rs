//! Model and backend identifiers, and the face selection policy.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::types::FaceRepresentation;

/// Embedding model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingModel {
    /// InsightFace ArcFace ResNet-50 trained on WebFace600K.
    ArcFace,
}

impl EmbeddingModel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ArcFace => "ArcFace",
        }
    }

    /// Length of the vectors this model produces.
    pub fn dimension(&self) -> usize {
        match self {
            Self::ArcFace => 512,
        }
    }

    /// Version tag stamped on produced embeddings.
    pub fn version(&self) -> &'static str {
        match self {
            Self::ArcFace => "w600k_r50",
        }
    }

    /// ONNX file name inside the model directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::ArcFace => "w600k_r50.onnx",
        }
    }
}

impl FromStr for EmbeddingModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arcface" | "w600k_r50" => Ok(Self::ArcFace),
            other => Err(format!("unknown embedding model {other:?} (expected ArcFace)")),
        }
    }
}

impl std::fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Face detector backend used to locate faces before embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorBackend {
    /// SCRFD (det_10g) with five-point landmarks.
    Scrfd,
    /// No detection: the whole image is treated as the face.
    Skip,
}

impl DetectorBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrfd => "scrfd",
            Self::Skip => "skip",
        }
    }

    /// ONNX file name inside the model directory, if the backend needs one.
    pub fn file_name(&self) -> Option<&'static str> {
        match self {
            Self::Scrfd => Some("det_10g.onnx"),
            Self::Skip => None,
        }
    }

    /// Full path of the detector model under `model_dir`.
    pub fn model_path(&self, model_dir: &Path) -> Option<String> {
        self.file_name()
            .map(|f| model_dir.join(f).to_string_lossy().into_owned())
    }
}

impl FromStr for DetectorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scrfd" => Ok(Self::Scrfd),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown detector backend {other:?} (expected scrfd, skip)")),
        }
    }
}

impl std::fmt::Display for DetectorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which face to keep when an image yields several candidates.
///
/// Engines return candidates ordered by detection confidence (highest first),
/// so `HighestConfidence` takes the head of the list; it never assumes the
/// list has exactly one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacePolicy {
    #[default]
    HighestConfidence,
}

impl FacePolicy {
    pub fn select(&self, faces: Vec<FaceRepresentation>) -> Option<FaceRepresentation> {
        match self {
            Self::HighestConfidence => {
                if faces.len() > 1 {
                    tracing::debug!(candidates = faces.len(), "multiple faces, keeping the first");
                }
                faces.into_iter().next()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Embedding};

    fn rep(confidence: f32, tag: f32) -> FaceRepresentation {
        FaceRepresentation {
            embedding: Embedding { values: vec![tag], model_version: None },
            face: Some(BoundingBox {
                x: 0.0, y: 0.0, width: 10.0, height: 10.0, confidence, landmarks: None,
            }),
        }
    }

    #[test]
    fn test_policy_takes_first_candidate() {
        let faces = vec![rep(0.95, 1.0), rep(0.80, 2.0), rep(0.60, 3.0)];
        let chosen = FacePolicy::HighestConfidence.select(faces).unwrap();
        assert_eq!(chosen.embedding.values, vec![1.0]);
        assert!((chosen.confidence() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_policy_empty() {
        assert!(FacePolicy::default().select(Vec::new()).is_none());
    }

    #[test]
    fn test_parse_identifiers() {
        assert_eq!("ArcFace".parse::<EmbeddingModel>().unwrap(), EmbeddingModel::ArcFace);
        assert!("Facenet512".parse::<EmbeddingModel>().is_err());
        assert!("ssd".parse::<DetectorBackend>().is_err());
        assert_eq!("SCRFD".parse::<DetectorBackend>().unwrap(), DetectorBackend::Scrfd);
        assert_eq!("skip".parse::<DetectorBackend>().unwrap(), DetectorBackend::Skip);
    }

    #[test]
    fn test_model_paths() {
        let dir = Path::new("/opt/models");
        assert_eq!(
            DetectorBackend::Scrfd.model_path(dir).as_deref(),
            Some("/opt/models/det_10g.onnx")
        );
        assert_eq!(DetectorBackend::Skip.model_path(dir), None);
        assert_eq!(EmbeddingModel::ArcFace.dimension(), 512);
    }
}
