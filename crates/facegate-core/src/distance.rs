//! Embedding distance metrics and the model-specific match thresholds.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::model::EmbeddingModel;
use crate::types::Embedding;

/// Dissimilarity measure between two embeddings. Lower = more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`, in [0, 2].
    Cosine,
    /// Plain Euclidean distance of the raw vectors.
    Euclidean,
    /// Euclidean distance after L2-normalizing both vectors, in [0, 2].
    EuclideanL2,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::EuclideanL2 => "euclidean_l2",
        }
    }

    /// Distance between `a` and `b` under this metric. Never negative.
    pub fn distance(&self, a: &Embedding, b: &Embedding) -> f32 {
        match self {
            // Rounding can push similarity of identical vectors a hair above 1.
            Self::Cosine => (1.0 - a.similarity(b)).max(0.0),
            Self::Euclidean => a.euclidean_distance(b),
            Self::EuclideanL2 => a.l2_normalized().euclidean_distance(&b.l2_normalized()),
        }
    }

    /// Default "same person" threshold for `model` under this metric.
    pub fn default_threshold(&self, model: EmbeddingModel) -> f32 {
        match (model, self) {
            (EmbeddingModel::ArcFace, Self::Cosine) => 0.68,
            (EmbeddingModel::ArcFace, Self::Euclidean) => 4.15,
            (EmbeddingModel::ArcFace, Self::EuclideanL2) => 1.13,
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "euclidean_l2" => Ok(Self::EuclideanL2),
            other => Err(format!(
                "unknown distance metric {other:?} (expected cosine, euclidean, euclidean_l2)"
            )),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
