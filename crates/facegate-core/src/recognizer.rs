//! ArcFace face recognizer via ONNX Runtime.
//!
//! Turns a 112×112 RGB face crop into an L2-normalized embedding using the
//! InsightFace w600k_r50 model.

use crate::alignment::ALIGNED_SIZE;
use crate::model::EmbeddingModel;
use crate::types::Embedding;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5; // symmetric, unlike SCRFD's 128.0

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("model file not found: {0}; download w600k_r50.onnx from insightface and place it in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face crop must be {expected} bytes, got {actual}")]
    BadCrop { expected: usize, actual: usize },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ArcFace-based face recognizer.
pub struct FaceRecognizer {
    session: Session,
    model: EmbeddingModel,
}

impl FaceRecognizer {
    /// Load the recognition model from `model_path`.
    pub fn load(model_path: &str, model: EmbeddingModel) -> Result<Self, RecognizerError> {
        if !Path::new(model_path).exists() {
            return Err(RecognizerError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            model = %model,
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            "loaded recognition model"
        );

        Ok(Self { session, model })
    }

    pub fn model(&self) -> EmbeddingModel {
        self.model
    }

    /// Embed a 112×112 interleaved RGB crop.
    pub fn embed(&mut self, crop: &[u8]) -> Result<Embedding, RecognizerError> {
        let input = preprocess(crop)?;
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(format!("embedding extraction: {e}")))?;

        finish_embedding(raw.to_vec(), self.model)
    }
}

/// Check the output dimension and L2-normalize.
fn finish_embedding(raw: Vec<f32>, model: EmbeddingModel) -> Result<Embedding, RecognizerError> {
    if raw.len() != model.dimension() {
        return Err(RecognizerError::InferenceFailed(format!(
            "expected {}-dim embedding, got {}",
            model.dimension(),
            raw.len()
        )));
    }
    let embedding = Embedding {
        values: raw,
        model_version: Some(model.version().to_string()),
    };
    Ok(embedding.l2_normalized())
}

/// Interleaved RGB crop → normalized 1×3×112×112 NCHW tensor.
fn preprocess(crop: &[u8]) -> Result<Array4<f32>, RecognizerError> {
    let size = ALIGNED_SIZE;
    if crop.len() != size * size * 3 {
        return Err(RecognizerError::BadCrop {
            expected: size * size * 3,
            actual: crop.len(),
        });
    }

    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (i, px) in crop.chunks_exact(3).enumerate() {
        let (y, x) = (i / size, i % size);
        for c in 0..3 {
            tensor[[0, c, y, x]] = (px[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
        }
    }
    Ok(tensor)
}
