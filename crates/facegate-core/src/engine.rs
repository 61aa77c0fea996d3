//! The face-recognition capability: detect, align, embed, compare.
//!
//! [`FaceEngine`] is the seam request handling talks to. [`OnnxFaceEngine`]
//! is the production implementation backed by SCRFD + ArcFace; tests supply
//! their own implementations.

use crate::alignment;
use crate::detector::{DetectorError, FaceDetector};
use crate::distance::DistanceMetric;
use crate::model::{DetectorBackend, EmbeddingModel, FacePolicy};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{BoundingBox, FaceRepresentation, Verification};
use facegate_imaging::ImageFrame;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Detection was enforced and no face was found.
    #[error("Face could not be detected")]
    NoFaceDetected,
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("detector backend {0} is not loaded")]
    BackendUnavailable(DetectorBackend),
}

/// Options for [`FaceEngine::represent`].
#[derive(Debug, Clone, Copy)]
pub struct RepresentOptions {
    pub detector: DetectorBackend,
    /// Warp faces onto the reference landmarks before embedding.
    pub align: bool,
    /// Fail with `NoFaceDetected` instead of embedding the whole image.
    pub enforce_detection: bool,
}

/// Options for [`FaceEngine::verify`].
#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    pub detector: DetectorBackend,
    pub align: bool,
    pub enforce_detection: bool,
    pub metric: DistanceMetric,
}

impl VerifyOptions {
    fn represent_options(&self) -> RepresentOptions {
        RepresentOptions {
            detector: self.detector,
            align: self.align,
            enforce_detection: self.enforce_detection,
        }
    }
}

/// What an engine is running, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model: EmbeddingModel,
    pub embedding_dim: usize,
    pub detector: DetectorBackend,
}

/// A loaded face-recognition capability.
///
/// Implementations own their model state; callers serialize access
/// (`&mut self`), which is what ONNX sessions require anyway.
pub trait FaceEngine: Send {
    /// Every face found in `frame`, most confident first.
    ///
    /// With `enforce_detection` an image without faces is an error; without it
    /// the whole image is embedded and returned as a single face-less entry.
    fn represent(
        &mut self,
        frame: &ImageFrame,
        opts: &RepresentOptions,
    ) -> Result<Vec<FaceRepresentation>, EngineError>;

    fn model_info(&self) -> ModelInfo;

    /// Compare the first face of `probe` against the first face of `reference`.
    fn verify(
        &mut self,
        probe: &ImageFrame,
        reference: &ImageFrame,
        opts: &VerifyOptions,
    ) -> Result<Verification, EngineError> {
        let represent = opts.represent_options();
        let policy = FacePolicy::default();

        let probe_face = policy
            .select(self.represent(probe, &represent)?)
            .ok_or(EngineError::NoFaceDetected)?;
        let reference_face = policy
            .select(self.represent(reference, &represent)?)
            .ok_or(EngineError::NoFaceDetected)?;

        let model = self.model_info().model;
        let distance = opts
            .metric
            .distance(&probe_face.embedding, &reference_face.embedding);
        let threshold = opts.metric.default_threshold(model);

        Ok(Verification {
            matched: distance <= threshold,
            distance,
            threshold,
            metric: opts.metric,
        })
    }
}

/// SCRFD + ArcFace engine running on ONNX Runtime.
pub struct OnnxFaceEngine {
    detector: Option<FaceDetector>,
    recognizer: FaceRecognizer,
    backend: DetectorBackend,
}

impl OnnxFaceEngine {
    /// Load the detector for `backend` (if it needs one) and the recognizer
    /// for `model` from `model_dir`. Fails fast on a missing model file.
    pub fn load(
        model_dir: &Path,
        model: EmbeddingModel,
        backend: DetectorBackend,
    ) -> Result<Self, EngineError> {
        let detector = match backend.model_path(model_dir) {
            Some(path) => Some(FaceDetector::load(&path)?),
            None => None,
        };
        let recognizer_path = model_dir.join(model.file_name());
        let recognizer = FaceRecognizer::load(&recognizer_path.to_string_lossy(), model)?;

        tracing::info!(
            model_dir = %model_dir.display(),
            %model,
            detector = %backend,
            "face engine ready"
        );

        Ok(Self {
            detector,
            recognizer,
            backend,
        })
    }

    fn detect(
        &mut self,
        frame: &ImageFrame,
        backend: DetectorBackend,
    ) -> Result<Vec<BoundingBox>, EngineError> {
        match backend {
            DetectorBackend::Skip => Ok(Vec::new()),
            DetectorBackend::Scrfd => {
                let detector = self
                    .detector
                    .as_mut()
                    .ok_or(EngineError::BackendUnavailable(backend))?;
                Ok(detector.detect(frame)?)
            }
        }
    }
}

impl FaceEngine for OnnxFaceEngine {
    fn represent(
        &mut self,
        frame: &ImageFrame,
        opts: &RepresentOptions,
    ) -> Result<Vec<FaceRepresentation>, EngineError> {
        let started = std::time::Instant::now();

        if opts.detector == DetectorBackend::Skip {
            let embedding = self.recognizer.embed(&alignment::fit_whole(frame))?;
            return Ok(vec![FaceRepresentation { embedding, face: None }]);
        }

        let faces = self.detect(frame, opts.detector)?;
        if faces.is_empty() {
            if opts.enforce_detection {
                return Err(EngineError::NoFaceDetected);
            }
            tracing::debug!("no face detected, embedding whole image");
            let embedding = self.recognizer.embed(&alignment::fit_whole(frame))?;
            return Ok(vec![FaceRepresentation { embedding, face: None }]);
        }

        let mut reps = Vec::with_capacity(faces.len());
        for face in faces {
            let crop = match (&face.landmarks, opts.align) {
                (Some(landmarks), true) => alignment::align_face(frame, landmarks),
                _ => alignment::crop_face(frame, &face),
            };
            let embedding = self.recognizer.embed(&crop)?;
            reps.push(FaceRepresentation {
                embedding,
                face: Some(face),
            });
        }

        tracing::debug!(
            faces = reps.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "represent done"
        );
        Ok(reps)
    }

    fn model_info(&self) -> ModelInfo {
        let model = self.recognizer.model();
        ModelInfo {
            model,
            embedding_dim: model.dimension(),
            detector: self.backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Embedding;

    /// Returns canned embeddings keyed by the frame's first pixel value.
    struct LookupEngine {
        calls: usize,
    }

    impl FaceEngine for LookupEngine {
        fn represent(
            &mut self,
            frame: &ImageFrame,
            opts: &RepresentOptions,
        ) -> Result<Vec<FaceRepresentation>, EngineError> {
            self.calls += 1;
            let values = match frame.data()[0] {
                0 if opts.enforce_detection => return Err(EngineError::NoFaceDetected),
                0 => vec![0.0, 0.0, 1.0],
                1 => vec![1.0, 0.0, 0.0],
                2 => vec![0.9, 0.1, 0.0],
                _ => vec![0.0, 1.0, 0.0],
            };
            Ok(vec![FaceRepresentation {
                embedding: Embedding { values, model_version: None },
                face: None,
            }])
        }

        fn model_info(&self) -> ModelInfo {
            ModelInfo {
                model: EmbeddingModel::ArcFace,
                embedding_dim: 3,
                detector: DetectorBackend::Skip,
            }
        }
    }

    fn frame(tag: u8) -> ImageFrame {
        ImageFrame::from_rgb(vec![tag; 12], 2, 2).unwrap()
    }

    fn opts(enforce: bool) -> VerifyOptions {
        VerifyOptions {
            detector: DetectorBackend::Scrfd,
            align: true,
            enforce_detection: enforce,
            metric: DistanceMetric::Cosine,
        }
    }

    #[test]
    fn test_default_verify_same_identity() {
        let mut engine = LookupEngine { calls: 0 };
        let v = engine.verify(&frame(1), &frame(1), &opts(false)).unwrap();
        assert!(v.matched);
        assert!(v.distance < 1e-6);
        assert_eq!(v.threshold, 0.68);
        assert_eq!(engine.calls, 2);
    }

    #[test]
    fn test_default_verify_close_and_far() {
        let mut engine = LookupEngine { calls: 0 };
        let close = engine.verify(&frame(1), &frame(2), &opts(false)).unwrap();
        assert!(close.matched);
        assert!(close.distance > 0.0 && close.distance < 0.1);

        let far = engine.verify(&frame(1), &frame(3), &opts(false)).unwrap();
        assert!(!far.matched);
        assert!((far.distance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_verify_relaxed_tolerates_missing_face() {
        let mut engine = LookupEngine { calls: 0 };
        let v = engine.verify(&frame(0), &frame(1), &opts(false)).unwrap();
        assert!(!v.matched);
    }

    #[test]
    fn test_verify_enforced_propagates_no_face() {
        let mut engine = LookupEngine { calls: 0 };
        let result = engine.verify(&frame(0), &frame(1), &opts(true));
        assert!(matches!(result, Err(EngineError::NoFaceDetected)));
    }

    #[test]
    fn test_load_missing_models_fails_fast() {
        let result = OnnxFaceEngine::load(
            Path::new("/nonexistent/facegate-models"),
            EmbeddingModel::ArcFace,
            DetectorBackend::Scrfd,
        );
        assert!(matches!(
            result,
            Err(EngineError::Detector(DetectorError::ModelNotFound(_)))
        ));

        let result = OnnxFaceEngine::load(
            Path::new("/nonexistent/facegate-models"),
            EmbeddingModel::ArcFace,
            DetectorBackend::Skip,
        );
        assert!(matches!(
            result,
            Err(EngineError::Recognizer(RecognizerError::ModelNotFound(_)))
        ));
    }
}
