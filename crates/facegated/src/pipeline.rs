//! Per-request image pipeline: decode, downscale, run the engine, and on a
//! missing face explain why. Shared by the engine thread and the CLI.

use facegate_core::{
    DetectorBackend, DistanceMetric, Embedding, EngineError, FaceEngine, FacePolicy,
    RepresentOptions, Verification, VerifyOptions,
};
use facegate_imaging::{classify, downscale_to_width, DiagnosticVerdict, FrameError, ImageFrame};
use thiserror::Error;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidImage(#[from] FrameError),
    #[error("no face detected: {}", .0.message())]
    NoFace(DiagnosticVerdict),
    #[error("{0}")]
    Engine(EngineError),
}

/// The parts of [`Config`] the pipeline needs.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub target_width: u32,
    pub detector: DetectorBackend,
    pub metric: DistanceMetric,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            target_width: config.target_width,
            detector: config.detector,
            metric: config.metric,
        }
    }
}

/// Decode uploaded bytes and downscale to `target_width`.
pub fn prepare(bytes: &[u8], target_width: u32) -> Result<ImageFrame, FrameError> {
    let frame = ImageFrame::decode(bytes)?;
    Ok(downscale_to_width(frame, target_width))
}

/// Embedding of the first detected face. Detection is enforced.
pub fn represent_first<E>(
    engine: &mut E,
    frame: &ImageFrame,
    settings: &PipelineSettings,
) -> Result<Embedding, PipelineError>
where
    E: FaceEngine + ?Sized,
{
    let opts = RepresentOptions {
        detector: settings.detector,
        align: true,
        enforce_detection: true,
    };
    let faces = engine.represent(frame, &opts).map_err(|e| explain(e, frame))?;
    match FacePolicy::default().select(faces) {
        Some(face) => Ok(face.embedding),
        None => Err(explain(EngineError::NoFaceDetected, frame)),
    }
}

/// Compare `probe` with `reference`. Detection is relaxed.
pub fn verify_against<E>(
    engine: &mut E,
    probe: &ImageFrame,
    reference: &ImageFrame,
    settings: &PipelineSettings,
) -> Result<Verification, PipelineError>
where
    E: FaceEngine + ?Sized,
{
    let opts = VerifyOptions {
        detector: settings.detector,
        align: true,
        enforce_detection: false,
        metric: settings.metric,
    };
    engine
        .verify(probe, reference, &opts)
        .map_err(|e| explain(e, probe))
}

/// Attach a diagnostic verdict to a missing face; pass other faults through.
fn explain(err: EngineError, frame: &ImageFrame) -> PipelineError {
    match err {
        EngineError::NoFaceDetected => {
            let verdict = classify(frame);
            tracing::info!(?verdict, "no face detected");
            PipelineError::NoFace(verdict)
        }
        other => PipelineError::Engine(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facegate_core::{EmbeddingModel, FaceRepresentation, ModelInfo};

    struct EmptyEngine;

    impl FaceEngine for EmptyEngine {
        fn represent(
            &mut self,
            _frame: &ImageFrame,
            opts: &RepresentOptions,
        ) -> Result<Vec<FaceRepresentation>, EngineError> {
            if opts.enforce_detection {
                Err(EngineError::NoFaceDetected)
            } else {
                Ok(Vec::new())
            }
        }

        fn model_info(&self) -> ModelInfo {
            ModelInfo {
                model: EmbeddingModel::ArcFace,
                embedding_dim: 512,
                detector: DetectorBackend::Scrfd,
            }
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            target_width: 320,
            detector: DetectorBackend::Scrfd,
            metric: DistanceMetric::Cosine,
        }
    }

    fn solid(value: u8) -> ImageFrame {
        ImageFrame::from_rgb(vec![value; 8 * 8 * 3], 8, 8).unwrap()
    }

    #[test]
    fn test_prepare_rejects_garbage() {
        let err = prepare(b"definitely not an image", 320).unwrap_err();
        assert!(matches!(err, FrameError::Decode(_)));
    }

    #[test]
    fn test_missing_face_is_explained() {
        let err = represent_first(&mut EmptyEngine, &solid(20), &settings()).unwrap_err();
        assert!(matches!(err, PipelineError::NoFace(DiagnosticVerdict::LightingTooDark)));

        let err = represent_first(&mut EmptyEngine, &solid(240), &settings()).unwrap_err();
        assert!(matches!(err, PipelineError::NoFace(DiagnosticVerdict::LightingTooBright)));

        let err = represent_first(&mut EmptyEngine, &solid(128), &settings()).unwrap_err();
        assert!(matches!(err, PipelineError::NoFace(DiagnosticVerdict::PositionOrAngle)));
    }

    #[test]
    fn test_empty_relaxed_result_still_fails_verify() {
        // The default verify needs one face per side, even when relaxed.
        let err = verify_against(&mut EmptyEngine, &solid(128), &solid(128), &settings());
        assert!(matches!(err, Err(PipelineError::NoFace(_))));
    }
}
