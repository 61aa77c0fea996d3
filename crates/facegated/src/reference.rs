//! The fixed reference identity of the verify service.

use std::path::Path;
use std::sync::Arc;

use facegate_imaging::{FrameError, ImageFrame};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::pipeline;

/// Reference frame, decoded and downscaled once at startup.
#[derive(Debug, Clone)]
pub struct Reference {
    pub frame: Arc<ImageFrame>,
    pub info: ReferenceInfo,
}

/// What `/status` reports about the reference.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceInfo {
    pub path: String,
    /// Dimensions after downscaling.
    pub width: u32,
    pub height: u32,
    /// Digest of the file as read from disk.
    pub sha256: String,
}

impl Reference {
    pub fn load(path: &Path, target_width: u32) -> Result<Self, FrameError> {
        let bytes = std::fs::read(path).map_err(|e| FrameError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_bytes(path, &bytes, target_width)
    }

    pub fn from_bytes(path: &Path, bytes: &[u8], target_width: u32) -> Result<Self, FrameError> {
        let sha256 = format!("{:x}", Sha256::digest(bytes));
        let frame = pipeline::prepare(bytes, target_width)?;
        let info = ReferenceInfo {
            path: path.display().to_string(),
            width: frame.width(),
            height: frame.height(),
            sha256,
        };
        tracing::info!(
            path = %info.path,
            width = info.width,
            height = info.height,
            sha256 = %info.sha256,
            "reference image loaded"
        );
        Ok(Self {
            frame: Arc::new(frame),
            info,
        })
    }
}
