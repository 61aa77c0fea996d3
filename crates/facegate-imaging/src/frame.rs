//! Frame type and image intake: decode uploaded bytes into an RGB pixel grid.

use std::path::Path;

/// A decoded 3-channel (RGB, 8 bit) image.
///
/// Width and height are always non-zero and `data` holds exactly
/// `width * height * 3` bytes in row-major RGB order.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl ImageFrame {
    /// Build a frame from raw interleaved RGB bytes.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyImage { width, height });
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(FrameError::InvalidLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, width, height })
    }

    /// Wrap a buffer already known to satisfy the frame invariants.
    pub(crate) fn from_raw_parts(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert!(width > 0 && height > 0);
        debug_assert_eq!(data.len(), width as usize * height as usize * 3);
        Self { data, width, height }
    }

    /// Decode an encoded image (JPEG, PNG, WebP, BMP, ...) into an RGB frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.is_empty() {
            return Err(FrameError::Decode("empty payload".into()));
        }
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| FrameError::Decode(e.to_string()))?
            .to_rgb8();
        let (width, height) = decoded.dimensions();
        tracing::debug!(width, height, bytes = bytes.len(), "decoded image");
        Self::from_rgb(decoded.into_raw(), width, height)
    }

    /// Read and decode an image file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FrameError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| FrameError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::decode(&bytes)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Interleaved RGB pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGB triple at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

impl std::fmt::Debug for ImageFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("invalid RGB length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
