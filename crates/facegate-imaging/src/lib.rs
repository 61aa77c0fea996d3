//! facegate-imaging: Image intake, pre-processing, and lighting diagnostics.
//!
//! Decodes uploaded bytes into RGB frames, downscales oversized frames before
//! detection, and explains failed detections in terms of lighting or pose.

pub mod diagnostics;
pub mod frame;
pub mod resize;

pub use diagnostics::{classify, DiagnosticVerdict};
pub use frame::{FrameError, ImageFrame};
pub use resize::{downscale_to_width, DEFAULT_TARGET_WIDTH};
