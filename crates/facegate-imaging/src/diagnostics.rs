//! Lighting diagnostics for frames where no face was found.
//!
//! When detection fails the caller gets a remediation hint instead of a bare
//! "no face". The triage is a brightness heuristic on BT.601 luma: frames that
//! are too dark or washed out are blamed on lighting, everything else on the
//! face position, angle, or an obstruction.

use crate::frame::ImageFrame;
use serde::Serialize;

/// Mean luma below this is reported as too dark.
pub const DARK_THRESHOLD: f32 = 50.0;
/// Mean luma above this is reported as glare / overexposure.
pub const BRIGHT_THRESHOLD: f32 = 200.0;

// BT.601 luma weights in Q14 fixed point (sum = 16384).
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// Why a face was probably not detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticVerdict {
    LightingTooDark,
    LightingTooBright,
    PositionOrAngle,
    Unknown,
}

impl DiagnosticVerdict {
    /// Caller-facing remediation text.
    pub fn message(&self) -> &'static str {
        match self {
            Self::LightingTooDark => {
                "Lighting Issue: Environment is too dark. Please ensure better lighting."
            }
            Self::LightingTooBright => {
                "Lighting Issue: Too much glare or brightness. Please avoid direct light."
            }
            Self::PositionOrAngle => {
                "Angle/Position Issue: Face not visible. Please look directly at camera and remove masks/glasses."
            }
            Self::Unknown => "Face not found. Please look at the camera.",
        }
    }

    pub fn is_lighting(&self) -> bool {
        matches!(self, Self::LightingTooDark | Self::LightingTooBright)
    }
}

impl std::fmt::Display for DiagnosticVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Convert an RGB frame to single-channel BT.601 luma (`0.299R + 0.587G + 0.114B`).
pub fn luminance(frame: &ImageFrame) -> Vec<u8> {
    frame
        .data()
        .chunks_exact(3)
        .map(|p| luma(p[0], p[1], p[2]))
        .collect()
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B;
    ((y + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT).min(255) as u8
}

/// Average luma brightness (0.0–255.0), or `None` for an empty buffer.
pub fn mean_brightness(gray: &[u8]) -> Option<f32> {
    if gray.is_empty() {
        return None;
    }
    let sum: u64 = gray.iter().map(|&p| p as u64).sum();
    Some((sum as f64 / gray.len() as f64) as f32)
}

/// Map a mean brightness onto a verdict.
pub fn verdict_for_brightness(mean: f32) -> DiagnosticVerdict {
    if mean < DARK_THRESHOLD {
        DiagnosticVerdict::LightingTooDark
    } else if mean > BRIGHT_THRESHOLD {
        DiagnosticVerdict::LightingTooBright
    } else if mean.is_finite() {
        DiagnosticVerdict::PositionOrAngle
    } else {
        DiagnosticVerdict::Unknown
    }
}

/// Classify why detection failed on `frame`. Pure function of the pixel data.
pub fn classify(frame: &ImageFrame) -> DiagnosticVerdict {
    let gray = luminance(frame);
    let Some(mean) = mean_brightness(&gray) else {
        return DiagnosticVerdict::Unknown;
    };
    let verdict = verdict_for_brightness(mean);
    tracing::debug!(brightness = mean, ?verdict, "lighting check");
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(value: u8, width: u32, height: u32) -> ImageFrame {
        ImageFrame::from_rgb(vec![value; (width * height * 3) as usize], width, height).unwrap()
    }

    #[test]
    fn test_luma_of_gray_is_identity() {
        for v in [0u8, 1, 49, 50, 51, 127, 200, 201, 254, 255] {
            assert_eq!(luma(v, v, v), v);
        }
    }

    #[test]
    fn test_luma_weights() {
        // Pure channels: 0.299*255 = 76.2, 0.587*255 = 149.7, 0.114*255 = 29.1
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn test_mean_brightness() {
        assert_eq!(mean_brightness(&[]), None);
        let m = mean_brightness(&[0, 100, 200]).unwrap();
        assert!((m - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_brightness_49_is_dark() {
        assert_eq!(classify(&gray_frame(49, 8, 8)), DiagnosticVerdict::LightingTooDark);
    }

    #[test]
    fn test_brightness_51_is_not_dark() {
        let verdict = classify(&gray_frame(51, 8, 8));
        assert_ne!(verdict, DiagnosticVerdict::LightingTooDark);
        assert_eq!(verdict, DiagnosticVerdict::PositionOrAngle);
    }

    #[test]
    fn test_brightness_201_is_bright() {
        assert_eq!(classify(&gray_frame(201, 8, 8)), DiagnosticVerdict::LightingTooBright);
    }

    #[test]
    fn test_brightness_150_is_position() {
        assert_eq!(classify(&gray_frame(150, 8, 8)), DiagnosticVerdict::PositionOrAngle);
    }

    #[test]
    fn test_boundaries_are_exclusive() {
        assert_eq!(verdict_for_brightness(50.0), DiagnosticVerdict::PositionOrAngle);
        assert_eq!(verdict_for_brightness(200.0), DiagnosticVerdict::PositionOrAngle);
        assert_eq!(verdict_for_brightness(49.99), DiagnosticVerdict::LightingTooDark);
        assert_eq!(verdict_for_brightness(200.01), DiagnosticVerdict::LightingTooBright);
        assert_eq!(verdict_for_brightness(f32::NAN), DiagnosticVerdict::Unknown);
    }

    #[test]
    fn test_mixed_frame_uses_mean() {
        // Half black, half white averages to ~127.5: lighting is "fine".
        let mut data = vec![0u8; 4 * 2 * 3];
        data[12..].fill(255);
        let frame = ImageFrame::from_rgb(data, 4, 2).unwrap();
        assert_eq!(classify(&frame), DiagnosticVerdict::PositionOrAngle);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let frame = gray_frame(30, 16, 16);
        assert_eq!(classify(&frame), classify(&frame));
    }

    #[test]
    fn test_messages() {
        assert!(DiagnosticVerdict::LightingTooDark.message().contains("too dark"));
        assert!(DiagnosticVerdict::LightingTooBright.message().contains("glare"));
        assert!(DiagnosticVerdict::PositionOrAngle.message().starts_with("Angle/Position Issue"));
        assert!(DiagnosticVerdict::LightingTooDark.is_lighting());
        assert!(!DiagnosticVerdict::PositionOrAngle.is_lighting());
    }
}
