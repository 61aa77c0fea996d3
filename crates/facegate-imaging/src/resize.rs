//! Pre-processing: downscale oversized frames before detection.
//!
//! The recognizer normalizes every face to 112×112, so feeding it multi-megapixel
//! uploads only costs detector time. Frames wider than the target are shrunk to
//! exactly the target width with area averaging; narrower frames pass through.

use crate::frame::ImageFrame;

/// Default width (px) frames are downscaled to.
pub const DEFAULT_TARGET_WIDTH: u32 = 320;

/// One source contribution to an output sample: (source index, weight).
type Tap = (usize, f32);

/// Downscale `frame` to `target_width` if it is wider, preserving aspect ratio.
///
/// The new height is `height * target_width / width` rounded to the nearest
/// pixel (at least 1). Frames with `width <= target_width` are returned as-is.
pub fn downscale_to_width(frame: ImageFrame, target_width: u32) -> ImageFrame {
    if target_width == 0 || frame.width() <= target_width {
        return frame;
    }

    let new_h = scaled_height(frame.width(), frame.height(), target_width);
    let resized = area_resize(&frame, target_width, new_h);

    tracing::debug!(
        from_width = frame.width(),
        from_height = frame.height(),
        to_width = target_width,
        to_height = new_h,
        "downscaled frame"
    );

    resized
}

/// Height after scaling `width` to `target_width`, rounded, never below 1.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scale = target_width as f64 / width as f64;
    ((height as f64 * scale).round() as u32).max(1)
}

/// Area-averaging resize (box filter with fractional pixel coverage).
///
/// Each output pixel is the coverage-weighted mean of the source pixels its
/// footprint overlaps. Separable: a horizontal pass into a float buffer, then
/// a vertical pass back to u8.
fn area_resize(frame: &ImageFrame, new_w: u32, new_h: u32) -> ImageFrame {
    let src_w = frame.width() as usize;
    let src_h = frame.height() as usize;
    let dst_w = new_w as usize;
    let dst_h = new_h as usize;
    let src = frame.data();

    let x_taps = area_taps(src_w, dst_w);
    let y_taps = area_taps(src_h, dst_h);

    // Horizontal pass: src_h rows × dst_w columns.
    let mut horiz = vec![0.0f32; dst_w * src_h * 3];
    for y in 0..src_h {
        let src_row = &src[y * src_w * 3..(y + 1) * src_w * 3];
        let out_row = &mut horiz[y * dst_w * 3..(y + 1) * dst_w * 3];
        for (x, taps) in x_taps.iter().enumerate() {
            let mut acc = [0.0f32; 3];
            for &(sx, w) in taps {
                for c in 0..3 {
                    acc[c] += src_row[sx * 3 + c] as f32 * w;
                }
            }
            out_row[x * 3..x * 3 + 3].copy_from_slice(&acc);
        }
    }

    // Vertical pass: dst_h rows × dst_w columns.
    let mut out = vec![0u8; dst_w * dst_h * 3];
    for (y, taps) in y_taps.iter().enumerate() {
        for x in 0..dst_w {
            let mut acc = [0.0f32; 3];
            for &(sy, w) in taps {
                let base = (sy * dst_w + x) * 3;
                for c in 0..3 {
                    acc[c] += horiz[base + c] * w;
                }
            }
            let base = (y * dst_w + x) * 3;
            for c in 0..3 {
                out[base + c] = acc[c].round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    ImageFrame::from_raw_parts(out, new_w, new_h)
}

/// Compute area-coverage taps mapping `src_len` samples onto `dst_len` samples.
///
/// Output sample `i` covers the source interval `[i*s, (i+1)*s)` with
/// `s = src_len / dst_len`; every source sample overlapping it contributes in
/// proportion to the overlap. Weights of each output sum to 1.
fn area_taps(src_len: usize, dst_len: usize) -> Vec<Vec<Tap>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|i| {
            let start = i as f64 * scale;
            let end = ((i + 1) as f64 * scale).min(src_len as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);

            let mut taps = Vec::with_capacity(last - first);
            for j in first..last {
                let overlap = end.min((j + 1) as f64) - start.max(j as f64);
                if overlap > 1e-9 {
                    taps.push((j, (overlap / scale) as f32));
                }
            }
            taps
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(width: u32, height: u32, rgb: [u8; 3]) -> ImageFrame {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        ImageFrame::from_rgb(data, width, height).unwrap()
    }

    #[test]
    fn test_wide_frame_hits_target_width() {
        let frame = uniform(1280, 720, [90, 90, 90]);
        let out = downscale_to_width(frame, 320);
        assert_eq!(out.width(), 320);
        assert_eq!(out.height(), 180);
    }

    #[test]
    fn test_height_rounds_to_nearest() {
        // 1000x333 -> 320 x 106.56 -> 107
        let out = downscale_to_width(uniform(1000, 333, [0, 0, 0]), 320);
        assert_eq!(out.width(), 320);
        assert_eq!(out.height(), 107);
    }

    #[test]
    fn test_height_proportional_across_shapes() {
        for &(w, h) in &[(321u32, 200u32), (640, 480), (4032, 3024), (999, 1777), (500, 7)] {
            let out = downscale_to_width(uniform(w, h, [1, 2, 3]), 320);
            assert_eq!(out.width(), 320);
            let expected = h as f64 * 320.0 / w as f64;
            assert!(
                (out.height() as f64 - expected).abs() <= 1.0,
                "{w}x{h}: got height {}, expected ~{expected:.2}",
                out.height()
            );
        }
    }

    #[test]
    fn test_extreme_aspect_keeps_one_row() {
        let out = downscale_to_width(uniform(3200, 1, [5, 5, 5]), 320);
        assert_eq!((out.width(), out.height()), (320, 1));
    }

    #[test]
    fn test_narrow_frame_unchanged() {
        let frame = uniform(320, 240, [12, 34, 56]);
        let out = downscale_to_width(frame.clone(), 320);
        assert_eq!(out, frame);

        let small = uniform(100, 80, [1, 1, 1]);
        assert_eq!(downscale_to_width(small.clone(), 320), small);
    }

    #[test]
    fn test_uniform_stays_uniform() {
        let out = downscale_to_width(uniform(1000, 750, [200, 100, 50]), 320);
        assert!(out.data().chunks(3).all(|p| p == [200, 100, 50]));
    }

    #[test]
    fn test_integer_factor_averages_blocks() {
        // 4x2 -> 2x1: each output pixel is the mean of a 2x2 block.
        let data = vec![
            0, 0, 0, 100, 100, 100, 10, 10, 10, 30, 30, 30, //
            0, 0, 0, 100, 100, 100, 50, 50, 50, 70, 70, 70,
        ];
        let frame = ImageFrame::from_rgb(data, 4, 2).unwrap();
        let out = downscale_to_width(frame, 2);
        assert_eq!((out.width(), out.height()), (2, 1));
        assert_eq!(out.pixel(0, 0), [50, 50, 50]);
        assert_eq!(out.pixel(1, 0), [40, 40, 40]);
    }

    #[test]
    fn test_area_taps_weights_sum_to_one() {
        for &(src, dst) in &[(10usize, 3usize), (1280, 320), (7, 7), (333, 107)] {
            for taps in area_taps(src, dst) {
                let sum: f32 = taps.iter().map(|&(_, w)| w).sum();
                assert!((sum - 1.0).abs() < 1e-4, "{src}->{dst}: sum {sum}");
            }
        }
    }

    #[test]
    fn test_scaled_height() {
        assert_eq!(scaled_height(640, 480, 320), 240);
        assert_eq!(scaled_height(3000, 2, 320), 1);
    }
}
