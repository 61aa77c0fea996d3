//! Face alignment and cropping to the recognizer's 112×112 RGB input.
//!
//! With landmarks, faces are warped onto the five InsightFace reference points
//! by a least-squares similarity transform. Without them (alignment disabled,
//! detector skipped, relaxed detection) a square region is scaled into place.

use crate::types::BoundingBox;
use facegate_imaging::ImageFrame;

/// ArcFace reference landmarks for a 112×112 output.
const REFERENCE_LANDMARKS_112: [(f32, f32); 5] = [
    (38.2946, 51.6963), // left eye
    (73.5318, 51.5014), // right eye
    (56.0252, 71.7366), // nose
    (41.5493, 92.3655), // left mouth
    (70.7299, 92.2041), // right mouth
];

/// Side of the square crop fed to the recognizer.
pub const ALIGNED_SIZE: usize = 112;

/// Forward similarity transform `dst = [[a, -b], [b, a]] * src + [tx, ty]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Similarity {
    a: f32,
    b: f32,
    tx: f32,
    ty: f32,
}

impl Similarity {
    /// Pure scale + translation mapping `src_origin` to the output origin.
    fn scale_translate(scale: f32, src_origin: (f32, f32)) -> Self {
        Self {
            a: scale,
            b: 0.0,
            tx: -src_origin.0 * scale,
            ty: -src_origin.1 * scale,
        }
    }

    fn det(&self) -> f32 {
        self.a * self.a + self.b * self.b
    }

    /// Map an output coordinate back into the source image. Requires `det() > 0`.
    fn invert_point(&self, ox: f32, oy: f32) -> (f32, f32) {
        let det = self.det();
        let dx = ox - self.tx;
        let dy = oy - self.ty;
        (
            (self.a * dx + self.b * dy) / det,
            (-self.b * dx + self.a * dy) / det,
        )
    }
}

/// Least-squares 4-DOF similarity transform taking `src` points onto `dst`.
///
/// Each point pair contributes two rows of the overdetermined system
/// `[sx, -sy, 1, 0]·p = dx` and `[sy, sx, 0, 1]·p = dy` with `p = [a, b, tx, ty]`;
/// the 4×4 normal equations are then solved directly.
fn estimate_similarity(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Similarity {
    let mut normal = [[0.0f32; 5]; 4];

    for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst.iter()) {
        let rows = [([sx, -sy, 1.0, 0.0], dx), ([sy, sx, 0.0, 1.0], dy)];
        for (row, rhs) in rows {
            for j in 0..4 {
                for k in 0..4 {
                    normal[j][k] += row[j] * row[k];
                }
                normal[j][4] += row[j] * rhs;
            }
        }
    }

    match solve_augmented(normal) {
        Some([a, b, tx, ty]) => Similarity { a, b, tx, ty },
        None => Similarity { a: 1.0, b: 0.0, tx: 0.0, ty: 0.0 },
    }
}

/// Gaussian elimination with partial pivoting on a 4×5 augmented matrix.
/// Returns `None` for a singular system.
#[allow(clippy::needless_range_loop)]
fn solve_augmented(mut m: [[f32; 5]; 4]) -> Option<[f32; 4]> {
    for col in 0..4 {
        let pivot_row = (col..4)
            .max_by(|&r1, &r2| {
                m[r1][col]
                    .abs()
                    .partial_cmp(&m[r2][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        m.swap(col, pivot_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            return None;
        }
        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..5 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    let mut x = [0.0f32; 4];
    for i in (0..4).rev() {
        let tail: f32 = ((i + 1)..4).map(|j| m[i][j] * x[j]).sum();
        x[i] = (m[i][4] - tail) / m[i][i];
    }
    Some(x)
}

/// Resample `frame` through `transform` into an `out_size`² RGB crop.
///
/// Bilinear per channel; samples falling outside the source are black.
fn warp_rgb(frame: &ImageFrame, transform: &Similarity, out_size: usize) -> Vec<u8> {
    let mut output = vec![0u8; out_size * out_size * 3];
    if transform.det() < 1e-12 {
        return output;
    }
    let w = frame.width() as i32;
    let h = frame.height() as i32;
    let data = frame.data();

    let sample = |x: i32, y: i32, c: usize| -> f32 {
        if x >= 0 && x < w && y >= 0 && y < h {
            data[(y as usize * w as usize + x as usize) * 3 + c] as f32
        } else {
            0.0
        }
    };

    for oy in 0..out_size {
        for ox in 0..out_size {
            let (sx, sy) = transform.invert_point(ox as f32, oy as f32);
            let x0 = sx.floor() as i32;
            let y0 = sy.floor() as i32;
            let fx = sx - x0 as f32;
            let fy = sy - y0 as f32;

            let base = (oy * out_size + ox) * 3;
            for c in 0..3 {
                let val = sample(x0, y0, c) * (1.0 - fx) * (1.0 - fy)
                    + sample(x0 + 1, y0, c) * fx * (1.0 - fy)
                    + sample(x0, y0 + 1, c) * (1.0 - fx) * fy
                    + sample(x0 + 1, y0 + 1, c) * fx * fy;
                output[base + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    output
}

/// Align a detected face to the canonical 112×112 ArcFace position.
pub fn align_face(frame: &ImageFrame, landmarks: &[(f32, f32); 5]) -> Vec<u8> {
    let transform = estimate_similarity(landmarks, &REFERENCE_LANDMARKS_112);
    warp_rgb(frame, &transform, ALIGNED_SIZE)
}

/// Crop the square around a face box (side = longer box edge) to 112×112.
pub fn crop_face(frame: &ImageFrame, face: &BoundingBox) -> Vec<u8> {
    let side = face.width.max(face.height).max(1.0);
    let cx = face.x + face.width / 2.0;
    let cy = face.y + face.height / 2.0;
    let origin = (cx - side / 2.0, cy - side / 2.0);
    let transform = Similarity::scale_translate(ALIGNED_SIZE as f32 / side, origin);
    warp_rgb(frame, &transform, ALIGNED_SIZE)
}

/// Fit the whole frame into 112×112, centered and padded with black.
pub fn fit_whole(frame: &ImageFrame) -> Vec<u8> {
    let w = frame.width() as f32;
    let h = frame.height() as f32;
    let side = w.max(h);
    let origin = ((w - side) / 2.0, (h - side) / 2.0);
    let transform = Similarity::scale_translate(ALIGNED_SIZE as f32 / side, origin);
    warp_rgb(frame, &transform, ALIGNED_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> ImageFrame {
        let data = rgb.iter().copied().cycle().take((width * height * 3) as usize).collect();
        ImageFrame::from_rgb(data, width, height).unwrap()
    }

    #[test]
    fn test_identity_transform() {
        let pts = REFERENCE_LANDMARKS_112;
        let t = estimate_similarity(&pts, &pts);
        assert!((t.a - 1.0).abs() < 1e-4, "a = {}", t.a);
        assert!(t.b.abs() < 1e-4, "b = {}", t.b);
        assert!(t.tx.abs() < 1e-3, "tx = {}", t.tx);
        assert!(t.ty.abs() < 1e-3, "ty = {}", t.ty);
    }

    #[test]
    fn test_scaled_transform() {
        // Source landmarks at 2x scale → a ≈ 0.5
        let src = REFERENCE_LANDMARKS_112.map(|(x, y)| (x * 2.0, y * 2.0));
        let t = estimate_similarity(&src, &REFERENCE_LANDMARKS_112);
        assert!((t.a - 0.5).abs() < 0.01, "a = {}, expected ~0.5", t.a);
    }

    #[test]
    fn test_singular_system_has_no_solution() {
        assert_eq!(solve_augmented([[0.0; 5]; 4]), None);
    }

    #[test]
    fn test_collapsed_transform_warps_to_black() {
        let frame = solid(10, 10, [200, 200, 200]);
        let t = Similarity { a: 0.0, b: 0.0, tx: 0.0, ty: 0.0 };
        assert!(warp_rgb(&frame, &t, 4).iter().all(|&p| p == 0));
    }

    #[test]
    fn test_align_face_output_size() {
        let frame = solid(640, 480, [128, 64, 32]);
        let aligned = align_face(&frame, &REFERENCE_LANDMARKS_112);
        assert_eq!(aligned.len(), ALIGNED_SIZE * ALIGNED_SIZE * 3);
        // Landmarks at reference positions: identity warp keeps the color.
        let mid = (56 * ALIGNED_SIZE + 56) * 3;
        assert_eq!(&aligned[mid..mid + 3], &[128, 64, 32]);
    }

    #[test]
    fn test_landmark_roundtrip() {
        // A bright patch at the source left eye should land near the reference left eye.
        let (w, h) = (200u32, 200u32);
        let mut data = vec![0u8; (w * h * 3) as usize];
        let src: [(f32, f32); 5] = [
            (80.0, 60.0),
            (120.0, 60.0),
            (100.0, 85.0),
            (85.0, 110.0),
            (115.0, 110.0),
        ];
        for dy in 0..5u32 {
            for dx in 0..5u32 {
                let px = 78 + dx;
                let py = 58 + dy;
                let idx = ((py * w + px) * 3) as usize;
                data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        let frame = ImageFrame::from_rgb(data, w, h).unwrap();
        let aligned = align_face(&frame, &src);

        let ref_x = REFERENCE_LANDMARKS_112[0].0.round() as usize;
        let ref_y = REFERENCE_LANDMARKS_112[0].1.round() as usize;
        let mut max_val = 0u8;
        for y in ref_y - 1..=ref_y + 1 {
            for x in ref_x - 1..=ref_x + 1 {
                max_val = max_val.max(aligned[(y * ALIGNED_SIZE + x) * 3]);
            }
        }
        assert!(max_val > 100, "expected bright patch near ({ref_x}, {ref_y}), max={max_val}");
    }

    #[test]
    fn test_crop_face_samples_inside_box() {
        // Red square on blue background; cropping the square yields red.
        let (w, h) = (100u32, 100u32);
        let mut data = [0u8, 0, 255].repeat((w * h) as usize);
        for y in 20..60u32 {
            for x in 30..70u32 {
                let idx = ((y * w + x) * 3) as usize;
                data[idx..idx + 3].copy_from_slice(&[255, 0, 0]);
            }
        }
        let frame = ImageFrame::from_rgb(data, w, h).unwrap();
        let face = BoundingBox {
            x: 30.0, y: 20.0, width: 40.0, height: 40.0, confidence: 0.9, landmarks: None,
        };
        let crop = crop_face(&frame, &face);
        assert_eq!(crop.len(), ALIGNED_SIZE * ALIGNED_SIZE * 3);
        let mid = (56 * ALIGNED_SIZE + 56) * 3;
        assert_eq!(&crop[mid..mid + 3], &[255, 0, 0]);
    }

    #[test]
    fn test_fit_whole_pads_wide_frame() {
        // 200x100 frame fills the middle rows; top/bottom rows are padding.
        let frame = solid(200, 100, [90, 90, 90]);
        let out = fit_whole(&frame);
        assert_eq!(&out[0..3], &[0, 0, 0]);
        let mid = (56 * ALIGNED_SIZE + 56) * 3;
        assert_eq!(&out[mid..mid + 3], &[90, 90, 90]);
    }
}
