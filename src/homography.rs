// src/homography.rs
//
// Pixel-to-court homography estimation via DLT with Hartley normalization,
// plus the per-video calibration pass: parallel per-frame estimation
// followed by a sequential temporal-hold scan. The camera view changes
// slowly relative to frame rate, so a frame that fails estimation may reuse
// the nearest prior valid transform within a bounded lookback window.

use crate::court::REFERENCE_KEYPOINTS;
use crate::keypoint_validator::ValidatedKeypoints;
use crate::types::CalibrationConfig;
use nalgebra::{DMatrix, Matrix3, Vector3};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    Uncalibratable { detected: usize },
    NumericalFailure(String),
    ResidualTooHigh { residual_m: f64, limit_m: f64 },
}

impl std::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uncalibratable { detected } => {
                write!(f, "no usable keypoint set ({} validated)", detected)
            }
            Self::NumericalFailure(msg) => write!(f, "numerical failure: {}", msg),
            Self::ResidualTooHigh {
                residual_m,
                limit_m,
            } => {
                write!(
                    f,
                    "residual {:.3}m exceeds limit {:.3}m",
                    residual_m, limit_m
                )
            }
        }
    }
}

impl std::error::Error for CalibrationError {}

// ── Projection ───────────────────────────────────────────────────────────

/// Project a 2D point through a 3×3 homography: H * [x, y, 1]^T → [u, v].
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

/// Reprojection error: ||project(H, src) - dst||.
pub fn reprojection_error(h: &Matrix3<f64>, src: &[f64; 2], dst: &[f64; 2]) -> f64 {
    let p = project(h, src[0], src[1]);
    let dx = p[0] - dst[0];
    let dy = p[1] - dst[1];
    (dx * dx + dy * dy).sqrt()
}

/// RMS reprojection error over a correspondence set.
pub fn rms_residual(h: &Matrix3<f64>, src: &[[f64; 2]], dst: &[[f64; 2]]) -> f64 {
    if src.is_empty() {
        return f64::INFINITY;
    }
    let sum: f64 = src
        .iter()
        .zip(dst)
        .map(|(s, d)| reprojection_error(h, s, d).powi(2))
        .sum();
    (sum / src.len() as f64).sqrt()
}

// ── Hartley normalization ────────────────────────────────────────────────

/// Compute a normalizing transform: translate centroid to origin, scale so
/// mean distance from origin is sqrt(2).
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx: f64 = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy: f64 = pts.iter().map(|p| p[1]).sum::<f64>() / n;

    let mean_dist: f64 = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);

    let normalized: Vec<[f64; 2]> =
        pts.iter().map(|p| [s * (p[0] - cx), s * (p[1] - cy)]).collect();

    (t, normalized)
}

// ── DLT ──────────────────────────────────────────────────────────────────

/// Estimate a homography from ≥4 point correspondences using DLT.
///
/// `src`: pixel coordinates. `dst`: court coordinates in meters.
/// Returns H such that dst ≈ project(H, src).
pub fn estimate_homography(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
) -> Result<Matrix3<f64>, CalibrationError> {
    let n = src.len();
    if n < 4 || dst.len() != n {
        return Err(CalibrationError::NumericalFailure(
            "need ≥4 matched correspondences".into(),
        ));
    }

    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    // Build 2n × 9 matrix A
    let mut a = DMatrix::zeros(2 * n, 9);
    for i in 0..n {
        let (sx, sy) = (src_n[i][0], src_n[i][1]);
        let (dx, dy) = (dst_n[i][0], dst_n[i][1]);

        // Row 2i:   [  0  0  0 | -sx -sy -1 | dy*sx  dy*sy  dy ]
        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        // Row 2i+1: [ sx  sy  1 |  0  0  0 | -dx*sx -dx*sy -dx ]
        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // The solution is the eigenvector of A^T A with the smallest eigenvalue.
    let ata = a.transpose() * &a;
    let eig = nalgebra::SymmetricEigen::new(ata);

    let mut min_idx = 0;
    let mut min_val = eig.eigenvalues[0].abs();
    for i in 1..9 {
        let v = eig.eigenvalues[i].abs();
        if v < min_val {
            min_val = v;
            min_idx = i;
        }
    }
    let h_vec: Vec<f64> = (0..9).map(|j| eig.eigenvectors[(j, min_idx)]).collect();
    let h_norm = Matrix3::new(
        h_vec[0], h_vec[1], h_vec[2],
        h_vec[3], h_vec[4], h_vec[5],
        h_vec[6], h_vec[7], h_vec[8],
    );

    // Denormalize: H = T_dst^-1 * H_norm * T_src
    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| CalibrationError::NumericalFailure("T_dst not invertible".into()))?;
    let h = t_dst_inv * h_norm * t_src;

    if h.iter().any(|v| !v.is_finite()) {
        return Err(CalibrationError::NumericalFailure(
            "non-finite homography entries".into(),
        ));
    }

    // Normalize so h[2][2] = 1 (if possible)
    let scale = h[(2, 2)];
    if scale.abs() < 1e-15 {
        Ok(h)
    } else {
        Ok(h / scale)
    }
}

// ── Per-frame calibration ────────────────────────────────────────────────

/// Where a frame's transform came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalibrationSource {
    /// Estimated from this frame's own keypoints.
    Estimated,
    /// Reused from the nearest prior valid frame, `age` frames back.
    HeldOver { age: usize },
    /// No transform available within the lookback window.
    None,
}

/// One frame's calibration result. Owned by the frame, never mutated after
/// the calibration pass.
#[derive(Debug, Clone)]
pub struct FrameCalibration {
    pub homography: Option<Matrix3<f64>>,
    pub source: CalibrationSource,
    /// RMS reprojection residual in meters; only set for `Estimated`.
    pub residual_m: Option<f64>,
}

impl FrameCalibration {
    pub fn is_usable(&self) -> bool {
        self.homography.is_some()
    }
}

/// Attempt a homography for one frame from its validated keypoints.
fn estimate_frame(
    validated: &ValidatedKeypoints,
    config: &CalibrationConfig,
) -> Result<(Matrix3<f64>, f64), CalibrationError> {
    if !validated.usable {
        return Err(CalibrationError::Uncalibratable {
            detected: validated.detected(),
        });
    }

    let mut src: Vec<[f64; 2]> = Vec::new();
    let mut dst: Vec<[f64; 2]> = Vec::new();
    for (id, p) in validated.points.iter().enumerate() {
        if let Some(px) = p {
            src.push([px[0] as f64, px[1] as f64]);
            dst.push([
                REFERENCE_KEYPOINTS[id][0] as f64,
                REFERENCE_KEYPOINTS[id][1] as f64,
            ]);
        }
    }

    let h = estimate_homography(&src, &dst)?;
    let residual = rms_residual(&h, &src, &dst);
    if !residual.is_finite() {
        return Err(CalibrationError::NumericalFailure(
            "non-finite residual".into(),
        ));
    }
    if residual > config.max_residual_m {
        return Err(CalibrationError::ResidualTooHigh {
            residual_m: residual,
            limit_m: config.max_residual_m,
        });
    }

    Ok((h, residual))
}

/// Calibrate every frame of a video.
///
/// Per-frame estimation is a pure function of that frame's keypoints and
/// runs in parallel; the temporal-hold fallback depends on ordered access
/// and runs as a sequential scan with the carried state
/// `last_valid: (homography, frame)` made explicit.
pub fn calibrate_frames(
    frames: &[ValidatedKeypoints],
    config: &CalibrationConfig,
) -> Vec<FrameCalibration> {
    let estimates: Vec<Result<(Matrix3<f64>, f64), CalibrationError>> = frames
        .par_iter()
        .map(|validated| estimate_frame(validated, config))
        .collect();

    let mut out = Vec::with_capacity(frames.len());
    let mut last_valid: Option<(Matrix3<f64>, usize)> = None;

    for (idx, estimate) in estimates.into_iter().enumerate() {
        match estimate {
            Ok((h, residual)) => {
                last_valid = Some((h, idx));
                out.push(FrameCalibration {
                    homography: Some(h),
                    source: CalibrationSource::Estimated,
                    residual_m: Some(residual),
                });
            }
            Err(e) => {
                debug!("frame {}: calibration failed: {}", idx, e);
                match last_valid {
                    Some((h, at)) if idx - at <= config.hold_lookback_frames => {
                        out.push(FrameCalibration {
                            homography: Some(h),
                            source: CalibrationSource::HeldOver { age: idx - at },
                            residual_m: None,
                        });
                    }
                    _ => {
                        out.push(FrameCalibration {
                            homography: None,
                            source: CalibrationSource::None,
                            residual_m: None,
                        });
                    }
                }
            }
        }
    }

    out
}

// ── Tests ────────────────────────────────────────────────────────────────
