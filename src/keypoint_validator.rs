// src/keypoint_validator.rs
//
// Per-frame sanity filter for court keypoint detections. A confidence score
// cannot catch a detector that labels the wrong landmark with high
// confidence; comparing pairwise pixel distances against the known
// real-world distances of the claimed landmarks can.

use crate::court::{landmark_distance, NUM_KEYPOINTS};
use crate::types::CalibrationConfig;
use tracing::debug;

// A survivor set whose pixel spread collapses onto a line cannot anchor a
// homography even if it has four points.
const COLLINEARITY_EIGEN_RATIO: f32 = 1e-3;

/// Outcome of validating one frame's keypoints. `points` has the same
/// indexing as the input; rejected detections become `None`.
#[derive(Debug, Clone)]
pub struct ValidatedKeypoints {
    pub points: Vec<Option<[f32; 2]>>,
    /// True when enough geometrically consistent, non-collinear keypoints
    /// survived to attempt calibration.
    pub usable: bool,
}

impl ValidatedKeypoints {
    pub fn detected(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }
}

fn pixel_distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// The two nearest detected neighbours of `i`, by pixel distance, ties
/// broken by keypoint id so the filter is deterministic.
fn nearest_two(i: usize, detected: &[(usize, [f32; 2])]) -> Option<(usize, usize)> {
    let here = detected.iter().find(|(id, _)| *id == i)?.1;
    let mut others: Vec<(f32, usize)> = detected
        .iter()
        .filter(|(id, _)| *id != i)
        .map(|(id, p)| (pixel_distance(here, *p), *id))
        .collect();
    if others.len() < 2 {
        return None;
    }
    others.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some((others[0].1, others[1].1))
}

fn is_collinear(points: &[[f32; 2]]) -> bool {
    let n = points.len() as f32;
    let cx: f32 = points.iter().map(|p| p[0]).sum::<f32>() / n;
    let cy: f32 = points.iter().map(|p| p[1]).sum::<f32>() / n;

    let mut sxx = 0.0f32;
    let mut syy = 0.0f32;
    let mut sxy = 0.0f32;
    for p in points {
        let dx = p[0] - cx;
        let dy = p[1] - cy;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    let trace = sxx + syy;
    let disc = ((sxx - syy).powi(2) + 4.0 * sxy * sxy).sqrt();
    let lambda_max = (trace + disc) / 2.0;
    let lambda_min = (trace - disc) / 2.0;

    lambda_min <= lambda_max * COLLINEARITY_EIGEN_RATIO
}

/// Validate one frame's detected keypoints against the court's real
/// geometry. Pure function of the frame's input.
///
/// For every detected keypoint, the ratio of its pixel distances to its two
/// nearest detected neighbours is compared with the ratio of the
/// corresponding landmark distances in meters; a relative error beyond the
/// configured tolerance marks the keypoint as a mislabel. Rejection
/// decisions are made against the full detected set in a single pass.
pub fn validate_frame(raw: &[Option<[f32; 2]>], config: &CalibrationConfig) -> ValidatedKeypoints {
    let detected: Vec<(usize, [f32; 2])> = raw
        .iter()
        .enumerate()
        .take(NUM_KEYPOINTS)
        .filter_map(|(id, p)| p.map(|p| (id, p)))
        .collect();

    let mut points: Vec<Option<[f32; 2]>> = vec![None; NUM_KEYPOINTS];
    for (id, p) in &detected {
        points[*id] = Some(*p);
    }

    // Too few points to cross-check ratios; pass them through, the frame is
    // uncalibratable anyway when below the minimum. Rejections are decided
    // against the full detected set, then applied, so the outcome does not
    // depend on iteration order.
    if detected.len() >= 3 {
        let position_of = |id: usize| -> [f32; 2] {
            detected.iter().find(|(d, _)| *d == id).map(|(_, p)| *p).unwrap()
        };

        let mut rejected: Vec<usize> = Vec::new();
        for (id, p) in &detected {
            let (j, k) = match nearest_two(*id, &detected) {
                Some(pair) => pair,
                None => continue,
            };
            let pj = position_of(j);
            let pk = position_of(k);

            let px_jk = pixel_distance(*p, pk);
            if px_jk < f32::EPSILON {
                rejected.push(*id);
                continue;
            }
            let ratio_px = pixel_distance(*p, pj) / px_jk;

            let world_jk = landmark_distance(*id, k);
            let ratio_world = landmark_distance(*id, j) / world_jk;

            let error = (ratio_px - ratio_world).abs() / ratio_world;
            if error > config.ratio_tolerance {
                debug!(
                    "keypoint {} rejected: ratio {:.3} vs expected {:.3} (error {:.2})",
                    id, ratio_px, ratio_world, error
                );
                rejected.push(*id);
            }
        }
        for id in rejected {
            points[id] = None;
        }
    }

    let survivors: Vec<[f32; 2]> = points.iter().filter_map(|p| *p).collect();
    let usable = survivors.len() >= config.min_keypoints && !is_collinear(&survivors);

    ValidatedKeypoints { points, usable }
}
