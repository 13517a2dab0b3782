// src/tactical_projector.rs
//
// Projects tracked player boxes into court meters through each frame's
// calibration. The anchor is the box bottom-center (ground contact).
// Projections far outside the court indicate a tracking or calibration
// error; they are flagged rather than silently accepted.

use crate::court::{COURT_LENGTH_M, COURT_WIDTH_M};
use crate::homography::{project, FrameCalibration};
use crate::types::{CourtPosition, FrameDetections, PlayerId, ProjectionConfig};
use std::collections::HashMap;
use tracing::debug;

/// Project one pixel anchor through a homography.
fn project_anchor(
    calibration: &FrameCalibration,
    anchor: (f32, f32),
    config: &ProjectionConfig,
) -> Option<CourtPosition> {
    let h = calibration.homography.as_ref()?;
    let court = project(h, anchor.0 as f64, anchor.1 as f64);
    if !court[0].is_finite() || !court[1].is_finite() {
        return None;
    }

    let x = court[0] as f32;
    let y = court[1] as f32;
    let tol = config.bounds_tolerance_m;
    let in_bounds = x >= -tol && x <= COURT_LENGTH_M + tol && y >= -tol && y <= COURT_WIDTH_M + tol;

    Some(CourtPosition { x, y, in_bounds })
}

/// Tactical positions for every (player, frame) with a track and a usable
/// calibration. Frames without a homography contribute nothing; implausible
/// projections are kept but flagged for the diagnostics output.
pub fn project_players(
    frames: &[FrameDetections],
    calibrations: &[FrameCalibration],
    config: &ProjectionConfig,
) -> Vec<HashMap<PlayerId, CourtPosition>> {
    frames
        .iter()
        .zip(calibrations)
        .enumerate()
        .map(|(frame_idx, (detections, calibration))| {
            let mut positions = HashMap::new();
            if !calibration.is_usable() {
                return positions;
            }
            for (&player_id, bbox) in &detections.players {
                if let Some(pos) = project_anchor(calibration, bbox.bottom_center(), config) {
                    if !pos.in_bounds {
                        debug!(
                            "frame {}: player {} projected off-court at ({:.1}, {:.1})",
                            frame_idx, player_id, pos.x, pos.y
                        );
                    }
                    positions.insert(player_id, pos);
                }
            }
            positions
        })
        .collect()
}
