// src/ball_acquisition.rs
//
// Frame-by-frame ball possession assignment.
//
// Candidate selection per frame:
//   1. A player whose box contains the ball (intersection / ball area above
//      the containment threshold) is the candidate; best ratio wins.
//   2. Otherwise the player with the smallest distance from the ball center
//      to a lower-body contact point, and only if that distance is below an
//      absolute proximity threshold. "Nearest of all players" alone is
//      never enough.
//
// Confirmation is debounced: a new candidate must stay the candidate for
// min_confirm_frames consecutive frames before it replaces the confirmed
// possessor. Until then the previous confirmed possessor is reported
// (sticky assignment), which keeps possession from toggling when the ball
// passes near several players at once. Frames without a ball detection
// report no possessor and leave the machine untouched.

use crate::types::{BoundingBox, FrameDetections, PlayerId, PossessionConfig};
use std::collections::HashMap;
use tracing::{debug, info};

/// Candidate possessor for a single frame, or None when the ball is loose.
pub fn frame_candidate(
    players: &HashMap<PlayerId, BoundingBox>,
    ball: &BoundingBox,
    config: &PossessionConfig,
) -> Option<PlayerId> {
    let ball_area = ball.area();

    if ball_area > 0.0 {
        let mut best: Option<(f32, PlayerId)> = None;
        for (&id, bbox) in players {
            let ratio = bbox.intersection_area(ball) / ball_area;
            if ratio < config.containment_threshold {
                continue;
            }
            let beat = match best {
                Some((best_ratio, best_id)) => {
                    ratio > best_ratio || (ratio == best_ratio && id < best_id)
                }
                None => true,
            };
            if beat {
                best = Some((ratio, id));
            }
        }
        if let Some((_, id)) = best {
            return Some(id);
        }
    }

    let (bx, by) = ball.center();
    let mut nearest: Option<(f32, PlayerId)> = None;
    for (&id, bbox) in players {
        let dist = contact_points(bbox)
            .iter()
            .map(|(px, py)| ((px - bx).powi(2) + (py - by).powi(2)).sqrt())
            .fold(f32::INFINITY, f32::min);
        let beat = match nearest {
            Some((best_dist, best_id)) => dist < best_dist || (dist == best_dist && id < best_id),
            None => true,
        };
        if beat {
            nearest = Some((dist, id));
        }
    }

    match nearest {
        Some((dist, id)) if dist < config.proximity_threshold_px => Some(id),
        _ => None,
    }
}

/// Points near the lower body where a held ball sits.
fn contact_points(bbox: &BoundingBox) -> [(f32, f32); 5] {
    let (cx, _) = bbox.center();
    let knee_y = bbox.y1 + bbox.height() * 0.75;
    [
        (bbox.x1, bbox.y2),
        (cx, bbox.y2),
        (bbox.x2, bbox.y2),
        (bbox.x1, knee_y),
        (bbox.x2, knee_y),
    ]
}

/// Debounce state machine: confirmed possessor, current candidate and the
/// candidate's consecutive run length, threaded explicitly through the
/// per-frame scan.
pub struct PossessionTracker {
    config: PossessionConfig,
    confirmed: Option<PlayerId>,
    candidate: Option<PlayerId>,
    candidate_run: u32,
}

impl PossessionTracker {
    pub fn new(config: PossessionConfig) -> Self {
        Self {
            config,
            confirmed: None,
            candidate: None,
            candidate_run: 0,
        }
    }

    /// Feed one frame's observation; returns the possession record for that
    /// frame. `ball_seen == false` yields no possessor and neither resets
    /// the confirmed state nor advances the candidate run.
    pub fn advance(&mut self, ball_seen: bool, candidate: Option<PlayerId>) -> Option<PlayerId> {
        if !ball_seen {
            return None;
        }

        match candidate {
            Some(c) if self.confirmed == Some(c) => {
                self.candidate = None;
                self.candidate_run = 0;
            }
            Some(c) => {
                if self.candidate == Some(c) {
                    self.candidate_run += 1;
                } else {
                    self.candidate = Some(c);
                    self.candidate_run = 1;
                }
                if self.candidate_run >= self.config.min_confirm_frames {
                    info!(
                        "possession: {:?} → {} after {} consecutive frames",
                        self.confirmed, c, self.candidate_run
                    );
                    self.confirmed = Some(c);
                    self.candidate = None;
                    self.candidate_run = 0;
                } else {
                    debug!(
                        "possession candidate {} run {}/{}",
                        c, self.candidate_run, self.config.min_confirm_frames
                    );
                }
            }
            None => {
                // Loose ball: the run is broken, the confirmed possessor sticks.
                self.candidate = None;
                self.candidate_run = 0;
            }
        }

        self.confirmed
    }

    pub fn confirmed(&self) -> Option<PlayerId> {
        self.confirmed
    }
}

/// Possession record for every frame of a video. The ball track is passed
/// separately so the sanitized track (ball_filter) is used rather than the
/// raw detections.
pub fn detect_possession(
    frames: &[FrameDetections],
    ball_track: &[Option<BoundingBox>],
    config: &PossessionConfig,
) -> Vec<Option<PlayerId>> {
    let mut tracker = PossessionTracker::new(config.clone());
    frames
        .iter()
        .zip(ball_track)
        .map(|(detections, ball)| match ball {
            Some(ball) => {
                let candidate = frame_candidate(&detections.players, ball, config);
                tracker.advance(true, candidate)
            }
            None => tracker.advance(false, None),
        })
        .collect()
}
