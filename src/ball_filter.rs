// src/ball_filter.rs
//
// Sanitizes the raw ball track before possession detection. Two passes:
// first discard detections whose center teleports further than the ball
// could plausibly travel, then fill interior gaps by linear interpolation
// between the surrounding accepted boxes. The ball moves ballistically
// between detections, so interpolating it is sound; player trajectories
// are never interpolated.

use crate::types::{BallFilterConfig, BoundingBox};
use tracing::debug;

fn center_distance(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let (ax, ay) = a.center();
    let (bx, by) = b.center();
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

fn remove_wrong_detections(
    track: &[Option<BoundingBox>],
    config: &BallFilterConfig,
) -> Vec<Option<BoundingBox>> {
    let mut out: Vec<Option<BoundingBox>> = Vec::with_capacity(track.len());
    let mut last_accepted: Option<(usize, BoundingBox)> = None;
    let mut dropped = 0usize;

    for (idx, entry) in track.iter().enumerate() {
        match entry {
            Some(bbox) => {
                let plausible = match &last_accepted {
                    Some((at, prev)) => {
                        let gap = (idx - at) as f32;
                        center_distance(prev, bbox) <= config.max_jump_px * gap
                    }
                    None => true,
                };
                if plausible {
                    last_accepted = Some((idx, *bbox));
                    out.push(Some(*bbox));
                } else {
                    dropped += 1;
                    out.push(None);
                }
            }
            None => out.push(None),
        }
    }

    if dropped > 0 {
        debug!("ball filter dropped {} implausible detection(s)", dropped);
    }
    out
}

fn lerp_box(a: &BoundingBox, b: &BoundingBox, t: f32) -> BoundingBox {
    BoundingBox {
        x1: a.x1 + (b.x1 - a.x1) * t,
        y1: a.y1 + (b.y1 - a.y1) * t,
        x2: a.x2 + (b.x2 - a.x2) * t,
        y2: a.y2 + (b.y2 - a.y2) * t,
    }
}

fn interpolate_gaps(track: &[Option<BoundingBox>]) -> Vec<Option<BoundingBox>> {
    let mut out = track.to_vec();
    let mut prev_some: Option<usize> = None;

    for idx in 0..out.len() {
        if out[idx].is_none() {
            continue;
        }
        if let Some(at) = prev_some {
            if idx - at > 1 {
                let a = out[at].unwrap();
                let b = out[idx].unwrap();
                for gap in (at + 1)..idx {
                    let t = (gap - at) as f32 / (idx - at) as f32;
                    out[gap] = Some(lerp_box(&a, &b, t));
                }
            }
        }
        prev_some = Some(idx);
    }

    // Leading and trailing gaps are left missing: there is nothing on the
    // other side to interpolate toward.
    out
}

/// Full sanitation pass: jump rejection, then interior interpolation.
pub fn sanitize_ball_track(
    track: &[Option<BoundingBox>],
    config: &BallFilterConfig,
) -> Vec<Option<BoundingBox>> {
    interpolate_gaps(&remove_wrong_detections(track, config))
}
