// src/kinematics.rs
//
// Per-player speed and cumulative distance from projected trajectories.
// A distance delta exists only between valid samples on consecutive
// frames; a gap (missing frame, no calibration, flagged projection) is
// treated as "no motion sample available", never interpolated into a
// fabricated displacement. Instantaneous speed is smoothed with a short
// trailing window to suppress projection jitter.

use crate::types::{CourtPosition, KinematicsConfig, PlayerId, PlayerKinematics};
use std::collections::{HashMap, VecDeque};

struct PlayerMotion {
    last: Option<(usize, f32, f32)>,
    speed_window: VecDeque<f32>,
    cumulative_m: f32,
}

impl PlayerMotion {
    fn new() -> Self {
        Self {
            last: None,
            speed_window: VecDeque::new(),
            cumulative_m: 0.0,
        }
    }
}

/// Compute smoothed speed and running distance for every player across the
/// whole video. Must run as an ordered scan: every delta depends on the
/// previous valid sample.
pub fn compute_kinematics(
    positions: &[HashMap<PlayerId, CourtPosition>],
    fps: f64,
    config: &KinematicsConfig,
) -> Vec<HashMap<PlayerId, PlayerKinematics>> {
    let window = config.smoothing_window.max(1);
    let mut motion: HashMap<PlayerId, PlayerMotion> = HashMap::new();
    let mut out = Vec::with_capacity(positions.len());

    for (frame, frame_positions) in positions.iter().enumerate() {
        let mut records = HashMap::new();

        for (&player_id, pos) in frame_positions {
            if !pos.in_bounds {
                continue;
            }
            let state = motion.entry(player_id).or_insert_with(PlayerMotion::new);

            match state.last {
                Some((last_frame, lx, ly)) if frame == last_frame + 1 => {
                    let delta = ((pos.x - lx).powi(2) + (pos.y - ly).powi(2)).sqrt();
                    state.cumulative_m += delta;
                    state.speed_window.push_back(delta * fps as f32);
                    if state.speed_window.len() > window {
                        state.speed_window.pop_front();
                    }
                }
                _ => {
                    // First sample, or a gap: no delta, and the smoothing
                    // window restarts so stale speeds don't leak across.
                    state.speed_window.clear();
                }
            }
            state.last = Some((frame, pos.x, pos.y));

            let speed = if state.speed_window.is_empty() {
                0.0
            } else {
                state.speed_window.iter().sum::<f32>() / state.speed_window.len() as f32
            };

            records.insert(
                player_id,
                PlayerKinematics {
                    speed_mps: speed,
                    cumulative_distance_m: state.cumulative_m,
                },
            );
        }

        out.push(records);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FPS: f64 = 30.0;

    fn pos(x: f32, y: f32) -> CourtPosition {
        CourtPosition {
            x,
            y,
            in_bounds: true,
        }
    }

    fn single_player_track(samples: &[Option<CourtPosition>]) -> Vec<HashMap<PlayerId, CourtPosition>> {
        samples
            .iter()
            .map(|s| match s {
                Some(p) => [(1u32, *p)].into_iter().collect(),
                None => HashMap::new(),
            })
            .collect()
    }

    #[test]
    fn test_constant_velocity() {
        // 0.1 m per frame at 30 fps = 3.0 m/s.
        let samples: Vec<Option<CourtPosition>> =
            (0..10).map(|i| Some(pos(i as f32 * 0.1, 7.5))).collect();
        let frames = single_player_track(&samples);

        let kinematics = compute_kinematics(&frames, FPS, &KinematicsConfig::default());

        let last = kinematics[9][&1];
        assert_relative_eq!(last.speed_mps, 3.0, epsilon = 1e-4);
        assert_relative_eq!(last.cumulative_distance_m, 0.9, epsilon = 1e-4);
    }

    #[test]
    fn test_gap_contributes_no_distance() {
        // Valid at frames 0-2, gap at 3-4, valid again at 5-6. The jump
        // across the gap must not appear in the running distance.
        let samples = vec![
            Some(pos(0.0, 7.5)),
            Some(pos(0.1, 7.5)),
            Some(pos(0.2, 7.5)),
            None,
            None,
            Some(pos(5.0, 7.5)),
            Some(pos(5.1, 7.5)),
        ];
        let frames = single_player_track(&samples);

        let kinematics = compute_kinematics(&frames, FPS, &KinematicsConfig::default());

        // Resumption frame: no delta, speed reset.
        let resumed = kinematics[5][&1];
        assert_relative_eq!(resumed.cumulative_distance_m, 0.2, epsilon = 1e-4);
        assert_relative_eq!(resumed.speed_mps, 0.0, epsilon = 1e-6);

        // Only the consecutive pair 5→6 adds distance after the gap.
        let after = kinematics[6][&1];
        assert_relative_eq!(after.cumulative_distance_m, 0.3, epsilon = 1e-4);
    }

    #[test]
    fn test_cumulative_distance_is_monotonic() {
        let samples = vec![
            Some(pos(0.0, 0.0)),
            Some(pos(0.5, 0.5)),
            None,
            Some(pos(3.0, 3.0)),
            Some(pos(3.2, 3.1)),
            Some(pos(3.2, 3.1)),
        ];
        let frames = single_player_track(&samples);

        let kinematics = compute_kinematics(&frames, FPS, &KinematicsConfig::default());

        let mut previous = 0.0f32;
        for frame in &kinematics {
            if let Some(k) = frame.get(&1) {
                assert!(k.cumulative_distance_m >= previous);
                previous = k.cumulative_distance_m;
            }
        }
    }

    #[test]
    fn test_flagged_positions_are_excluded() {
        let mut frames = single_player_track(&[
            Some(pos(1.0, 7.5)),
            Some(pos(1.1, 7.5)),
            Some(pos(1.2, 7.5)),
        ]);
        // Frame 1's projection was implausible.
        frames[1].insert(
            1,
            CourtPosition {
                x: 40.0,
                y: 7.5,
                in_bounds: false,
            },
        );

        let kinematics = compute_kinematics(&frames, FPS, &KinematicsConfig::default());

        assert!(!kinematics[1].contains_key(&1));
        // Frame 2 follows a gap: cumulative unchanged from frame 0.
        assert_relative_eq!(kinematics[2][&1].cumulative_distance_m, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rolling_window_smooths_jitter() {
        // Alternating 0.05 m and 0.15 m steps: raw speeds 1.5 / 4.5 m/s,
        // the 4-frame window settles at 3.0 m/s.
        let mut x = 0.0f32;
        let mut samples = vec![Some(pos(x, 7.5))];
        for i in 0..8 {
            x += if i % 2 == 0 { 0.05 } else { 0.15 };
            samples.push(Some(pos(x, 7.5)));
        }
        let frames = single_player_track(&samples);

        let config = KinematicsConfig {
            smoothing_window: 4,
        };
        let kinematics = compute_kinematics(&frames, FPS, &config);

        let last = kinematics[8][&1];
        assert_relative_eq!(last.speed_mps, 3.0, epsilon = 1e-3);
    }
}
