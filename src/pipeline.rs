// src/pipeline.rs
//
// Wires the analysis stages together for one video:
//
//   DetectionBundle ─┬→ keypoint_validator → homography ──→ tactical_projector ──→ kinematics
//                    ├→ ball_filter ──→ ball_acquisition ──→ pass_detection
//                    └→ team labels ─────────────────────────┘
//
// Per-frame validation and homography estimation run in parallel inside
// calibrate_frames; every temporally dependent stage is an ordered scan.
// All stage outputs are write-once.

use crate::ball_acquisition::detect_possession;
use crate::ball_filter::sanitize_ball_track;
use crate::cache::{read_through, CacheKey, CacheStage, ResultCache};
use crate::homography::{calibrate_frames, CalibrationSource, FrameCalibration};
use crate::keypoint_validator::{validate_frame, ValidatedKeypoints};
use crate::kinematics::compute_kinematics;
use crate::pass_detection::{detect_exchanges, team_control, TeamControl};
use crate::tactical_projector::project_players;
use crate::types::{
    Config, CourtPosition, DetectionBundle, ExchangeEvent, ExchangeKind, PlayerId,
    PlayerKinematics,
};
use anyhow::Result;
use std::collections::HashMap;
use tracing::{info, warn};

/// Everything the core derives for one video, indexed by frame and
/// consumable independently of how it was computed.
pub struct VideoAnalysis {
    pub video_id: String,
    pub fps: f64,
    pub calibrations: Vec<FrameCalibration>,
    pub positions: Vec<HashMap<PlayerId, CourtPosition>>,
    pub possession: Vec<Option<PlayerId>>,
    pub exchanges: Vec<ExchangeEvent>,
    pub control: TeamControl,
    pub kinematics: Vec<HashMap<PlayerId, PlayerKinematics>>,
}

pub struct AnalysisReport {
    pub total_frames: usize,
    pub estimated_frames: usize,
    pub held_frames: usize,
    pub uncalibrated_frames: usize,
    pub possession_frames: usize,
    pub passes: usize,
    pub interceptions: usize,
}

impl VideoAnalysis {
    pub fn report(&self) -> AnalysisReport {
        let mut estimated = 0;
        let mut held = 0;
        for c in &self.calibrations {
            match c.source {
                CalibrationSource::Estimated => estimated += 1,
                CalibrationSource::HeldOver { .. } => held += 1,
                CalibrationSource::None => {}
            }
        }
        AnalysisReport {
            total_frames: self.calibrations.len(),
            estimated_frames: estimated,
            held_frames: held,
            uncalibrated_frames: self.calibrations.len() - estimated - held,
            possession_frames: self.possession.iter().filter(|p| p.is_some()).count(),
            passes: self
                .exchanges
                .iter()
                .filter(|e| e.kind == ExchangeKind::Pass)
                .count(),
            interceptions: self
                .exchanges
                .iter()
                .filter(|e| e.kind == ExchangeKind::Interception)
                .count(),
        }
    }
}

/// Run the full analysis for one bundle. The cache, when present, serves
/// the possession stage read-through; a hit must reproduce a prior valid
/// computation exactly, so everything derived from it stays consistent.
pub fn analyze(
    bundle: &DetectionBundle,
    config: &Config,
    cache: Option<&dyn ResultCache>,
) -> Result<VideoAnalysis> {
    let frames = bundle.frames.len();

    let raw_ball: Vec<_> = bundle.frames.iter().map(|f| f.ball).collect();
    let ball_track = sanitize_ball_track(&raw_ball, &config.ball_filter);

    let empty: Vec<Option<[f32; 2]>> = Vec::new();
    let validated: Vec<ValidatedKeypoints> = (0..frames)
        .map(|i| {
            let raw = bundle.keypoints.get(i).unwrap_or(&empty);
            validate_frame(raw, &config.calibration)
        })
        .collect();

    let calibrations = calibrate_frames(&validated, &config.calibration);
    let positions = project_players(&bundle.frames, &calibrations, &config.projection);

    let mut possession = read_through(
        cache,
        &CacheKey::new(bundle.video_id.as_str(), CacheStage::Possession),
        || detect_possession(&bundle.frames, &ball_track, &config.possession),
    )?;
    if possession.len() != frames {
        warn!(
            "{}: cached possession covers {}/{} frames; recomputing",
            bundle.video_id,
            possession.len(),
            frames
        );
        possession = detect_possession(&bundle.frames, &ball_track, &config.possession);
    }

    let exchanges = detect_exchanges(&possession, &bundle.teams);
    let control = team_control(&possession, &bundle.teams);
    let kinematics = compute_kinematics(&positions, bundle.fps, &config.kinematics);

    info!(
        "{}: {} frames analyzed, {} exchange event(s)",
        bundle.video_id,
        frames,
        exchanges.len()
    );

    Ok(VideoAnalysis {
        video_id: bundle.video_id.clone(),
        fps: bundle.fps,
        calibrations,
        positions,
        possession,
        exchanges,
        control,
        kinematics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::court::{NUM_KEYPOINTS, REFERENCE_KEYPOINTS};
    use crate::types::{BallFilterConfig, BoundingBox, FrameDetections, PossessionConfig};
    use approx::assert_relative_eq;

    const SCALE: f32 = 40.0;

    fn keypoints_for_frame() -> Vec<Option<[f32; 2]>> {
        let mut raw = vec![None; NUM_KEYPOINTS];
        for &id in &[0usize, 3, 7, 10, 14, 17] {
            let p = REFERENCE_KEYPOINTS[id];
            raw[id] = Some([p[0] * SCALE, p[1] * SCALE]);
        }
        raw
    }

    fn player_box(anchor_x: f32, anchor_y: f32) -> BoundingBox {
        BoundingBox {
            x1: anchor_x - 30.0,
            y1: anchor_y - 180.0,
            x2: anchor_x + 30.0,
            y2: anchor_y,
        }
    }

    fn ball_box(x: f32, y: f32) -> BoundingBox {
        BoundingBox {
            x1: x - 8.0,
            y1: y - 8.0,
            x2: x + 8.0,
            y2: y + 8.0,
        }
    }

    /// Two static players on opposing teams; the ball sits with player 1
    /// for six frames, then with player 2 for six frames.
    fn interception_bundle() -> DetectionBundle {
        let mut frames = Vec::new();
        for i in 0..12 {
            let ball = if i < 6 {
                ball_box(200.0, 300.0)
            } else {
                ball_box(600.0, 300.0)
            };
            let mut detections = FrameDetections {
                players: HashMap::new(),
                ball: Some(ball),
            };
            detections.players.insert(1, player_box(200.0, 300.0));
            detections.players.insert(2, player_box(600.0, 300.0));
            frames.push(detections);
        }

        let n = frames.len();
        DetectionBundle {
            video_id: "test_game".to_string(),
            fps: 30.0,
            frames,
            keypoints: (0..n).map(|_| keypoints_for_frame()).collect(),
            teams: (0..n)
                .map(|_| [(1u32, 0u8), (2u32, 1u8)].into_iter().collect())
                .collect(),
        }
    }

    fn test_config() -> Config {
        Config {
            possession: PossessionConfig {
                min_confirm_frames: 5,
                ..PossessionConfig::default()
            },
            // The synthetic ball teleports between holders; don't let the
            // jump filter eat the handover.
            ball_filter: BallFilterConfig { max_jump_px: 500.0 },
            ..Config::default()
        }
    }

    #[test]
    fn test_end_to_end_interception() {
        let bundle = interception_bundle();
        let analysis = analyze(&bundle, &test_config(), None).unwrap();

        // Every frame calibrates from its own keypoints.
        assert!(analysis
            .calibrations
            .iter()
            .all(|c| c.source == CalibrationSource::Estimated));

        // Pixel anchors land on the expected court coordinates (40 px/m).
        let p1 = analysis.positions[0][&1];
        assert_relative_eq!(p1.x, 5.0, epsilon = 1e-3);
        assert_relative_eq!(p1.y, 7.5, epsilon = 1e-3);
        assert!(p1.in_bounds);

        // Possession confirms after the debounce run, then hands over once.
        assert_eq!(analysis.possession[3], None);
        assert_eq!(analysis.possession[4], Some(1));
        assert_eq!(analysis.possession[9], Some(1));
        assert_eq!(analysis.possession[10], Some(2));

        // Exactly one event, classified by the opposing team labels.
        assert_eq!(analysis.exchanges.len(), 1);
        let event = analysis.exchanges[0];
        assert_eq!(event.kind, ExchangeKind::Interception);
        assert_eq!(event.from_player, 1);
        assert_eq!(event.to_player, 2);
        assert_eq!(event.start_frame, 9);
        assert_eq!(event.end_frame, 10);

        // Static players accumulate no distance.
        assert_relative_eq!(
            analysis.kinematics[11][&1].cumulative_distance_m,
            0.0,
            epsilon = 1e-4
        );

        let report = analysis.report();
        assert_eq!(report.total_frames, 12);
        assert_eq!(report.estimated_frames, 12);
        assert_eq!(report.interceptions, 1);
        assert_eq!(report.passes, 0);
    }

    #[test]
    fn test_uncalibratable_video_still_produces_events() {
        // No keypoints at all: no tactical data, but possession and events
        // work from pixel space alone.
        let mut bundle = interception_bundle();
        bundle.keypoints = (0..bundle.frames.len()).map(|_| Vec::new()).collect();

        let analysis = analyze(&bundle, &test_config(), None).unwrap();

        assert!(analysis.positions.iter().all(|p| p.is_empty()));
        assert_eq!(analysis.exchanges.len(), 1);
        let report = analysis.report();
        assert_eq!(report.uncalibrated_frames, 12);
    }

    #[test]
    fn test_possession_read_through_cache() {
        use crate::cache::FileCache;

        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let bundle = interception_bundle();
        let config = test_config();

        let first = analyze(&bundle, &config, Some(&cache as &dyn ResultCache)).unwrap();
        let second = analyze(&bundle, &config, Some(&cache as &dyn ResultCache)).unwrap();

        assert_eq!(first.possession, second.possession);
        assert_eq!(first.exchanges, second.exchanges);
    }
}
