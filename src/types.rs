// src/types.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type PlayerId = u32;
pub type TeamId = u8;
pub type FrameIndex = usize;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub possession: PossessionConfig,
    #[serde(default)]
    pub ball_filter: BallFilterConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub kinematics: KinematicsConfig,
    #[serde(default)]
    pub io: IoConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Minimum validated keypoints required to attempt a homography.
    pub min_keypoints: usize,
    /// Relative tolerance on pixel-vs-real pairwise distance ratios during
    /// keypoint validation. A keypoint whose ratio error exceeds this is
    /// treated as a detector mislabel and dropped.
    pub ratio_tolerance: f32,
    /// Maximum RMS reprojection residual (court meters) for an accepted fit.
    pub max_residual_m: f64,
    /// How many frames back a held-over homography may reach.
    pub hold_lookback_frames: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_keypoints: 4,
            ratio_tolerance: 0.8,
            max_residual_m: 0.5,
            hold_lookback_frames: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PossessionConfig {
    /// Fraction of the ball box that must overlap a player box for
    /// containment-based assignment.
    pub containment_threshold: f32,
    /// Maximum pixel distance from ball center to a player's contact points
    /// for proximity-based assignment.
    pub proximity_threshold_px: f32,
    /// Consecutive frames a new candidate must persist before it replaces
    /// the confirmed possessor.
    pub min_confirm_frames: u32,
}

impl Default for PossessionConfig {
    fn default() -> Self {
        Self {
            containment_threshold: 0.8,
            proximity_threshold_px: 50.0,
            min_confirm_frames: 11,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallFilterConfig {
    /// Maximum plausible ball-center travel per frame of gap, in pixels.
    /// Detections jumping farther than this are discarded as mislabels.
    pub max_jump_px: f32,
}

impl Default for BallFilterConfig {
    fn default() -> Self {
        Self { max_jump_px: 25.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Meters outside the court rectangle a projected position may fall
    /// before it is flagged implausible.
    pub bounds_tolerance_m: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            bounds_tolerance_m: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinematicsConfig {
    /// Trailing window (frames) for the rolling speed average.
    pub smoothing_window: usize,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    pub input_dir: String,
    pub output_dir: String,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_dir: "input_bundles".to_string(),
            output_dir: "output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "stubs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Axis-aligned pixel rectangle from the upstream tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Ground-contact anchor: bottom-center of the box.
    pub fn bottom_center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, self.y2)
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        w * h
    }
}

/// One frame of tracked objects, as delivered by the detection collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameDetections {
    #[serde(default)]
    pub players: HashMap<PlayerId, BoundingBox>,
    #[serde(default)]
    pub ball: Option<BoundingBox>,
}

/// Serialized input contract: everything the external trackers and the team
/// assigner produced for one video, fully buffered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionBundle {
    pub video_id: String,
    pub fps: f64,
    pub frames: Vec<FrameDetections>,
    /// Per frame: keypoint id → detected pixel coordinate (None = not visible).
    #[serde(default)]
    pub keypoints: Vec<Vec<Option<[f32; 2]>>>,
    /// Per frame: player id → team label from the team-assignment collaborator.
    #[serde(default)]
    pub teams: Vec<HashMap<PlayerId, TeamId>>,
}

/// A player's location in court meters for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourtPosition {
    pub x: f32,
    pub y: f32,
    /// False when the projection landed outside the court by more than the
    /// configured tolerance. Kept for diagnostics, excluded from kinematics.
    pub in_bounds: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeKind {
    Pass,
    Interception,
}

impl ExchangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Interception => "INTERCEPTION",
        }
    }
}

/// A confirmed possession change between two players. Immutable once emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeEvent {
    pub kind: ExchangeKind,
    pub start_frame: FrameIndex,
    pub end_frame: FrameIndex,
    pub from_player: PlayerId,
    pub to_player: PlayerId,
    pub from_team: TeamId,
    pub to_team: TeamId,
}

/// Smoothed speed and running distance for one player at one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerKinematics {
    pub speed_mps: f32,
    pub cumulative_distance_m: f32,
}
