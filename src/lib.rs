// src/lib.rs
//
// Calibration and event-inference core for basketball broadcast tracking.
//
// Signal flow:
//   DetectionBundle ─┬→ keypoint_validator → homography ──→ tactical_projector ──→ kinematics
//                    ├→ ball_filter ──→ ball_acquisition ──→ pass_detection
//                    └→ team labels ─────────────────────────┘
//
// Upstream object detection/tracking, video decode and rendering are
// external; this crate starts at their serialized output and ends at
// frame-indexed analytics.

pub mod ball_acquisition;
pub mod ball_filter;
pub mod bundle;
pub mod cache;
pub mod config;
pub mod court;
pub mod homography;
pub mod keypoint_validator;
pub mod kinematics;
pub mod pass_detection;
pub mod pipeline;
pub mod tactical_projector;
pub mod types;

pub use cache::{CacheKey, CacheStage, FileCache, ResultCache};
pub use homography::{CalibrationSource, FrameCalibration};
pub use pipeline::{analyze, AnalysisReport, VideoAnalysis};
pub use types::{
    BoundingBox, Config, CourtPosition, DetectionBundle, ExchangeEvent, ExchangeKind,
    FrameDetections, PlayerId, PlayerKinematics, TeamId,
};
