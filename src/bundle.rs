// src/bundle.rs
//
// Loading of serialized detection bundles — the input contract with the
// upstream tracking and team-assignment collaborators.

use crate::types::DetectionBundle;
use anyhow::{ensure, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// All detection bundles under a directory, sorted for a stable run order.
pub fn find_bundles(input_dir: &str) -> Result<Vec<PathBuf>> {
    let mut bundles = Vec::new();

    for entry in WalkDir::new(input_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            bundles.push(path.to_path_buf());
        }
    }

    bundles.sort();
    info!("Found {} detection bundle(s)", bundles.len());
    Ok(bundles)
}

/// Load and normalize one bundle. Keypoint and team streams shorter than
/// the frame stream are padded with empty frames so every per-frame pass
/// can index safely; the shortfall is logged, not fatal.
pub fn load_bundle(path: &Path) -> Result<DetectionBundle> {
    let contents = std::fs::read(path)
        .with_context(|| format!("reading bundle {}", path.display()))?;
    let mut bundle: DetectionBundle = serde_json::from_slice(&contents)
        .with_context(|| format!("parsing bundle {}", path.display()))?;

    ensure!(bundle.fps > 0.0, "bundle {} has fps {}", path.display(), bundle.fps);

    let frames = bundle.frames.len();
    if bundle.keypoints.len() < frames {
        warn!(
            "{}: keypoints cover {}/{} frames; padding",
            bundle.video_id,
            bundle.keypoints.len(),
            frames
        );
        bundle.keypoints.resize(frames, Vec::new());
    }
    if bundle.teams.len() < frames {
        warn!(
            "{}: team labels cover {}/{} frames; padding",
            bundle.video_id,
            bundle.teams.len(),
            frames
        );
        bundle.teams.resize(frames, HashMap::new());
    }

    Ok(bundle)
}
