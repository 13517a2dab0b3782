// src/main.rs

use anyhow::Result;
use courtvision::bundle::{find_bundles, load_bundle};
use courtvision::cache::{FileCache, ResultCache};
use courtvision::pipeline::{analyze, VideoAnalysis};
use courtvision::types::{Config, CourtPosition, PlayerId, PlayerKinematics, TeamId};
use courtvision::CalibrationSource;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    let config = Config::load("config.yaml")?;

    let filter = format!("courtvision={}", config.logging.level);
    tracing_subscriber::fmt()
        .with_env_filter(filter.as_str())
        .init();

    info!("🏀 Court Vision analysis starting");
    info!("✓ Configuration loaded");
    info!(
        "Possession thresholds: proximity={:.0}px, containment={:.2}, confirm_frames={}",
        config.possession.proximity_threshold_px,
        config.possession.containment_threshold,
        config.possession.min_confirm_frames
    );
    info!(
        "Calibration: min_keypoints={}, max_residual={:.2}m, hold_lookback={} frames",
        config.calibration.min_keypoints,
        config.calibration.max_residual_m,
        config.calibration.hold_lookback_frames
    );

    let bundles = find_bundles(&config.io.input_dir)?;
    if bundles.is_empty() {
        error!("No detection bundles found in {}", config.io.input_dir);
        return Ok(());
    }

    std::fs::create_dir_all(&config.io.output_dir)?;

    let cache_backend = if config.cache.enabled {
        info!("💾 Result cache enabled at {}", config.cache.dir);
        Some(FileCache::new(&config.cache.dir))
    } else {
        info!("⚪ Result cache disabled");
        None
    };
    let cache: Option<&dyn ResultCache> = cache_backend.as_ref().map(|c| c as &dyn ResultCache);

    for (idx, path) in bundles.iter().enumerate() {
        info!("\n========================================");
        info!(
            "Processing bundle {}/{}: {}",
            idx + 1,
            bundles.len(),
            path.display()
        );
        info!("========================================\n");

        match process_bundle(path, &config, cache) {
            Ok(()) => {}
            Err(e) => error!("Failed to process {}: {}", path.display(), e),
        }
    }

    Ok(())
}

fn process_bundle(path: &Path, config: &Config, cache: Option<&dyn ResultCache>) -> Result<()> {
    use std::time::Instant;

    let bundle = load_bundle(path)?;
    let start_time = Instant::now();

    let analysis = analyze(&bundle, config, cache)?;

    save_events(&analysis, &config.io.output_dir)?;
    save_frame_records(&analysis, &config.io.output_dir)?;

    let report = analysis.report();
    let duration = start_time.elapsed();
    let avg_fps = report.total_frames as f64 / duration.as_secs_f64().max(1e-9);

    info!("\n📊 {} report:", analysis.video_id);
    info!("  Total frames: {}", report.total_frames);
    info!(
        "  Calibrated: {} estimated, {} held-over ({:.1}% coverage)",
        report.estimated_frames,
        report.held_frames,
        100.0 * (report.estimated_frames + report.held_frames) as f64
            / report.total_frames.max(1) as f64
    );
    if report.uncalibrated_frames > 0 {
        warn!(
            "  ⚠️  Uncalibrated frames: {} (no tactical data)",
            report.uncalibrated_frames
        );
    }
    info!(
        "  Possession coverage: {} frames ({:.1}%)",
        report.possession_frames,
        100.0 * report.possession_frames as f64 / report.total_frames.max(1) as f64
    );
    info!("  🏀 Passes: {}", report.passes);
    info!("  🔄 Interceptions: {}", report.interceptions);
    info!(
        "  Team control: {:.1}% / {:.1}%",
        analysis.control.shares[0] * 100.0,
        analysis.control.shares[1] * 100.0
    );
    info!("  Processing speed: {:.1} frames/s", avg_fps);

    Ok(())
}

// ============================================================================
// OUTPUT WRITERS
// ============================================================================

/// One line per pass/interception event.
fn save_events(analysis: &VideoAnalysis, output_dir: &str) -> Result<()> {
    let path = Path::new(output_dir).join(format!("{}_events.jsonl", analysis.video_id));
    let mut file = std::fs::File::create(&path)?;

    for event in &analysis.exchanges {
        let line = serde_json::to_string(event)?;
        writeln!(file, "{}", line)?;
    }
    file.flush()?;

    info!(
        "💾 {} event(s) written to {}",
        analysis.exchanges.len(),
        path.display()
    );
    Ok(())
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: usize,
    calibration: CalibrationSource,
    positions: &'a HashMap<PlayerId, CourtPosition>,
    possession: Option<PlayerId>,
    team_in_control: Option<TeamId>,
    kinematics: &'a HashMap<PlayerId, PlayerKinematics>,
}

/// One line per frame: everything the rendering collaborator consumes.
fn save_frame_records(analysis: &VideoAnalysis, output_dir: &str) -> Result<()> {
    let path = Path::new(output_dir).join(format!("{}_frames.jsonl", analysis.video_id));
    let mut file = std::fs::File::create(&path)?;

    for frame in 0..analysis.calibrations.len() {
        let record = FrameRecord {
            frame,
            calibration: analysis.calibrations[frame].source,
            positions: &analysis.positions[frame],
            possession: analysis.possession[frame],
            team_in_control: analysis.control.per_frame[frame],
            kinematics: &analysis.kinematics[frame],
        };
        let line = serde_json::to_string(&record)?;
        writeln!(file, "{}", line)?;
    }
    file.flush()?;

    info!("💾 Frame analytics written to {}", path.display());
    Ok(())
}
