// src/cache.rs
//
// Optional read-through/write-through result cache, keyed by
// (video id, computation stage). The core only assumes "present or absent,
// and if present, exactly reproduces a prior valid computation"; the
// backend is a capability trait so everything stays testable without
// persistence.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStage {
    PlayerTracks,
    BallTrack,
    CourtKeypoints,
    TeamAssignment,
    Possession,
}

impl CacheStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlayerTracks => "player_tracks",
            Self::BallTrack => "ball_track",
            Self::CourtKeypoints => "court_keypoints",
            Self::TeamAssignment => "team_assignment",
            Self::Possession => "possession",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheKey {
    pub video_id: String,
    pub stage: CacheStage,
}

impl CacheKey {
    pub fn new(video_id: impl Into<String>, stage: CacheStage) -> Self {
        Self {
            video_id: video_id.into(),
            stage,
        }
    }
}

pub trait ResultCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<()>;
}

/// File-backed cache: one serialized blob per (video, stage) under a root
/// directory, mirroring the stub layout of earlier runs.
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(&key.video_id)
            .join(format!("{}.json", key.stage.as_str()))
    }
}

impl ResultCache for FileCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let path = self.blob_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)
            .with_context(|| format!("reading cache blob {}", path.display()))?;
        Ok(Some(bytes))
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<()> {
        let path = self.blob_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating cache dir {}", parent.display()))?;
        }
        fs::write(&path, bytes)
            .with_context(|| format!("writing cache blob {}", path.display()))?;
        Ok(())
    }
}

/// Deserialize a cache hit, or compute the value and store it. A corrupt or
/// unreadable entry is recomputed and overwritten rather than failing the
/// run.
pub fn read_through<T, F>(cache: Option<&dyn ResultCache>, key: &CacheKey, compute: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> T,
{
    if let Some(cache) = cache {
        match cache.get(key) {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    debug!("cache hit: {}/{}", key.video_id, key.stage.as_str());
                    return Ok(value);
                }
                Err(e) => warn!(
                    "cache entry {}/{} unreadable ({}); recomputing",
                    key.video_id,
                    key.stage.as_str(),
                    e
                ),
            },
            Ok(None) => {}
            Err(e) => warn!(
                "cache read failed for {}/{}: {}",
                key.video_id,
                key.stage.as_str(),
                e
            ),
        }
    }

    let value = compute();

    if let Some(cache) = cache {
        let bytes = serde_json::to_vec(&value)?;
        if let Err(e) = cache.put(key, &bytes) {
            warn!(
                "cache write failed for {}/{}: {}",
                key.video_id,
                key.stage.as_str(),
                e
            );
        }
    }

    Ok(value)
}
