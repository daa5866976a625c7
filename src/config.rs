//! Storage layout and runtime settings.
//!
//! The content root is resolved from an explicit path, then `TVGRID_ROOT`,
//! then the platform data directory. Optional overrides live in
//! `<content_dir>/tvgrid.json`; every field has a default so a missing or
//! partial file is fine.

use crate::clock::{SystemClock, parse_utc_offset};
use crate::error::Result;
use crate::store::load_json_optional;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const ROOT_ENV: &str = "TVGRID_ROOT";
pub const OFFSET_ENV: &str = "TVGRID_UTC_OFFSET";
pub const CONFIG_FILE: &str = "tvgrid.json";

pub const SERIES_FILE: &str = "series.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const CHANNELS_FILE: &str = "canales.json";
pub const CURSORS_FILE: &str = "episode_cursors.json";
pub const WEEKLY_SCHEDULE_FILE: &str = "weekly_schedule.json";
pub const DAILY_SCHEDULE_FILE: &str = "daily_schedule.json";
pub const SCHEDULE_META_FILE: &str = "schedule_meta.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Directory holding every JSON document.
    #[serde(skip)]
    pub content_dir: PathBuf,
    /// Root of the video library. Defaults to `<content_dir>/videos`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_dir: Option<PathBuf>,
    /// Generated system clips (test pattern, sponsor placeholder).
    /// Defaults to `<video_dir>/system`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_video_dir: Option<PathBuf>,
    /// Fixed `±HH:MM` offset for the broadcast clock. Host local zone if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<String>,
    /// Seed for reproducible schedules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl GridConfig {
    /// Defaults rooted at `content_dir`, without reading any file.
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        GridConfig {
            content_dir: content_dir.into(),
            video_dir: None,
            system_video_dir: None,
            utc_offset: None,
            seed: None,
        }
    }

    /// Resolve the content root and read `tvgrid.json` from it.
    pub fn load(explicit_root: Option<&Path>) -> Self {
        let root = resolve_root(explicit_root);
        let mut config = match load_json_optional::<GridConfig>(&root.join(CONFIG_FILE)) {
            Some(cfg) => cfg,
            None => GridConfig::new(&root),
        };
        config.content_dir = root;
        if let Ok(offset) = std::env::var(OFFSET_ENV) {
            config.utc_offset = Some(offset);
        }
        config
    }

    pub fn paths(&self) -> DocumentPaths {
        DocumentPaths::new(&self.content_dir)
    }

    pub fn video_dir(&self) -> PathBuf {
        self.video_dir
            .clone()
            .unwrap_or_else(|| self.content_dir.join("videos"))
    }

    pub fn system_video_dir(&self) -> PathBuf {
        self.system_video_dir
            .clone()
            .unwrap_or_else(|| self.video_dir().join("system"))
    }

    /// The configured offset, validated.
    pub fn offset(&self) -> Result<Option<FixedOffset>> {
        self.utc_offset.as_deref().map(parse_utc_offset).transpose()
    }

    /// Clock for this configuration. An invalid offset falls back to the
    /// host local zone with a warning.
    pub fn clock(&self) -> SystemClock {
        match self.offset() {
            Ok(offset) => SystemClock::new(offset),
            Err(e) => {
                warn!(error = %e, "ignoring configured UTC offset");
                SystemClock::new(None)
            }
        }
    }
}

/// Locations of the persisted documents.
#[derive(Debug, Clone)]
pub struct DocumentPaths {
    pub series: PathBuf,
    pub metadata: PathBuf,
    pub channels: PathBuf,
    pub cursors: PathBuf,
    pub weekly: PathBuf,
    pub daily: PathBuf,
    pub meta: PathBuf,
}

impl DocumentPaths {
    pub fn new(content_dir: &Path) -> Self {
        DocumentPaths {
            series: content_dir.join(SERIES_FILE),
            metadata: content_dir.join(METADATA_FILE),
            channels: content_dir.join(CHANNELS_FILE),
            cursors: content_dir.join(CURSORS_FILE),
            weekly: content_dir.join(WEEKLY_SCHEDULE_FILE),
            daily: content_dir.join(DAILY_SCHEDULE_FILE),
            meta: content_dir.join(SCHEDULE_META_FILE),
        }
    }
}

fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(root) = std::env::var(ROOT_ENV) {
        if !root.trim().is_empty() {
            return PathBuf::from(root);
        }
    }
    dirs::data_dir()
        .map(|d| d.join("tvgrid"))
        .unwrap_or_else(|| PathBuf::from("content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_derive_from_content_dir() {
        let cfg = GridConfig::new("/srv/tv");
        assert_eq!(cfg.video_dir(), PathBuf::from("/srv/tv/videos"));
        assert_eq!(cfg.system_video_dir(), PathBuf::from("/srv/tv/videos/system"));
        assert_eq!(cfg.paths().cursors, PathBuf::from("/srv/tv/episode_cursors.json"));
        assert_eq!(cfg.paths().channels, PathBuf::from("/srv/tv/canales.json"));
    }

    #[test]
    fn load_reads_overrides_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"video_dir": "/media/tv", "seed": 42, "utc_offset": "+01:00"}"#,
        )
        .unwrap();
        let cfg = GridConfig::load(Some(dir.path()));
        assert_eq!(cfg.content_dir, dir.path());
        assert_eq!(cfg.video_dir(), PathBuf::from("/media/tv"));
        assert_eq!(cfg.system_video_dir(), PathBuf::from("/media/tv/system"));
        assert_eq!(cfg.seed, Some(42));
    }

    #[test]
    fn load_without_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = GridConfig::load(Some(dir.path()));
        assert_eq!(cfg.content_dir, dir.path());
        assert!(cfg.seed.is_none());
    }

    #[test]
    fn invalid_offset_is_reported() {
        let mut cfg = GridConfig::new("/tmp/x");
        cfg.utc_offset = Some("nowhere".into());
        assert!(cfg.offset().is_err());
        cfg.utc_offset = Some("-03:00".into());
        assert_eq!(cfg.offset().unwrap().unwrap().local_minus_utc(), -3 * 3600);
    }
}
