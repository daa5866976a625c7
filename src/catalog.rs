//! Read-only view of the video library and series registry.
//!
//! Loaded once per scheduling run; re-loading picks up edits made between
//! runs. Videos whose duration has not been filled in yet by the metadata
//! process are deferred: they are left out of episode lists and the
//! commercial pool until a positive duration is recorded. A record the
//! metadata process wrote badly is skipped on its own; the rest of the
//! library still loads.

use crate::series::SeriesRegistry;
use crate::store::{load_records, null_as_default};
use crate::time_of_day::{DAY_SECS, TEST_PATTERN_SECS};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Longest duration that can air: the broadcast day after the test pattern.
pub const MAX_AIRABLE_SECS: u32 = DAY_SECS - TEST_PATTERN_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoCategory {
    TvEpisode,
    Commercial,
    #[default]
    #[serde(other)]
    Other,
}

/// One entry of the video metadata document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VideoEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: VideoCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    /// Library-relative path of an episode, without extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_path: Option<String>,
    /// Library-relative path of a commercial, without extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commercials_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    /// Duration in seconds, as written by the metadata process.
    #[serde(
        rename = "duracion",
        default,
        deserialize_with = "lenient_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

impl VideoEntry {
    /// Whole-second duration, or `None` when missing, zero, invalid, or
    /// longer than [`MAX_AIRABLE_SECS`].
    pub fn duration_secs(&self) -> Option<u32> {
        match self.duration {
            Some(d) if d.is_finite() && d >= 0.5 && d.round() <= MAX_AIRABLE_SECS as f64 => {
                Some(d.round() as u32)
            }
            Some(d) if d.is_finite() && d >= 0.5 => {
                debug!(duration = d, "duration longer than a broadcast day, not airable");
                None
            }
            _ => None,
        }
    }
}

/// Accept a whole number or a numeric string; anything else reads as missing.
fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}

/// Accept a number or a numeric string; anything else reads as missing.
fn lenient_seconds<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// An airable episode in chronological position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub video_id: String,
    pub title: String,
    pub series: String,
    pub season: u32,
    pub episode: u32,
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_path: Option<String>,
}

/// A commercial spot available to the filler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commercial {
    pub video_id: String,
    pub duration: u32,
}

pub type VideoMetadata = BTreeMap<String, VideoEntry>;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub videos: VideoMetadata,
    pub series: SeriesRegistry,
}

impl Catalog {
    /// Load the metadata and series documents. Missing files read as empty.
    pub fn load(metadata_path: &Path, series_path: &Path) -> Self {
        let videos: VideoMetadata = load_records(metadata_path);
        let series = SeriesRegistry::load(series_path);
        debug!(videos = videos.len(), series = series.len(), "catalog loaded");
        Catalog { videos, series }
    }

    pub fn video(&self, id: &str) -> Option<&VideoEntry> {
        self.videos.get(id)
    }

    /// Episodes of `series` ordered by season, then episode.
    ///
    /// Unknown series, or a series with no timed episodes, yields an empty list.
    pub fn series_episodes(&self, series: &str) -> Vec<Episode> {
        let mut episodes: Vec<Episode> = self
            .videos
            .iter()
            .filter(|(_, v)| v.category == VideoCategory::TvEpisode)
            .filter(|(_, v)| v.series.as_deref() == Some(series))
            .filter_map(|(id, v)| {
                let duration = v.duration_secs()?;
                Some(Episode {
                    video_id: id.clone(),
                    title: v.title.clone(),
                    series: series.to_string(),
                    season: v.season.unwrap_or(0),
                    episode: v.episode.unwrap_or(0),
                    duration,
                    series_path: v.series_path.clone(),
                })
            })
            .collect();
        episodes.sort_by(|a, b| {
            (a.season, a.episode, &a.video_id).cmp(&(b.season, b.episode, &b.video_id))
        });
        episodes
    }

    /// Commercial spots with a usable duration, ordered by id.
    pub fn commercials(&self) -> Vec<Commercial> {
        self.videos
            .iter()
            .filter(|(_, v)| v.category == VideoCategory::Commercial)
            .filter_map(|(id, v)| {
                Some(Commercial {
                    video_id: id.clone(),
                    duration: v.duration_secs()?,
                })
            })
            .collect()
    }
}
