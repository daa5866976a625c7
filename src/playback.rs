//! "What's on now" lookups against a stored daily schedule.
//!
//! Resolution is read-only. A query outside the schedule's validity window is
//! reported as [`ScheduleError::Stale`] so the caller can regenerate; the
//! resolver never substitutes content on its own.

use crate::catalog::{VideoCategory, VideoMetadata};
use crate::clock::seconds_into_broadcast_day;
use crate::config::GridConfig;
use crate::daily::{DailySchedule, EntryKind, ScheduleEntry};
use crate::error::{Result, ScheduleError};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::path::PathBuf;

pub const TEST_PATTERN_CLIP: &str = "test_pattern.mp4";
pub const SPONSORS_PLACEHOLDER_CLIP: &str = "sponsors_placeholder.mp4";
const VIDEO_EXT: &str = "mp4";

/// Maps schedule entries to files on disk.
#[derive(Debug, Clone, Default)]
pub struct MediaLibrary {
    video_dir: PathBuf,
    system_dir: PathBuf,
    videos: VideoMetadata,
}

impl MediaLibrary {
    pub fn new(video_dir: impl Into<PathBuf>, system_dir: impl Into<PathBuf>) -> Self {
        MediaLibrary {
            video_dir: video_dir.into(),
            system_dir: system_dir.into(),
            videos: VideoMetadata::new(),
        }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(config.video_dir(), config.system_video_dir())
    }

    /// Use recorded library paths from the video metadata where present.
    pub fn with_metadata(mut self, videos: VideoMetadata) -> Self {
        self.videos = videos;
        self
    }

    fn library_file(&self, relative: &str) -> PathBuf {
        self.video_dir.join(format!("{}.{}", relative, VIDEO_EXT))
    }

    /// Playable file for `entry`.
    pub fn resolve(&self, entry: &ScheduleEntry) -> PathBuf {
        match entry.kind {
            EntryKind::TestPattern => self.system_dir.join(TEST_PATTERN_CLIP),
            EntryKind::SponsorsPlaceholder => self.system_dir.join(SPONSORS_PLACEHOLDER_CLIP),
            EntryKind::Episode | EntryKind::Commercial => {
                let id = entry.video_id.as_deref().unwrap_or_default();
                let info = self.videos.get(id);
                if let Some(path) = info.and_then(|v| v.commercials_path.as_deref()) {
                    return self.library_file(path);
                }
                if let Some(path) = info.and_then(|v| v.series_path.as_deref()) {
                    return self.library_file(path);
                }
                let is_commercial = entry.kind == EntryKind::Commercial
                    || info.is_some_and(|v| v.category == VideoCategory::Commercial);
                if is_commercial {
                    self.library_file(&format!("commercials/{}", id))
                } else {
                    self.library_file(id)
                }
            }
        }
    }
}

/// Resolved playback instruction for one channel at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledContent {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub video_id: Option<String>,
    pub video_url: PathBuf,
    /// Seconds already elapsed into the entry.
    pub seek_to: u32,
    /// Seconds left before the next entry starts.
    pub remaining: u32,
    pub start: u32,
    pub end: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "loop")]
    pub looped: bool,
}

/// Find what `channel` is airing at `at` and how far into it playback is.
pub fn get_scheduled_content(
    schedule: &DailySchedule,
    channel: &str,
    at: &DateTime<FixedOffset>,
    library: &MediaLibrary,
) -> Result<ScheduledContent> {
    let local = at.with_timezone(schedule.valid_from.offset());
    if !schedule.is_valid_at(&local) {
        return Err(ScheduleError::Stale(format!(
            "{} is outside [{}, {})",
            local.to_rfc3339(),
            schedule.valid_from.to_rfc3339(),
            schedule.valid_until.to_rfc3339()
        )));
    }
    let entries = schedule
        .channels
        .get(channel)
        .ok_or_else(|| ScheduleError::NotFound(format!("Channel '{}' in daily schedule", channel)))?;

    let offset = u32::try_from(seconds_into_broadcast_day(&local)).unwrap_or(0);
    let entry = schedule.entry_at(channel, offset).ok_or_else(|| {
        ScheduleError::NotFound(format!(
            "Entry at offset {}s on channel '{}' ({} entries)",
            offset,
            channel,
            entries.len()
        ))
    })?;

    Ok(ScheduledContent {
        kind: entry.kind,
        video_id: entry.video_id.clone(),
        video_url: library.resolve(entry),
        seek_to: offset - entry.start,
        remaining: entry.end - offset,
        start: entry.start,
        end: entry.end,
        series: entry.series.clone(),
        title: entry.title.clone(),
        looped: entry.looped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::VideoEntry;
    use chrono::{Duration, NaiveDate};
    use std::collections::BTreeMap;
    use std::path::Path;

    fn entry(kind: EntryKind, start: u32, end: u32, id: Option<&str>) -> ScheduleEntry {
        ScheduleEntry {
            kind,
            start,
            end,
            video_id: id.map(str::to_string),
            series: None,
            title: None,
            season: None,
            episode: None,
            looped: kind == EntryKind::TestPattern,
        }
    }

    fn schedule() -> DailySchedule {
        let valid_from = DateTime::parse_from_rfc3339("2025-03-10T03:00:00-03:00").unwrap();
        let entries = vec![
            entry(EntryKind::TestPattern, 0, 3600, None),
            entry(EntryKind::Episode, 3600, 4800, Some("ep_a_s01e01")),
            entry(EntryKind::Commercial, 4800, 4830, Some("ad_30")),
            entry(EntryKind::SponsorsPlaceholder, 4830, 86400, None),
        ];
        let mut channels = BTreeMap::new();
        channels.insert("channel_1".to_string(), entries);
        DailySchedule {
            generated_at: valid_from,
            schedule_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            valid_from,
            valid_until: valid_from + Duration::days(1),
            channels,
        }
    }

    fn library() -> MediaLibrary {
        MediaLibrary::new("/media/videos", "/media/system")
    }

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_pattern_window() {
        let got = get_scheduled_content(&schedule(), "channel_1", &at("2025-03-10T03:30:00-03:00"), &library()).unwrap();
        assert_eq!(got.kind, EntryKind::TestPattern);
        assert_eq!(got.seek_to, 1800);
        assert_eq!(got.video_url, Path::new("/media/system/test_pattern.mp4"));
        assert!(got.looped);
    }

    #[test]
    fn seek_is_elapsed_time_into_entry() {
        let got = get_scheduled_content(&schedule(), "channel_1", &at("2025-03-10T04:05:30-03:00"), &library()).unwrap();
        assert_eq!(got.kind, EntryKind::Episode);
        assert_eq!(got.seek_to, 330);
        assert_eq!(got.remaining, 1200 - 330);
        assert_eq!(got.video_url, Path::new("/media/videos/ep_a_s01e01.mp4"));
    }

    #[test]
    fn other_offsets_are_normalized() {
        // 07:20 UTC is 04:20 at -03:00.
        let got = get_scheduled_content(&schedule(), "channel_1", &at("2025-03-10T07:20:00+00:00"), &library()).unwrap();
        assert_eq!(got.kind, EntryKind::Episode);
        assert_eq!(got.seek_to, 1200);
    }

    #[test]
    fn after_midnight_belongs_to_same_broadcast_day() {
        let got = get_scheduled_content(&schedule(), "channel_1", &at("2025-03-11T02:59:59-03:00"), &library()).unwrap();
        assert_eq!(got.kind, EntryKind::SponsorsPlaceholder);
        assert_eq!(got.remaining, 1);
        assert_eq!(got.video_url, Path::new("/media/system/sponsors_placeholder.mp4"));
    }

    #[test]
    fn outside_window_is_stale() {
        for t in ["2025-03-10T02:59:59-03:00", "2025-03-11T03:00:00-03:00"] {
            let err = get_scheduled_content(&schedule(), "channel_1", &at(t), &library()).unwrap_err();
            assert!(matches!(err, ScheduleError::Stale(_)), "{}", t);
        }
    }

    #[test]
    fn unknown_channel_is_not_found() {
        let err = get_scheduled_content(&schedule(), "channel_9", &at("2025-03-10T12:00:00-03:00"), &library()).unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound(_)));
    }

    #[test]
    fn recorded_paths_take_precedence() {
        let mut videos = VideoMetadata::new();
        videos.insert(
            "ep_a_s01e01".into(),
            VideoEntry {
                series_path: Some("series/Test_Series_A/ep_a_s01e01".into()),
                ..Default::default()
            },
        );
        let lib = library().with_metadata(videos);
        let ep = entry(EntryKind::Episode, 0, 10, Some("ep_a_s01e01"));
        assert_eq!(lib.resolve(&ep), Path::new("/media/videos/series/Test_Series_A/ep_a_s01e01.mp4"));
        let ad = entry(EntryKind::Commercial, 0, 10, Some("ad_30"));
        assert_eq!(lib.resolve(&ad), Path::new("/media/videos/commercials/ad_30.mp4"));
    }
}
