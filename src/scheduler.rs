//! Scheduling context shared by every operation.
//!
//! Holds the configuration, the clock and the random source. Documents are
//! re-read on each operation so edits made by other processes between runs are
//! picked up; every write is a whole-document atomic replace.

use crate::catalog::{Catalog, Episode};
use crate::channels::ChannelRegistry;
use crate::clock::{Clock, broadcast_date, week_start};
use crate::config::{DocumentPaths, GridConfig};
use crate::cursors::{EpisodeCursorStore, EpisodeCursors};
use crate::daily::{self, ChannelDaySummary, DailySchedule};
use crate::error::{Result, ScheduleError};
use crate::playback::{self, MediaLibrary, ScheduledContent};
use crate::series::SeriesPreferenceStore;
use crate::store::{load_json_optional, load_json_or_default, save_json_atomic};
use crate::time_of_day::TimeOfDay;
use crate::weekly::{self, WeeklySchedule};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Generation bookkeeping shared with readers of the schedule documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleMeta {
    /// Bumped on every weekly or daily generation.
    #[serde(default)]
    pub generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_generated_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_generated_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_date: Option<NaiveDate>,
}

/// What `ensure_current` had to rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Regeneration {
    pub weekly: bool,
    pub daily: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusData {
    pub content_dir: String,
    pub now: DateTime<FixedOffset>,
    pub broadcast_date: NaiveDate,
    pub videos: usize,
    pub series: usize,
    pub commercials: usize,
    pub channels: usize,
    pub series_channels: usize,
    pub weekly_current: bool,
    pub daily_current: bool,
    pub meta: ScheduleMeta,
}

pub struct Scheduler {
    config: GridConfig,
    paths: DocumentPaths,
    clock: Box<dyn Clock>,
    rng: fastrand::Rng,
}

impl Scheduler {
    /// Scheduler on the wall clock. Seeded from the config when it has a seed.
    pub fn new(config: GridConfig) -> Self {
        let clock = config.clock();
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Scheduler {
            paths: config.paths(),
            config,
            clock: Box::new(clock),
            rng,
        }
    }

    /// Scheduler with an injected clock and seed (for tests and replays).
    pub fn with_clock(config: GridConfig, clock: impl Clock + 'static, seed: u64) -> Self {
        Scheduler {
            paths: config.paths(),
            config,
            clock: Box::new(clock),
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn paths(&self) -> &DocumentPaths {
        &self.paths
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    // ── Documents ───────────────────────────────────────────────────────────

    pub fn catalog(&self) -> Catalog {
        Catalog::load(&self.paths.metadata, &self.paths.series)
    }

    pub fn channels(&self) -> ChannelRegistry {
        ChannelRegistry::load(&self.paths.channels)
    }

    pub fn cursor_store(&self) -> EpisodeCursorStore {
        EpisodeCursorStore::new(&self.paths.cursors)
    }

    pub fn series_store(&self) -> SeriesPreferenceStore {
        SeriesPreferenceStore::new(&self.paths.series).with_today(self.now().date_naive())
    }

    pub fn load_weekly(&self) -> Option<WeeklySchedule> {
        load_json_optional(&self.paths.weekly)
    }

    pub fn load_daily(&self) -> Option<DailySchedule> {
        load_json_optional(&self.paths.daily)
    }

    pub fn load_meta(&self) -> ScheduleMeta {
        load_json_or_default(&self.paths.meta)
    }

    pub fn load_cursors(&self) -> EpisodeCursors {
        self.cursor_store().load()
    }

    // ── Series and cursors ──────────────────────────────────────────────────

    pub fn get_time_of_day(&self, series: &str) -> TimeOfDay {
        self.series_store().get_time_of_day(series)
    }

    pub fn set_time_of_day(&self, series: &str, value: &str) -> Result<TimeOfDay> {
        self.series_store().set_time_of_day(series, value)
    }

    pub fn get_next_episode(&self, channel: &str, series: &str) -> Result<Option<Episode>> {
        self.cursor_store()
            .get_next_episode(&self.catalog(), channel, series)
    }

    /// Clear cursors for one channel, or every channel.
    pub fn reset_cursors(&self, channel: Option<&str>) -> Result<usize> {
        let store = self.cursor_store();
        let mut cursors = store.load();
        let removed = cursors.reset(channel);
        store.save(&cursors)?;
        info!(channel = channel.unwrap_or("*"), removed, "episode cursors reset");
        Ok(removed)
    }

    // ── Generation ──────────────────────────────────────────────────────────

    pub fn generate_weekly_schedule(&mut self) -> Result<WeeklySchedule> {
        let now = self.now();
        self.generate_weekly_schedule_at(now)
    }

    /// Plan the broadcast week containing `now` and persist it.
    pub fn generate_weekly_schedule_at(&mut self, now: DateTime<FixedOffset>) -> Result<WeeklySchedule> {
        let catalog = self.catalog();
        let plan = weekly::generate_weekly_schedule(
            &self.channels(),
            &catalog.series,
            now,
            week_start(&now),
            &mut self.rng,
        );
        save_json_atomic(&self.paths.weekly, &plan)?;

        let mut meta = self.load_meta();
        meta.generation += 1;
        meta.weekly_generated_at = Some(now);
        meta.week_start = Some(plan.week_start);
        save_json_atomic(&self.paths.meta, &meta)?;
        Ok(plan)
    }

    pub fn generate_daily_schedule(&mut self) -> Result<DailySchedule> {
        let now = self.now();
        self.generate_daily_schedule_at(now)
    }

    /// Expand the stored weekly plan for the broadcast day containing `now`.
    ///
    /// A missing weekly plan is generated first. The schedule is written
    /// before the advanced cursors, so a failed write never leaves cursors
    /// pointing past episodes that no stored schedule airs.
    pub fn generate_daily_schedule_at(&mut self, now: DateTime<FixedOffset>) -> Result<DailySchedule> {
        let plan = match self.load_weekly() {
            Some(plan) => plan,
            None => {
                info!("no weekly schedule on disk, planning one first");
                self.generate_weekly_schedule_at(now)?
            }
        };
        let catalog = self.catalog();
        let store = self.cursor_store();
        let mut cursors = store.load();
        let schedule = daily::generate_daily_schedule(&plan, &self.channels(), &catalog, &mut cursors, now);

        save_json_atomic(&self.paths.daily, &schedule)?;
        store.save(&cursors)?;

        let mut meta = self.load_meta();
        meta.generation += 1;
        meta.daily_generated_at = Some(now);
        meta.schedule_date = Some(schedule.schedule_date);
        save_json_atomic(&self.paths.meta, &meta)?;
        info!(
            date = %schedule.schedule_date,
            channels = schedule.channels.len(),
            generation = meta.generation,
            "daily schedule generated"
        );
        Ok(schedule)
    }

    /// Regenerate whatever does not cover `now`.
    ///
    /// The weekly plan is rebuilt when missing or from another broadcast week;
    /// the daily schedule when missing, when `now` is outside its validity
    /// window, or when the weekly plan was just rebuilt.
    pub fn ensure_current_at(&mut self, now: DateTime<FixedOffset>) -> Result<Regeneration> {
        let mut done = Regeneration::default();
        let week = week_start(&now);
        if self.load_weekly().is_none_or(|w| w.week_start != week) {
            self.generate_weekly_schedule_at(now)?;
            done.weekly = true;
        }
        if done.weekly || self.load_daily().is_none_or(|d| !d.is_valid_at(&now)) {
            self.generate_daily_schedule_at(now)?;
            done.daily = true;
        }
        debug!(weekly = done.weekly, daily = done.daily, "schedules checked");
        Ok(done)
    }

    pub fn ensure_current(&mut self) -> Result<Regeneration> {
        let now = self.now();
        self.ensure_current_at(now)
    }

    // ── Lookups ─────────────────────────────────────────────────────────────

    pub fn media_library(&self) -> MediaLibrary {
        MediaLibrary::from_config(&self.config).with_metadata(self.catalog().videos)
    }

    /// What `channel` airs at `at` (now when `None`). Read-only: a missing or
    /// out-of-window schedule is an error the caller answers with
    /// [`Scheduler::ensure_current`].
    pub fn get_scheduled_content(
        &self,
        channel: &str,
        at: Option<DateTime<FixedOffset>>,
    ) -> Result<ScheduledContent> {
        let at = at.unwrap_or_else(|| self.now());
        let schedule = self.load_daily().ok_or_else(|| {
            ScheduleError::Stale(format!(
                "no daily schedule at {}",
                self.paths.daily.display()
            ))
        })?;
        playback::get_scheduled_content(&schedule, channel, &at, &self.media_library())
    }

    pub fn day_summaries(&self) -> BTreeMap<String, ChannelDaySummary> {
        self.load_daily()
            .map(|d| {
                d.channels
                    .iter()
                    .map(|(id, entries)| (id.clone(), ChannelDaySummary::from_entries(entries)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn status(&self) -> StatusData {
        let now = self.now();
        let catalog = self.catalog();
        let channels = self.channels();
        StatusData {
            content_dir: self.config.content_dir.display().to_string(),
            now,
            broadcast_date: broadcast_date(&now),
            videos: catalog.videos.len(),
            series: catalog.series.len(),
            commercials: catalog.commercials().len(),
            channels: channels.len(),
            series_channels: channels.series_channels().count(),
            weekly_current: self.load_weekly().is_some_and(|w| w.week_start == week_start(&now)),
            daily_current: self.load_daily().is_some_and(|d| d.is_valid_at(&now)),
            meta: self.load_meta(),
        }
    }
}
