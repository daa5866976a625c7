//! Daily expansion of the weekly plan into a second-resolution timeline.
//!
//! Each series-driven channel gets a contiguous list of entries covering the
//! whole broadcast day (03:00 to 03:00): the test pattern for the first hour,
//! then episodes laid out on 30-minute blocks with commercial breaks filling
//! whatever the episodes leave over. Expansion consumes episode cursors.

use crate::blocks::{BLOCK_SECS, classify};
use crate::catalog::{Catalog, Episode};
use crate::channels::ChannelRegistry;
use crate::clock::{broadcast_date, broadcast_day_start};
use crate::commercials::CommercialFiller;
use crate::cursors::EpisodeCursors;
use crate::time_of_day::{DAY_SECS, Period, TEST_PATTERN_SECS, hour_at_offset};
use crate::weekly::{ChannelWeek, PlannedSlot, WeeklySchedule};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    TestPattern,
    Episode,
    Commercial,
    SponsorsPlaceholder,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::TestPattern => "test_pattern",
            EntryKind::Episode => "episode",
            EntryKind::Commercial => "commercial",
            EntryKind::SponsorsPlaceholder => "sponsors_placeholder",
        };
        f.write_str(s)
    }
}

/// One item on a channel's daily timeline. `start` and `end` are seconds from
/// the start of the broadcast day; the interval is `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub start: u32,
    pub end: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    /// The referenced clip is shorter than the entry and loops.
    #[serde(rename = "loop", default, skip_serializing_if = "std::ops::Not::not")]
    pub looped: bool,
}

impl ScheduleEntry {
    fn filler(kind: EntryKind, start: u32, end: u32, video_id: Option<String>) -> Self {
        ScheduleEntry {
            kind,
            start,
            end,
            video_id,
            series: None,
            title: None,
            season: None,
            episode: None,
            looped: matches!(kind, EntryKind::TestPattern | EntryKind::SponsorsPlaceholder),
        }
    }

    fn for_episode(ep: &Episode, start: u32) -> Self {
        ScheduleEntry {
            kind: EntryKind::Episode,
            start,
            end: start + ep.duration,
            video_id: Some(ep.video_id.clone()),
            series: Some(ep.series.clone()),
            title: Some(ep.title.clone()),
            season: Some(ep.season),
            episode: Some(ep.episode),
            looped: false,
        }
    }

    pub fn duration(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySchedule {
    pub generated_at: DateTime<FixedOffset>,
    pub schedule_date: NaiveDate,
    pub valid_from: DateTime<FixedOffset>,
    pub valid_until: DateTime<FixedOffset>,
    pub channels: BTreeMap<String, Vec<ScheduleEntry>>,
}

impl DailySchedule {
    pub fn is_valid_at(&self, at: &DateTime<FixedOffset>) -> bool {
        self.valid_from <= *at && *at < self.valid_until
    }

    /// Entry of `channel` whose interval contains `offset`.
    pub fn entry_at(&self, channel: &str, offset: u32) -> Option<&ScheduleEntry> {
        let entries = self.channels.get(channel)?;
        let idx = entries.partition_point(|e| e.end <= offset);
        entries.get(idx).filter(|e| e.contains(offset))
    }
}

/// Whether `entries` start at 0, touch end to end, and stop at the end of the day.
pub fn covers_full_day(entries: &[ScheduleEntry]) -> bool {
    let mut expected = 0;
    for e in entries {
        if e.start != expected || e.end <= e.start {
            return false;
        }
        expected = e.end;
    }
    expected == DAY_SECS
}

/// Per-channel totals for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelDaySummary {
    pub entries: usize,
    pub episodes: usize,
    pub commercials: usize,
    pub placeholders: usize,
    pub programme_secs: u32,
    pub filler_secs: u32,
}

impl ChannelDaySummary {
    pub fn from_entries(entries: &[ScheduleEntry]) -> Self {
        let mut s = ChannelDaySummary {
            entries: entries.len(),
            ..Default::default()
        };
        for e in entries {
            match e.kind {
                EntryKind::Episode => {
                    s.episodes += 1;
                    s.programme_secs += e.duration();
                }
                EntryKind::Commercial => {
                    s.commercials += 1;
                    s.filler_secs += e.duration();
                }
                EntryKind::SponsorsPlaceholder => {
                    s.placeholders += 1;
                    s.filler_secs += e.duration();
                }
                EntryKind::TestPattern => {}
            }
        }
        s
    }
}

/// Timeline under construction for one channel.
struct DayBuilder {
    entries: Vec<ScheduleEntry>,
    cursor: u32,
}

/// A block shared by several short episodes that still has room.
struct SharedBlock {
    end: u32,
    seats_left: u32,
}

impl DayBuilder {
    fn new() -> Self {
        DayBuilder {
            entries: Vec::new(),
            cursor: 0,
        }
    }

    fn push(&mut self, entry: ScheduleEntry) {
        self.cursor = entry.end;
        self.entries.push(entry);
    }

    fn place_episode(&mut self, ep: &Episode) {
        let entry = ScheduleEntry::for_episode(ep, self.cursor);
        self.push(entry);
    }

    /// Fill `[cursor, limit)` with a break. The last spot is cut at `limit`.
    fn fill_until(&mut self, limit: u32, filler: &mut CommercialFiller) {
        if self.cursor >= limit {
            return;
        }
        for spot in filler.build_sequence(limit - self.cursor) {
            if self.cursor >= limit {
                break;
            }
            let end = (self.cursor + spot.duration).min(limit);
            self.push(ScheduleEntry::filler(spot.kind, self.cursor, end, spot.video_id));
        }
    }
}

/// Everything one channel's expansion reads and mutates.
struct ChannelExpansion<'a> {
    channel_id: &'a str,
    catalog: &'a Catalog,
    cursors: &'a mut EpisodeCursors,
    filler: &'a mut CommercialFiller,
    episodes: HashMap<String, Vec<Episode>>,
    day: DayBuilder,
}

impl ChannelExpansion<'_> {
    fn episodes_of(&mut self, series: &str) -> &[Episode] {
        let catalog = self.catalog;
        self.episodes
            .entry(series.to_string())
            .or_insert_with(|| catalog.series_episodes(series))
    }

    /// Air one slot. Returns whether the timeline advanced.
    fn air_slot(&mut self, slot: &PlannedSlot) -> bool {
        let started_at = self.day.cursor;
        let episodes = self.episodes_of(&slot.series).to_vec();
        if episodes.is_empty() {
            debug!(channel = self.channel_id, series = %slot.series, "slot skipped, no airable episodes");
            return false;
        }

        let mut shared: Option<SharedBlock> = None;
        for _ in 0..slot.back_to_back.max(1) {
            if self.day.cursor >= DAY_SECS {
                break;
            }
            let Some(next) = self.cursors.peek(self.channel_id, &slot.series, &episodes) else {
                break;
            };
            let layout = classify(next.duration);

            if layout.is_shared() {
                let fits_open = shared
                    .as_ref()
                    .is_some_and(|b| b.seats_left > 0 && self.day.cursor.saturating_add(next.duration) <= b.end);
                if !fits_open {
                    if let Some(block) = shared.take() {
                        self.day.fill_until(block.end, self.filler);
                    }
                    let end = self.day.cursor + BLOCK_SECS;
                    if end > DAY_SECS {
                        break;
                    }
                    shared = Some(SharedBlock {
                        end,
                        seats_left: layout.episodes_per_block,
                    });
                }
                if let Some(block) = shared.as_mut() {
                    block.seats_left -= 1;
                }
            } else {
                if let Some(block) = shared.take() {
                    self.day.fill_until(block.end, self.filler);
                }
                if self.day.cursor.saturating_add(layout.span_secs()) > DAY_SECS {
                    break;
                }
            }

            let Some(ep) = self.cursors.advance(self.channel_id, &slot.series, &episodes) else {
                break;
            };
            self.day.place_episode(&ep);
            if !layout.is_shared() {
                let end = self.day.cursor - ep.duration + layout.span_secs();
                self.day.fill_until(end, self.filler);
            }
        }
        if let Some(block) = shared.take() {
            self.day.fill_until(block.end, self.filler);
        }
        self.day.cursor > started_at
    }

    fn run(mut self, week: &ChannelWeek) -> Vec<ScheduleEntry> {
        self.day.push(ScheduleEntry::filler(EntryKind::TestPattern, 0, TEST_PATTERN_SECS, None));

        let mut next_slot: BTreeMap<Period, usize> = BTreeMap::new();
        while self.day.cursor < DAY_SECS {
            let period = Period::for_hour(hour_at_offset(self.day.cursor));
            let hour_end = ((self.day.cursor / 3600 + 1) * 3600).min(DAY_SECS);
            let slots = week.slots(period);

            let mut aired = false;
            for _ in 0..slots.len() {
                let pos = next_slot.entry(period).or_insert(0);
                let slot = &slots[*pos % slots.len()];
                *pos += 1;
                if self.air_slot(slot) {
                    aired = true;
                    break;
                }
            }
            if !aired {
                // Nothing airable in this period; hold with filler until the hour turns.
                self.day.fill_until(hour_end, self.filler);
            }
        }
        self.day.entries
    }
}

/// Expand one channel's weekly plan into a full broadcast day.
pub fn expand_channel(
    channel_id: &str,
    week: &ChannelWeek,
    catalog: &Catalog,
    cursors: &mut EpisodeCursors,
    filler: &mut CommercialFiller,
) -> Vec<ScheduleEntry> {
    ChannelExpansion {
        channel_id,
        catalog,
        cursors,
        filler,
        episodes: HashMap::new(),
        day: DayBuilder::new(),
    }
    .run(week)
}

/// Expand the weekly plan for the broadcast day containing `now`.
///
/// Channels in the plan that are no longer series-driven in `channels` are
/// dropped. `cursors` is advanced in place; persisting it is up to the caller.
pub fn generate_daily_schedule(
    weekly: &WeeklySchedule,
    channels: &ChannelRegistry,
    catalog: &Catalog,
    cursors: &mut EpisodeCursors,
    now: DateTime<FixedOffset>,
) -> DailySchedule {
    let schedule_date = broadcast_date(&now);
    let valid_from = broadcast_day_start(schedule_date, *now.offset());
    let valid_until = valid_from + Duration::seconds(DAY_SECS as i64);

    let mut filler = CommercialFiller::new(catalog.commercials());
    if filler.is_empty() {
        warn!("no commercials with a known duration, breaks will use the sponsor placeholder");
    }

    let mut expanded = BTreeMap::new();
    for (id, week) in &weekly.channels {
        if !channels.get(id).is_some_and(|c| c.is_series_driven()) {
            warn!(channel = %id, "channel in weekly plan is no longer series-driven, skipping");
            continue;
        }
        let entries = expand_channel(id, week, catalog, cursors, &mut filler);
        let summary = ChannelDaySummary::from_entries(&entries);
        info!(
            channel = %id,
            entries = summary.entries,
            episodes = summary.episodes,
            commercials = summary.commercials,
            "channel day expanded"
        );
        expanded.insert(id.clone(), entries);
    }
    for (id, _) in channels.series_channels() {
        if !weekly.channels.contains_key(id) {
            warn!(channel = %id, "series channel missing from weekly plan, regenerate the week");
        }
    }

    DailySchedule {
        generated_at: now,
        schedule_date,
        valid_from,
        valid_until,
        channels: expanded,
    }
}
