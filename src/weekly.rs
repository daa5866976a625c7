//! Weekly slot planning for series-driven channels.
//!
//! Each channel gets, per programming period, a fixed number of slots. A slot
//! names a series and how many of its episodes air back to back. The plan is
//! regenerated wholesale; tag-driven channels never appear in it.

use crate::channels::{Channel, ChannelRegistry};
use crate::series::SeriesRegistry;
use crate::time_of_day::Period;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Back-to-back run lengths and their weights in percent.
pub const BACK_TO_BACK_WEIGHTS: [(u32, u32); 5] = [(2, 80), (3, 10), (4, 5), (5, 3), (6, 2)];

/// One planned segment of a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedSlot {
    pub series: String,
    pub back_to_back: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelWeek {
    pub time_slots: BTreeMap<Period, Vec<PlannedSlot>>,
}

impl ChannelWeek {
    pub fn slots(&self, period: Period) -> &[PlannedSlot] {
        self.time_slots.get(&period).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub generated_at: DateTime<FixedOffset>,
    pub week_start: NaiveDate,
    pub channels: BTreeMap<String, ChannelWeek>,
}

/// Draw a run length from [`BACK_TO_BACK_WEIGHTS`].
pub fn select_back_to_back_count(rng: &mut fastrand::Rng) -> u32 {
    let total: u32 = BACK_TO_BACK_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut roll = rng.u32(0..total);
    for (count, weight) in BACK_TO_BACK_WEIGHTS {
        if roll < weight {
            return count;
        }
        roll -= weight;
    }
    BACK_TO_BACK_WEIGHTS[0].0
}

/// Series of a channel allowed to air in `period`, in channel order.
pub fn eligible_series(period: Period, channel_series: &[String], registry: &SeriesRegistry) -> Vec<String> {
    channel_series
        .iter()
        .filter(|s| registry.time_of_day(s).is_eligible_for(period))
        .cloned()
        .collect()
}

/// Plan every period of one channel.
///
/// Eligible series are visited round-robin from a random starting point, so
/// each eligible series is reached once the period has as many slots as there
/// are candidates. When no series of the channel prefers a period, the whole
/// channel list is used rather than leaving the period dark.
pub fn plan_channel(channel: &Channel, registry: &SeriesRegistry, rng: &mut fastrand::Rng) -> ChannelWeek {
    let mut week = ChannelWeek::default();
    for period in Period::ALL {
        let mut candidates = eligible_series(period, channel.series(), registry);
        if candidates.is_empty() {
            debug!(channel = %channel.name, %period, "no series prefers this period, using full rotation");
            candidates = channel.series().to_vec();
        }
        let slots = if candidates.is_empty() {
            Vec::new()
        } else {
            let start = rng.usize(0..candidates.len());
            (0..period.slot_count())
                .map(|i| PlannedSlot {
                    series: candidates[(start + i) % candidates.len()].clone(),
                    back_to_back: select_back_to_back_count(rng),
                })
                .collect()
        };
        week.time_slots.insert(period, slots);
    }
    week
}

/// Plan the week for every series-driven channel.
pub fn generate_weekly_schedule(
    channels: &ChannelRegistry,
    registry: &SeriesRegistry,
    generated_at: DateTime<FixedOffset>,
    week_start: NaiveDate,
    rng: &mut fastrand::Rng,
) -> WeeklySchedule {
    let planned: BTreeMap<String, ChannelWeek> = channels
        .series_channels()
        .map(|(id, channel)| (id.clone(), plan_channel(channel, registry, rng)))
        .collect();
    info!(
        channels = planned.len(),
        skipped = channels.len() - planned.len(),
        %week_start,
        "weekly schedule planned"
    );
    WeeklySchedule {
        generated_at,
        week_start,
        channels: planned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SeriesRegistry {
        serde_json::from_str(
            r#"{
                "A": {"created": "2025-01-01", "time_of_day": "evening"},
                "B": {"created": "2025-01-02", "time_of_day": "any"},
                "C": {"created": "2025-01-03", "time_of_day": "night"}
            }"#,
        )
        .unwrap()
    }

    fn channels() -> ChannelRegistry {
        serde_json::from_str(
            r#"{
                "channel_1": {"nombre": "Uno", "series_filter": ["A", "B"]},
                "channel_2": {"nombre": "Dos", "series_filter": ["C"]},
                "channel_3": {"nombre": "Tres", "tags_incluidos": ["tag1"]}
            }"#,
        )
        .unwrap()
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn eligibility_by_period() {
        let reg = registry();
        let all = names(&["A", "B", "C"]);
        assert_eq!(eligible_series(Period::Evening, &all, &reg), names(&["A", "B"]));
        assert_eq!(eligible_series(Period::Night, &all, &reg), names(&["B", "C"]));
        assert_eq!(eligible_series(Period::EarlyMorning, &all, &reg), names(&["B"]));
    }

    #[test]
    fn unknown_series_count_as_any() {
        let reg = registry();
        let list = names(&["Mystery"]);
        assert_eq!(eligible_series(Period::Afternoon, &list, &reg), list);
    }

    #[test]
    fn back_to_back_favours_pairs() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
        for _ in 0..1000 {
            *counts.entry(select_back_to_back_count(&mut rng)).or_default() += 1;
        }
        assert!(counts.keys().all(|k| (2..=6).contains(k)));
        let pairs = counts[&2];
        for k in 3..=6 {
            assert!(pairs > counts.get(&k).copied().unwrap_or(0), "2 vs {}", k);
        }
        assert!(pairs > 700);
    }

    #[test]
    fn every_series_channel_gets_full_slot_lists() {
        let mut rng = fastrand::Rng::with_seed(1);
        let at = DateTime::parse_from_rfc3339("2025-03-12T10:00:00+00:00").unwrap();
        let week = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let plan = generate_weekly_schedule(&channels(), &registry(), at, week, &mut rng);

        assert!(!plan.channels.contains_key("channel_3"));
        for id in ["channel_1", "channel_2"] {
            let ch = &plan.channels[id];
            for period in Period::ALL {
                assert_eq!(ch.slots(period).len(), period.slot_count(), "{} {}", id, period);
            }
        }
    }

    #[test]
    fn slots_respect_preferences() {
        let mut rng = fastrand::Rng::with_seed(3);
        let reg = registry();
        let chans = channels();
        let week = plan_channel(chans.get("channel_1").unwrap(), &reg, &mut rng);
        assert!(week.slots(Period::EarlyMorning).iter().all(|s| s.series == "B"));
        let evening: Vec<&str> = week.slots(Period::Evening).iter().map(|s| s.series.as_str()).collect();
        assert!(evening.contains(&"A") && evening.contains(&"B"));
    }

    #[test]
    fn same_seed_same_plan() {
        let at = DateTime::parse_from_rfc3339("2025-03-12T10:00:00+00:00").unwrap();
        let week = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let a = generate_weekly_schedule(&channels(), &registry(), at, week, &mut fastrand::Rng::with_seed(99));
        let b = generate_weekly_schedule(&channels(), &registry(), at, week, &mut fastrand::Rng::with_seed(99));
        assert_eq!(a, b);
    }

    #[test]
    fn document_uses_period_names_as_keys() {
        let mut rng = fastrand::Rng::with_seed(5);
        let reg = registry();
        let chans = channels();
        let week = plan_channel(chans.get("channel_2").unwrap(), &reg, &mut rng);
        let json = serde_json::to_value(&week).unwrap();
        let slots = json["time_slots"].as_object().unwrap();
        for period in Period::ALL {
            assert!(slots.contains_key(period.as_str()));
        }
        let back: ChannelWeek = serde_json::from_value(json).unwrap();
        assert_eq!(back, week);
    }
}
