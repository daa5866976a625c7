use crate::error::{Result, ScheduleError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hour of the local day at which the broadcast day begins.
pub const BROADCAST_DAY_START_HOUR: u32 = 3;

/// Length of a broadcast day in seconds.
pub const DAY_SECS: u32 = 24 * 3600;

/// The first hour of every broadcast day airs the test pattern.
pub const TEST_PATTERN_SECS: u32 = 3600;

/// One of the five programming periods a broadcast day is divided into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    EarlyMorning,
    LateMorning,
    Afternoon,
    Evening,
    Night,
}

impl Period {
    /// All periods in broadcast-day order.
    pub const ALL: [Period; 5] = [
        Period::EarlyMorning,
        Period::LateMorning,
        Period::Afternoon,
        Period::Evening,
        Period::Night,
    ];

    /// Map a wall-clock hour (0-23) to its period. Night wraps past midnight.
    pub fn for_hour(hour: u32) -> Period {
        match hour % 24 {
            3..=6 => Period::EarlyMorning,
            7..=11 => Period::LateMorning,
            12..=16 => Period::Afternoon,
            17..=20 => Period::Evening,
            _ => Period::Night,
        }
    }

    /// Number of weekly slots planned for this period.
    ///
    /// One slot per programmed hour; the early-morning count excludes the
    /// test-pattern hour, so the five counts cover the 23 remaining hours.
    pub fn slot_count(&self) -> usize {
        match self {
            Period::EarlyMorning => 3,
            Period::LateMorning => 5,
            Period::Afternoon => 5,
            Period::Evening => 4,
            Period::Night => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::EarlyMorning => "early_morning",
            Period::LateMorning => "late_morning",
            Period::Afternoon => "afternoon",
            Period::Evening => "evening",
            Period::Night => "night",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A series' preferred airing period, or `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    EarlyMorning,
    LateMorning,
    Afternoon,
    Evening,
    Night,
    #[default]
    Any,
}

impl TimeOfDay {
    /// Parse a preference value. Accepts the closed set
    /// `early_morning, late_morning, afternoon, evening, night, any`
    /// (case-insensitive, hyphens allowed in place of underscores).
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "early_morning" => Ok(TimeOfDay::EarlyMorning),
            "late_morning" => Ok(TimeOfDay::LateMorning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            "night" => Ok(TimeOfDay::Night),
            "any" => Ok(TimeOfDay::Any),
            _ => Err(ScheduleError::InvalidInput(format!(
                "Unknown time of day '{}'. Expected: early_morning, late_morning, afternoon, evening, night, any",
                s
            ))),
        }
    }

    /// Whether a series with this preference may air during `period`.
    pub fn is_eligible_for(&self, period: Period) -> bool {
        match self {
            TimeOfDay::Any => true,
            other => other.period() == Some(period),
        }
    }

    fn period(&self) -> Option<Period> {
        match self {
            TimeOfDay::EarlyMorning => Some(Period::EarlyMorning),
            TimeOfDay::LateMorning => Some(Period::LateMorning),
            TimeOfDay::Afternoon => Some(Period::Afternoon),
            TimeOfDay::Evening => Some(Period::Evening),
            TimeOfDay::Night => Some(Period::Night),
            TimeOfDay::Any => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self.period() {
            Some(p) => p.as_str(),
            None => "any",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock hour at a given offset (seconds) into the broadcast day.
pub fn hour_at_offset(offset: u32) -> u32 {
    (BROADCAST_DAY_START_HOUR + offset / 3600) % 24
}
