//! Series registry and per-series time-of-day preferences.

use crate::error::Result;
use crate::store::{load_json_or_default, save_json_atomic};
use crate::time_of_day::TimeOfDay;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Raw stored preference. Unrecognized values read as `any`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    /// Fields owned by other tools, carried through rewrites untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl SeriesInfo {
    pub fn preference(&self) -> TimeOfDay {
        match self.time_of_day.as_deref() {
            None => TimeOfDay::Any,
            Some(raw) => TimeOfDay::parse(raw).unwrap_or_else(|_| {
                warn!(value = raw, "unrecognized stored time_of_day, treating as any");
                TimeOfDay::Any
            }),
        }
    }
}

/// Series name → registry record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesRegistry(pub BTreeMap<String, SeriesInfo>);

impl SeriesRegistry {
    pub fn load(path: &Path) -> Self {
        load_json_or_default(path)
    }

    /// Preference of `series`, `Any` when unknown or unset.
    pub fn time_of_day(&self, series: &str) -> TimeOfDay {
        self.0
            .get(series)
            .map(SeriesInfo::preference)
            .unwrap_or_default()
    }

    pub fn get(&self, series: &str) -> Option<&SeriesInfo> {
        self.0.get(series)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Reads and updates preferences in the persisted series registry.
#[derive(Debug, Clone)]
pub struct SeriesPreferenceStore {
    path: PathBuf,
    /// Stamped as `created` on series registered by a preference update.
    today: Option<NaiveDate>,
}

impl SeriesPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SeriesPreferenceStore {
            path: path.into(),
            today: None,
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn get_time_of_day(&self, series: &str) -> TimeOfDay {
        SeriesRegistry::load(&self.path).time_of_day(series)
    }

    /// Validate and persist a new preference for `series`.
    ///
    /// An unrecognized value fails without touching the stored registry. A
    /// series not yet in the registry is added with `created` set to today.
    pub fn set_time_of_day(&self, series: &str, value: &str) -> Result<TimeOfDay> {
        let pref = TimeOfDay::parse(value)?;
        let mut registry = SeriesRegistry::load(&self.path);
        let info = registry.0.entry(series.to_string()).or_insert_with(|| {
            info!(series, "registering series");
            SeriesInfo {
                created: self.today.map(|d| d.to_string()),
                ..Default::default()
            }
        });
        info.time_of_day = Some(pref.as_str().to_string());
        save_json_atomic(&self.path, &registry)?;
        info!(series, time_of_day = %pref, "series preference updated");
        Ok(pref)
    }
}
