//! Per-channel, per-series episode cursors.
//!
//! A cursor is the index of the next episode to air in a series'
//! chronological list. Cursors are created on first use, advance by one per
//! aired episode, and wrap modulo the episode count. The same series on two
//! channels keeps two independent cursors.

use crate::catalog::{Catalog, Episode};
use crate::error::Result;
use crate::store::{load_json_or_default, save_json_atomic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// channel id → series name → next episode index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeCursors(pub BTreeMap<String, BTreeMap<String, usize>>);

impl EpisodeCursors {
    /// Stored index for a pair, 0 when absent.
    pub fn index(&self, channel: &str, series: &str) -> usize {
        self.0
            .get(channel)
            .and_then(|m| m.get(series))
            .copied()
            .unwrap_or(0)
    }

    /// Episode the cursor points at, without advancing.
    pub fn peek<'a>(&self, channel: &str, series: &str, episodes: &'a [Episode]) -> Option<&'a Episode> {
        if episodes.is_empty() {
            return None;
        }
        episodes.get(self.index(channel, series) % episodes.len())
    }

    /// Return the episode at the cursor and advance it by one, wrapping.
    ///
    /// An empty episode list returns `None` and leaves the mapping untouched.
    pub fn advance(&mut self, channel: &str, series: &str, episodes: &[Episode]) -> Option<Episode> {
        if episodes.is_empty() {
            return None;
        }
        let current = self.index(channel, series) % episodes.len();
        let next = (current + 1) % episodes.len();
        self.0
            .entry(channel.to_string())
            .or_default()
            .insert(series.to_string(), next);
        episodes.get(current).cloned()
    }

    /// Clear one channel's cursors, or all of them. Returns how many were removed.
    pub fn reset(&mut self, channel: Option<&str>) -> usize {
        match channel {
            Some(id) => self.0.remove(id).map_or(0, |m| m.len()),
            None => {
                let count = self.0.values().map(|m| m.len()).sum();
                self.0.clear();
                count
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Persisted cursor document with whole-document atomic replace.
#[derive(Debug, Clone)]
pub struct EpisodeCursorStore {
    path: PathBuf,
}

impl EpisodeCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        EpisodeCursorStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> EpisodeCursors {
        load_json_or_default(&self.path)
    }

    pub fn save(&self, cursors: &EpisodeCursors) -> Result<()> {
        save_json_atomic(&self.path, cursors)
    }

    /// Pull the next episode of `series` for `channel` and persist the
    /// advanced cursor. Returns `None` when the series has no airable episodes.
    pub fn get_next_episode(&self, catalog: &Catalog, channel: &str, series: &str) -> Result<Option<Episode>> {
        let episodes = catalog.series_episodes(series);
        let mut cursors = self.load();
        let episode = match cursors.advance(channel, series, &episodes) {
            Some(ep) => ep,
            None => {
                debug!(channel, series, "no airable episodes");
                return Ok(None);
            }
        };
        self.save(&cursors)?;
        Ok(Some(episode))
    }
}
