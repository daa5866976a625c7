use crate::store::{load_records, null_as_default};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A channel definition from the channel registry.
///
/// A channel with a non-empty `series_filter` is series-driven and takes part
/// in weekly and daily generation. Channels without one are tag-driven and
/// are programmed elsewhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "nombre", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_filter: Option<Vec<String>>,
    #[serde(
        rename = "tags_prioridad",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub priority_tags: Vec<String>,
    #[serde(
        rename = "tags_incluidos",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub included_tags: Vec<String>,
}

impl Channel {
    /// Series rotated on this channel; empty for tag-driven channels.
    pub fn series(&self) -> &[String] {
        self.series_filter.as_deref().unwrap_or(&[])
    }

    pub fn is_series_driven(&self) -> bool {
        !self.series().is_empty()
    }
}

/// Channel id → definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelRegistry(pub BTreeMap<String, Channel>);

impl ChannelRegistry {
    /// Load the registry. A malformed channel is skipped, not the whole file.
    pub fn load(path: &Path) -> Self {
        ChannelRegistry(load_records(path))
    }

    pub fn get(&self, id: &str) -> Option<&Channel> {
        self.0.get(id)
    }

    /// Series-driven channels in id order.
    pub fn series_channels(&self) -> impl Iterator<Item = (&String, &Channel)> {
        self.0.iter().filter(|(_, c)| c.is_series_driven())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANNELS: &str = r#"{
        "channel_1": {"nombre": "Uno", "series_filter": ["A", "B"], "tags_prioridad": [], "tags_incluidos": []},
        "channel_2": {"nombre": "Dos", "series_filter": []},
        "channel_3": {"nombre": "Tres", "tags_prioridad": ["tag1"], "tags_incluidos": ["tag1"]}
    }"#;

    #[test]
    fn only_channels_with_series_are_series_driven() {
        let reg: ChannelRegistry = serde_json::from_str(CHANNELS).unwrap();
        let ids: Vec<&str> = reg.series_channels().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["channel_1"]);
        assert_eq!(reg.get("channel_1").unwrap().series(), ["A", "B"]);
        assert!(reg.get("channel_3").unwrap().series().is_empty());
        assert_eq!(reg.get("channel_3").unwrap().included_tags, vec!["tag1"]);
    }

    #[test]
    fn malformed_channel_is_skipped_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canales.json");
        std::fs::write(
            &path,
            r#"{
                "channel_1": {"nombre": "Uno", "series_filter": ["A"], "tags_prioridad": null, "tags_incluidos": null},
                "channel_2": {"nombre": null, "series_filter": null},
                "channel_3": {"nombre": "Tres", "series_filter": "A"}
            }"#,
        )
        .unwrap();
        let reg = ChannelRegistry::load(&path);
        assert_eq!(reg.len(), 2);
        assert!(reg.get("channel_3").is_none());
        assert_eq!(reg.get("channel_1").unwrap().series(), ["A"]);
        assert!(reg.get("channel_1").unwrap().included_tags.is_empty());
        assert!(!reg.get("channel_2").unwrap().is_series_driven());
    }

    #[test]
    fn missing_registry_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reg = ChannelRegistry::load(&dir.path().join("canales.json"));
        assert!(reg.is_empty());
    }
}
