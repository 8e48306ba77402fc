use crate::utils::time::from_unix;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// A torrent entry inside the download client, addressed by content hash
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ManagedTorrent {
    pub hash: String,
    #[serde(default)]
    pub name: String,
    /// qBittorrent reports tags as one comma-separated string
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    /// Unix seconds
    #[serde(default)]
    pub added_on: i64,
}

impl ManagedTorrent {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        from_unix(self.added_on)
    }
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_torrent_info() {
        let json = r#"{
            "hash": "8c212779b4abde7c6bc608063a0d008b7e40ce32",
            "name": "Some.Movie.2024.1080p",
            "tags": "mt_42, mt_free_auto",
            "added_on": 1700000000,
            "state": "downloading"
        }"#;

        let torrent: ManagedTorrent = serde_json::from_str(json).unwrap();
        assert_eq!(torrent.hash, "8c212779b4abde7c6bc608063a0d008b7e40ce32");
        assert_eq!(torrent.tags, vec!["mt_42", "mt_free_auto"]);
        assert!(torrent.has_tag("mt_free_auto"));
        assert!(!torrent.has_tag("mt_4"));
        assert_eq!(torrent.added_at().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_deserialize_without_tags() {
        let json = r#"{"hash": "abc", "tags": ""}"#;
        let torrent: ManagedTorrent = serde_json::from_str(json).unwrap();
        assert!(torrent.tags.is_empty());
        assert_eq!(torrent.added_on, 0);
    }
}
