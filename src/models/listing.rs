use crate::core::config::BYTES_GB;
use crate::utils::time::TrackerZone;
use chrono::{DateTime, Utc};

/// A tracker listing currently under a free promotion
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FreeListing {
    /// Tracker-assigned id, normalized to a string
    pub id: String,
    pub name: String,
    pub small_descr: String,
    /// Total content size in bytes
    pub size: u64,
    pub seeders: u64,
    pub leechers: u64,
    /// End of the free promotion; a year out when the tracker gives none
    pub free_until: DateTime<Utc>,
}

impl FreeListing {
    /// Per-listing tag used to find this listing in the download client
    pub fn tag(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.id)
    }

    pub fn size_gb(&self) -> u64 {
        self.size / BYTES_GB
    }

    /// Single-line description for log output
    pub fn summary(&self, zone: &TrackerZone) -> String {
        format!(
            "id={} name={:?} small_descr={:?} size={} GB seeders={} leechers={} free_until={}",
            self.id,
            self.name,
            self.small_descr,
            self.size_gb(),
            self.seeders,
            self.leechers,
            zone.format(self.free_until),
        )
    }

    /// Notification body
    pub fn message_body(&self, zone: &TrackerZone) -> String {
        format!(
            "[种子名称]: {}\n[种子描述]: {}\n[文件大小]: {} GB\n[做种数]: {}\n[下载数]: {}\n[FREE到期时间]: {}",
            self.name,
            self.small_descr,
            self.size_gb(),
            self.seeders,
            self.leechers,
            zone.format(self.free_until),
        )
    }
}
