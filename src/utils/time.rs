use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};

/// Format the tracker uses for `discountEndTime`
pub const TRACKER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stand-in expiry for free promotions without an end time
pub fn unlimited_free_until(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(365)
}

pub fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Timezone the tracker's wall-clock timestamps are written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerZone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl TrackerZone {
    pub fn from_offset(offset: Option<FixedOffset>) -> Self {
        offset.map(TrackerZone::Fixed).unwrap_or(TrackerZone::Local)
    }

    /// Parse a `YYYY-MM-DD HH:MM:SS` wall-clock time into UTC
    pub fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(raw.trim(), TRACKER_TIME_FORMAT).ok()?;
        match self {
            TrackerZone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            TrackerZone::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    pub fn format(&self, at: DateTime<Utc>) -> String {
        match self {
            TrackerZone::Local => at.with_timezone(&Local).format(TRACKER_TIME_FORMAT).to_string(),
            TrackerZone::Fixed(offset) => at.with_timezone(offset).format(TRACKER_TIME_FORMAT).to_string(),
        }
    }
}
