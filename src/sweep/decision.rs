use crate::core::config::SweepConfig;
use crate::models::listing::FreeListing;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Minimum remaining free time for a listing to be added
    pub add_window: Duration,
    /// Remaining free time below which an added listing is retracted
    pub remove_window: Duration,
    /// Listings of this size or larger are never added
    pub size_limit: u64,
}

impl Thresholds {
    pub fn from_config(config: &SweepConfig) -> Self {
        Self {
            add_window: config.add_window(),
            remove_window: config.remove_window(),
            size_limit: config.size_limit_bytes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Free window too short to be worth starting
    ClosingSoon,
    TooLarge,
    AlreadyAdded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Free window about to lapse; retract the listing if it was added
    RemoveIfPresent,
    Skip(SkipReason),
    /// Worth adding unless the download client already has it
    AddIfAbsent,
}

/// Classify a listing from its free window and size alone
///
/// The "already added" check needs the download client and is left to the
/// caller for [`Decision::AddIfAbsent`].
pub fn classify(listing: &FreeListing, now: DateTime<Utc>, thresholds: &Thresholds) -> Decision {
    if listing.free_until < now + thresholds.remove_window {
        Decision::RemoveIfPresent
    } else if listing.free_until < now + thresholds.add_window {
        Decision::Skip(SkipReason::ClosingSoon)
    } else if listing.size >= thresholds.size_limit {
        Decision::Skip(SkipReason::TooLarge)
    } else {
        Decision::AddIfAbsent
    }
}
