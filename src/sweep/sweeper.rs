//! One poll-filter-act pass over the configured tracker categories

use crate::api::tracker::ListingSource;
use crate::core::config::SweepConfig;
use crate::core::error::SweepError;
use crate::models::listing::FreeListing;
use crate::notify::telegram::Notifier;
use crate::stores::tag_store::TagStore;
use crate::sweep::decision::{classify, Decision, SkipReason, Thresholds};
use crate::utils::time::TrackerZone;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

pub const ADD_TITLE: &str = "MT FREE 种子下载通知";
pub const REMOVE_TITLE: &str = "MT FREE 种子删除通知";

/// Counters for one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries purged by the maintenance pass
    pub cleared: usize,
    /// Free listings seen across all categories
    pub seen: usize,
    pub added: usize,
    pub removed: usize,
    pub skipped: usize,
    /// Listings the tracker would not issue a download token for
    pub refused: usize,
    /// Download-client failures isolated to one listing or the maintenance pass
    pub failed: usize,
}

impl SweepReport {
    pub fn summary(&self) -> String {
        format!(
            "cleared={} seen={} added={} removed={} skipped={} refused={} failed={}",
            self.cleared, self.seen, self.added, self.removed, self.skipped, self.refused, self.failed
        )
    }
}

pub struct Sweeper<'a, L, S> {
    source: &'a L,
    store: &'a S,
    notifier: &'a Notifier,
    config: &'a SweepConfig,
    thresholds: Thresholds,
    zone: TrackerZone,
}

impl<'a, L, S> Sweeper<'a, L, S>
where
    L: ListingSource,
    S: TagStore,
{
    pub fn new(
        source: &'a L,
        store: &'a S,
        notifier: &'a Notifier,
        config: &'a SweepConfig,
        zone: TrackerZone,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            config,
            thresholds: Thresholds::from_config(config),
            zone,
        }
    }

    /// Run the maintenance pass, then every category once
    ///
    /// Download-client failures are contained to the listing they happen on.
    /// Tracker failures abort the run.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport, SweepError> {
        info!(
            add_free_days = self.config.add_free_days,
            remove_free_hours = self.config.remove_free_hours,
            file_size_limit_gb = self.config.file_size_limit_gb,
            clear_days = self.config.clear_days,
            start_paused = self.config.start_paused,
            dry_run = self.config.dry_run,
            "Sweep started"
        );

        let mut report = SweepReport::default();

        self.clear_expired(now, &mut report).await;

        for mode in &self.config.modes {
            let listings = self.source.search_free(mode, now).await?;

            info!(mode = %mode, count = listings.len(), "Free torrents found");

            for listing in &listings {
                report.seen += 1;

                match self.handle_listing(listing, now, &mut report).await {
                    Ok(()) => {}
                    Err(SweepError::Client(e)) => {
                        report.failed += 1;
                        error!(
                            mode = %mode,
                            listing_id = %listing.id,
                            error = %e,
                            "Download client call failed, continuing with next listing"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        info!(summary = %report.summary(), "Sweep finished");

        Ok(report)
    }

    /// Purge tool-tagged entries older than `clear_days`, free or not
    async fn clear_expired(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let cutoff = now - self.config.clear_after();

        let torrents = match self.store.list_by_tag(&self.config.tag).await {
            Ok(torrents) => torrents,
            Err(e) => {
                report.failed += 1;
                error!(tag = %self.config.tag, error = %e, "Failed to list managed torrents for clearing");
                return;
            }
        };

        let expired: Vec<_> = torrents.into_iter().filter(|t| t.added_at() < cutoff).collect();

        if expired.is_empty() {
            debug!(clear_days = self.config.clear_days, "No managed torrents to clear");
            return;
        }

        let hashes: Vec<String> = expired.iter().map(|t| t.hash.clone()).collect();
        // only tags this tool derives from listing ids; deleteTags is client-wide
        let prefix = self.config.listing_tag_prefix.as_str();
        let mut listing_tags: Vec<String> = expired
            .iter()
            .flat_map(|t| t.tags.iter())
            .filter(|tag| {
                !prefix.is_empty()
                    && **tag != self.config.tag
                    && tag.len() > prefix.len()
                    && tag.starts_with(prefix)
            })
            .cloned()
            .collect();
        listing_tags.sort();
        listing_tags.dedup();

        info!(count = hashes.len(), clear_days = self.config.clear_days, "Clearing old managed torrents");

        if self.config.dry_run {
            info!(hashes = ?hashes, "Dry run, not clearing");
            return;
        }

        if let Err(e) = self.store.remove_hashes(&hashes).await {
            report.failed += 1;
            error!(error = %e, "Failed to clear old managed torrents");
            return;
        }

        report.cleared += hashes.len();

        if listing_tags.is_empty() {
            return;
        }

        if let Err(e) = self.store.delete_tags(&listing_tags).await {
            warn!(tags = ?listing_tags, error = %e, "Failed to delete tags of cleared torrents");
        }
    }

    async fn handle_listing(
        &self,
        listing: &FreeListing,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Result<(), SweepError> {
        let tag = listing.tag(&self.config.listing_tag_prefix);

        match classify(listing, now, &self.thresholds) {
            Decision::RemoveIfPresent => self.remove_listing(listing, tag, report).await,
            Decision::Skip(reason) => {
                report.skipped += 1;
                debug!(listing_id = %listing.id, reason = ?reason, "Skipping free torrent");
                Ok(())
            }
            Decision::AddIfAbsent => self.add_listing(listing, tag, report).await,
        }
    }

    async fn remove_listing(
        &self,
        listing: &FreeListing,
        tag: String,
        report: &mut SweepReport,
    ) -> Result<(), SweepError> {
        if !self.store.has_tag(&tag).await? {
            debug!(listing_id = %listing.id, tag = %tag, "Free window closing, listing was never added");
            return Ok(());
        }

        info!(listing = %listing.summary(&self.zone), "Auto removing free torrent");

        if self.config.dry_run {
            report.removed += 1;
            return Ok(());
        }

        self.store.remove_by_tag(&tag).await?;
        report.removed += 1;

        if let Err(e) = self.store.delete_tags(&[tag.clone()]).await {
            warn!(tag = %tag, error = %e, "Failed to delete listing tag");
        }

        self.notifier
            .notify(REMOVE_TITLE, &listing.message_body(&self.zone))
            .await;

        Ok(())
    }

    async fn add_listing(
        &self,
        listing: &FreeListing,
        tag: String,
        report: &mut SweepReport,
    ) -> Result<(), SweepError> {
        if self.store.has_tag(&tag).await? {
            report.skipped += 1;
            debug!(listing_id = %listing.id, reason = ?SkipReason::AlreadyAdded, "Skipping free torrent");
            return Ok(());
        }

        info!(listing = %listing.summary(&self.zone), "Auto adding free torrent");

        if self.config.dry_run {
            report.added += 1;
            return Ok(());
        }

        let Some(link) = self.source.fetch_download_link(&listing.id).await? else {
            report.refused += 1;
            return Ok(());
        };

        let tags = vec![self.config.tag.clone(), tag];
        self.store
            .add_with_tags(&link, &tags, self.config.start_paused)
            .await?;
        report.added += 1;

        self.notifier
            .notify(ADD_TITLE, &listing.message_body(&self.zone))
            .await;

        Ok(())
    }
}
