use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Duration;
use tracing::info;

use crate::api::qbittorrent::QbClient;
use crate::api::tracker::TrackerClient;
use crate::core::config::Config;
use crate::notify::telegram::Notifier;
use crate::sweep::sweeper::{SweepReport, Sweeper};
use crate::utils::time::TrackerZone;

// Builds the collaborators from config and runs one sweep
pub async fn run_sweep(config: &Config) -> Result<SweepReport> {
    let zone = TrackerZone::from_offset(config.tracker.utc_offset());

    let tracker = TrackerClient::new(
        config.tracker.base_url.clone(),
        config.tracker.api_key.clone(),
        Duration::from_secs(config.tracker.request_delay_secs),
        zone,
    )
    .context("Failed to create tracker client")?;

    let qb = QbClient::new(
        &config.client.url,
        config.client.port,
        config.client.username.clone(),
        config.client.password.clone(),
    )
    .context("Failed to create download client")?;

    qb.login()
        .await
        .context(format!("Failed to log in to download client at {}", qb.base()))?;

    let notifier = Notifier::from_config(&config.notify)
        .context("Failed to create notification client")?;

    info!(
        tracker = %config.tracker.base_url,
        client = %qb.base(),
        modes = ?config.sweep.modes,
        notifications = notifier.is_enabled(),
        "Collaborators ready"
    );

    let report = Sweeper::new(&tracker, &qb, &notifier, &config.sweep, zone)
        .run(Utc::now())
        .await
        .context("Sweep aborted")?;

    Ok(report)
}
