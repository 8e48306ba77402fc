use anyhow::{Context, Result};
use mt_free_auto::core::config::Config;
use mt_free_auto::core::{startup, tracing_init};
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    // Load and validate configuration before touching the network
    let config = if args.len() > 1 {
        let config_path = PathBuf::from(&args[1]);
        Config::from_file(&config_path).context(format!(
            "Failed to load configuration from '{}'",
            config_path.display()
        ))?
    } else {
        Config::from_env().context(
            "Failed to load configuration from environment. \
            Set MT_BASE_URL, MT_API_KEY, QB_URL, QB_PORT, QB_USER and QB_PASSWORD, \
            or pass a config file path (see config.example.toml).",
        )?
    };

    // Initialize tracing/logging
    tracing_init::init_tracing(&config.logging);

    // One sweep, nothing runs concurrently
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<()> {
    // thresholds are logged by the sweeper when the run starts
    info!(
        log_level = %config.logging.level,
        log_format = %config.logging.format,
        "Free torrent sweep starting"
    );

    let report = startup::run_sweep(&config).await?;

    info!(
        added = report.added,
        removed = report.removed,
        cleared = report.cleared,
        failed = report.failed,
        "Free torrent sweep complete"
    );

    Ok(())
}
