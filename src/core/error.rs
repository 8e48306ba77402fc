// Centralized error handling for the sweeper

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Validation(String),
}

/// Errors talking to the tracker API
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Tracker search in [{category}] returned error status: {status}")]
    SearchStatus { status: u16, category: String },

    #[error("Tracker download token request for listing {listing_id} returned error status: {status}")]
    TokenStatus { status: u16, listing_id: String },

    #[error("Failed to send request to tracker: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected tracker response: {0}")]
    Decode(String),
}

/// Errors talking to the download client control API
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Download client login rejected credentials")]
    LoginRejected,

    #[error("Download client {operation} returned error status: {status}")]
    Status { operation: &'static str, status: u16 },

    #[error("Download client rejected torrent: {0}")]
    Rejected(String),

    #[error("Failed to send request to download client: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors delivering a notification. Never escapes the notifier.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification API returned error status: {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to send notification: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors that abort a sweep run
#[derive(Error, Debug)]
pub enum SweepError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Client(#[from] ClientError),
}
