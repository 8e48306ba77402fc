use crate::core::error::ClientError;
use crate::models::managed::ManagedTorrent;
use crate::stores::tag_store::TagStore;
use async_trait::async_trait;
use reqwest::header::REFERER;
use std::time::Duration;
use tracing::{debug, info};

/// Client for the qBittorrent WebUI API (v2)
pub struct QbClient {
    client: reqwest::Client,
    base: String,
    username: String,
    password: String,
}

impl QbClient {
    pub fn new(url: &str, port: u16, username: String, password: String) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base: endpoint_base(url, port),
            username,
            password,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.base, path)
    }

    /// Log in; the session cookie is kept by the HTTP client
    pub async fn login(&self) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.endpoint("auth/login"))
            .header(REFERER, &self.base)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                operation: "login",
                status: status.as_u16(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        if !body.to_ascii_lowercase().contains("ok") {
            return Err(ClientError::LoginRejected);
        }

        info!(host = %self.base, "Logged in to download client");
        Ok(())
    }

    async fn post_form(
        &self,
        operation: &'static str,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<String, ClientError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .header(REFERER, &self.base)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                operation,
                status: status.as_u16(),
            });
        }

        Ok(response.text().await.unwrap_or_default())
    }
}

#[async_trait]
impl TagStore for QbClient {
    async fn list_by_tag(&self, tag: &str) -> Result<Vec<ManagedTorrent>, ClientError> {
        let response = self
            .client
            .get(self.endpoint("torrents/info"))
            .header(REFERER, &self.base)
            .query(&[("tag", tag)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                operation: "list",
                status: status.as_u16(),
            });
        }

        let torrents = response.json::<Vec<ManagedTorrent>>().await?;
        debug!(tag = %tag, count = torrents.len(), "Listed torrents by tag");
        Ok(torrents)
    }

    async fn add_with_tags(&self, link: &str, tags: &[String], start_paused: bool) -> Result<(), ClientError> {
        let tags = tags.join(",");
        let paused = if start_paused { "true" } else { "false" };

        // `paused` for 4.x, `stopped` for 5.x
        let body = self
            .post_form(
                "add",
                "torrents/add",
                &[
                    ("urls", link),
                    ("tags", tags.as_str()),
                    ("paused", paused),
                    ("stopped", paused),
                ],
            )
            .await?;

        if body.to_ascii_lowercase().contains("fails") {
            return Err(ClientError::Rejected(body));
        }

        info!(tags = %tags, paused = start_paused, "Added torrent to download client");
        Ok(())
    }

    async fn remove_hashes(&self, hashes: &[String]) -> Result<(), ClientError> {
        if hashes.is_empty() {
            return Ok(());
        }

        let joined = hashes.join("|");
        self.post_form(
            "delete",
            "torrents/delete",
            &[("hashes", joined.as_str()), ("deleteFiles", "true")],
        )
        .await?;

        info!(hashes = %joined, "Removed torrents from download client");
        Ok(())
    }

    async fn delete_tags(&self, tags: &[String]) -> Result<(), ClientError> {
        if tags.is_empty() {
            return Ok(());
        }

        let joined = tags.join(",");
        self.post_form("delete tags", "torrents/deleteTags", &[("tags", joined.as_str())])
            .await?;

        debug!(tags = %joined, "Deleted tags from download client");
        Ok(())
    }
}

/// Accepts `host`, `host:port` or a full URL; appends `port` when none is given
fn endpoint_base(url: &str, port: u16) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let trimmed = if trimmed.is_empty() { "127.0.0.1" } else { trimmed };
    if trimmed.contains("://") {
        if has_explicit_port(trimmed) {
            trimmed.to_string()
        } else {
            format!("{trimmed}:{port}")
        }
    } else if has_explicit_port(trimmed) {
        format!("http://{trimmed}")
    } else {
        format!("http://{trimmed}:{port}")
    }
}

fn has_explicit_port(base: &str) -> bool {
    let without_scheme = base.split_once("://").map(|(_, rest)| rest).unwrap_or(base);
    let authority = without_scheme.split('/').next().unwrap_or(without_scheme);
    authority
        .rsplit_once(':')
        .and_then(|(_, maybe_port)| maybe_port.parse::<u16>().ok())
        .is_some()
}
