use crate::core::error::ClientError;
use crate::models::managed::ManagedTorrent;
use async_trait::async_trait;

/// Tags on download-client entries used as the only bookkeeping store
///
/// Every entry this tool adds carries the tool tag plus one tag derived from
/// the tracker listing id, so "is this listing added" and "drop this listing"
/// are both tag lookups.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Entries carrying `tag`
    async fn list_by_tag(&self, tag: &str) -> Result<Vec<ManagedTorrent>, ClientError>;

    /// Add a download link with the given tags
    async fn add_with_tags(&self, link: &str, tags: &[String], start_paused: bool) -> Result<(), ClientError>;

    /// Delete entries, including downloaded data, by content hash
    async fn remove_hashes(&self, hashes: &[String]) -> Result<(), ClientError>;

    /// Drop tag labels from the client's tag registry
    async fn delete_tags(&self, tags: &[String]) -> Result<(), ClientError>;

    async fn has_tag(&self, tag: &str) -> Result<bool, ClientError> {
        Ok(!self.list_by_tag(tag).await?.is_empty())
    }

    /// Delete every entry carrying `tag`; returns how many were deleted
    async fn remove_by_tag(&self, tag: &str) -> Result<usize, ClientError> {
        let hashes: Vec<String> = self
            .list_by_tag(tag)
            .await?
            .into_iter()
            .map(|t| t.hash)
            .collect();

        if hashes.is_empty() {
            return Ok(0);
        }

        self.remove_hashes(&hashes).await?;
        Ok(hashes.len())
    }
}
