// ABOUTME: Durable community -> intake channel registry with lazy self-healing
// ABOUTME: Persists a flat, hand-editable JSON object after every mutation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::error::RegistryError;
use crate::metrics;
use crate::traits::VoicePlatform;

/// Ids are written as strings but hand-edited files may use bare numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredId {
    Text(String),
    Number(u64),
}

impl From<StoredId> for String {
    fn from(id: StoredId) -> Self {
        match id {
            StoredId::Text(s) => s,
            StoredId::Number(n) => n.to_string(),
        }
    }
}

/// Maps each community to its single intake channel.
///
/// The in-memory map is the source of truth for the running process; the file
/// on disk is a best-effort mirror rewritten after every mutation.
pub struct ChannelRegistry {
    path: PathBuf,
    channels: Mutex<BTreeMap<String, String>>,
}

impl ChannelRegistry {
    /// Load the registry from `path`. A missing or malformed file yields an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let channels = read_store(&path);
        metrics::set_registered_channels(channels.len());
        Self {
            path,
            channels: Mutex::new(channels),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the intake channel for a community.
    ///
    /// An entry whose channel no longer exists on the platform is removed and the
    /// store rewritten before `None` is returned.
    pub async fn get<P>(&self, community_id: &str, platform: &P) -> Option<String>
    where
        P: VoicePlatform + ?Sized,
    {
        self.resolve(community_id, platform).await
    }

    /// Register `channel_id` as the community's intake channel.
    ///
    /// Fails with `AlreadyExists` when a live entry is present; a stale one is
    /// healed away first.
    pub async fn create<P>(
        &self,
        community_id: &str,
        channel_id: &str,
        platform: &P,
    ) -> Result<(), RegistryError>
    where
        P: VoicePlatform + ?Sized,
    {
        let already_exists = |existing: String| RegistryError::AlreadyExists {
            community_id: community_id.to_string(),
            existing,
        };

        if let Some(existing) = self.resolve(community_id, platform).await {
            return Err(already_exists(existing));
        }

        let mut channels = self.channels.lock().await;
        if let Some(existing) = channels.get(community_id) {
            // Registered by someone else while the stale entry was being checked
            return Err(already_exists(existing.clone()));
        }
        channels.insert(community_id.to_string(), channel_id.to_string());
        tracing::info!(
            community_id = %community_id,
            channel_id = %channel_id,
            "Registered intake channel"
        );
        self.persist_locked(&channels);
        Ok(())
    }

    /// Drop a community's entry without consulting the platform
    pub async fn remove(&self, community_id: &str) -> Option<String> {
        let mut channels = self.channels.lock().await;
        let removed = channels.remove(community_id);
        if removed.is_some() {
            self.persist_locked(&channels);
        }
        removed
    }

    /// Copy of every entry, as stored (not validated against the platform)
    pub async fn snapshot(&self) -> BTreeMap<String, String> {
        self.channels.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.channels.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.channels.lock().await.is_empty()
    }

    /// Rewrite the store from the current in-memory state
    pub async fn persist(&self) -> Result<()> {
        let channels = self.channels.lock().await;
        write_store(&self.path, &channels)
    }

    /// The lock is not held while the platform is asked about the channel, so
    /// a slow lookup for one community does not stall the others.
    async fn resolve<P>(&self, community_id: &str, platform: &P) -> Option<String>
    where
        P: VoicePlatform + ?Sized,
    {
        let stored = self.channels.lock().await.get(community_id)?.clone();
        if platform.channel_exists(community_id, &stored).await {
            return Some(stored);
        }

        let mut channels = self.channels.lock().await;
        if channels.get(community_id) != Some(&stored) {
            // Replaced or removed during the lookup; leave the newer state alone
            return channels.get(community_id).cloned();
        }

        tracing::warn!(
            community_id = %community_id,
            channel_id = %stored,
            "Request channel not found, removing from saved data"
        );
        channels.remove(community_id);
        self.persist_locked(&channels);
        None
    }

    fn persist_locked(&self, channels: &BTreeMap<String, String>) {
        metrics::set_registered_channels(channels.len());
        match write_store(&self.path, channels) {
            Ok(()) => tracing::debug!(
                path = %self.path.display(),
                entries = channels.len(),
                "Saved request channels"
            ),
            Err(e) => {
                metrics::record_error("registry_persist");
                tracing::error!(
                    error = %e,
                    path = %self.path.display(),
                    "Failed to save request channels"
                );
            }
        }
    }
}

fn read_store(path: &Path) -> BTreeMap<String, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(
                path = %path.display(),
                "No existing request channel store found, starting empty"
            );
            return BTreeMap::new();
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                "Request channel store unreadable, starting empty"
            );
            return BTreeMap::new();
        }
    };

    if content.trim().is_empty() {
        return BTreeMap::new();
    }

    match serde_json::from_str::<BTreeMap<String, StoredId>>(&content) {
        Ok(raw) => {
            let channels: BTreeMap<String, String> =
                raw.into_iter().map(|(k, v)| (k, v.into())).collect();
            tracing::info!(entries = channels.len(), "Loaded request channels");
            channels
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                "Request channel store is invalid, starting empty"
            );
            BTreeMap::new()
        }
    }
}

fn write_store(path: &Path, channels: &BTreeMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content =
        serde_json::to_string_pretty(channels).context("Failed to serialize request channels")?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
