//! Discovery host resolution with a process-wide TTL cache
//!
//! The Audius directory returns the list of healthy discovery nodes. One of
//! them is picked at random and reused until the TTL expires.

use crate::error::{Error, Result};
use crate::models::Envelope;
use rand::seq::IndexedRandom;
use reqwest::Client;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use url::Url;

/// Default Audius directory endpoint
pub const DEFAULT_DIRECTORY_URL: &str = "https://api.audius.co";

/// Host used when the directory answers with no usable entry
pub const FALLBACK_HOST: &str = "https://discoveryprovider.audius.co";

/// How long a resolved host stays authoritative
pub const HOST_TTL: Duration = Duration::from_secs(300);

/// Deadline of the directory lookup
pub const DIRECTORY_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves and caches the current discovery host
///
/// The cache is a single slot holding `(host, fetched_at)`. Concurrent
/// callers hitting an expired slot may each refresh it; the last write wins
/// and every written value is a valid host.
#[derive(Debug)]
pub struct HostResolver {
    client: Client,
    directory_url: String,
    ttl: Duration,
    timeout: Duration,
    slot: RwLock<Option<(String, Instant)>>,
}

impl HostResolver {
    pub fn new(client: Client, directory_url: impl Into<String>) -> Self {
        Self {
            client,
            directory_url: directory_url.into(),
            ttl: HOST_TTL,
            timeout: DIRECTORY_TIMEOUT,
            slot: RwLock::new(None),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn directory_url(&self) -> &str {
        &self.directory_url
    }

    /// Return the cached host, refreshing it from the directory when expired
    ///
    /// Fails with [`Error::UpstreamUnavailable`] when the directory cannot be
    /// reached; an expired host is never served as a fallback.
    pub async fn resolve(&self) -> Result<String> {
        if let Some(host) = self.cached() {
            return Ok(host);
        }

        let host = self.fetch_host().await?;
        self.store(host.clone());
        Ok(host)
    }

    /// Drop the cached host so the next [`resolve`](Self::resolve) refreshes it
    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = None;
        }
    }

    fn cached(&self) -> Option<String> {
        let slot = self.slot.read().ok()?;
        match slot.as_ref() {
            Some((host, fetched_at)) if fetched_at.elapsed() < self.ttl => Some(host.clone()),
            _ => None,
        }
    }

    fn store(&self, host: String) {
        match self.slot.write() {
            Ok(mut slot) => *slot = Some((host, Instant::now())),
            Err(poisoned) => *poisoned.into_inner() = Some((host, Instant::now())),
        }
    }

    async fn fetch_host(&self) -> Result<String> {
        tracing::debug!("Fetching discovery hosts from {}", self.directory_url);

        let hosts = self
            .fetch_directory()
            .await
            .map_err(|e| Error::unavailable(format!("failed to fetch discovery hosts: {}", e)))?;

        let usable: Vec<String> = hosts.iter().filter_map(|raw| usable_host(raw)).collect();
        if usable.len() < hosts.len() {
            tracing::warn!(
                "Ignoring {} unusable discovery host(s)",
                hosts.len() - usable.len()
            );
        }

        let host = match usable.choose(&mut rand::rng()) {
            Some(host) => host.clone(),
            None => {
                tracing::warn!(
                    "Directory returned no discovery host, using {}",
                    FALLBACK_HOST
                );
                FALLBACK_HOST.to_string()
            }
        };

        tracing::info!("Using Audius discovery host {}", host);
        Ok(host)
    }

    async fn fetch_directory(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.directory_url)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::unavailable(format!(
                "directory returned status {}",
                response.status()
            )));
        }

        let envelope: Envelope<Vec<String>> = response
            .json()
            .await
            .map_err(|e| Error::unavailable(format!("malformed directory payload: {}", e)))?;

        Ok(envelope.data.unwrap_or_default())
    }
}

/// Normalize a directory entry, rejecting anything that is not an absolute http(s) URL
fn usable_host(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).ok()?;
    let http = matches!(url.scheme(), "http" | "https");
    (http && url.host_str().is_some_and(|h| !h.is_empty())).then(|| trimmed.to_string())
}
