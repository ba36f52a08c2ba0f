//! HTTP client for the Audius discovery API

use crate::error::{Error, Result};
use crate::host::{HostResolver, DEFAULT_DIRECTORY_URL, DIRECTORY_TIMEOUT, HOST_TTL};
use crate::models::{normalize, Envelope, RawTrack, Track};
use crate::moods::MoodQuery;
use crate::search::{SortMethod, TimeWindow};
use reqwest::{header, Client, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default application identifier sent as `app_name`
pub const DEFAULT_APP_NAME: &str = "Moodtune";

/// Environment variable overriding the application identifier
pub const APP_NAME_ENV: &str = "AUDIUS_APP_NAME";

/// Default timeout for search, trending and stream-resolve calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 8;

/// Default time allowed for the media host to answer the stream GET
pub const DEFAULT_STREAM_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default time allowed between two body chunks of a stream
pub const DEFAULT_STREAM_READ_TIMEOUT_SECS: u64 = 10;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "moodaudius/0.1.0";

/// Audius discovery client
///
/// Cheap to clone: clones share the HTTP connection pool and the discovery
/// host cache.
///
/// # Example
///
/// ```no_run
/// use moodaudius::AudiusClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = AudiusClient::new()?;
///     println!("Discovery host: {}", client.host().await?);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AudiusClient {
    client: Client,
    resolver: Arc<HostResolver>,
    app_name: String,
    pub(crate) request_timeout: Duration,
    pub(crate) stream_connect_timeout: Duration,
    pub(crate) stream_read_timeout: Duration,
}

impl AudiusClient {
    /// Create a client with default settings
    ///
    /// The app name is read from `AUDIUS_APP_NAME` when set.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn resolver(&self) -> &HostResolver {
        &self.resolver
    }

    /// Current discovery host (see [`HostResolver::resolve`])
    pub async fn host(&self) -> Result<String> {
        self.resolver.resolve().await
    }

    /// Query `/v1/tracks/search` on `host`
    ///
    /// Sends `query`, `genre`, `sort_method`, `limit`, `app_name` and one
    /// `mood[]` pair per mood tag.
    pub async fn search_tracks(
        &self,
        host: &str,
        mood: &MoodQuery,
        sort: SortMethod,
        limit: usize,
    ) -> Result<Vec<Track>> {
        let mut url = endpoint(host, &["v1", "tracks", "search"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("query", mood.query)
                .append_pair("genre", mood.genre)
                .append_pair("sort_method", sort.as_str())
                .append_pair("limit", &limit.to_string())
                .append_pair("app_name", &self.app_name);
            for tag in mood.moods {
                pairs.append_pair("mood[]", tag);
            }
        }

        self.fetch_tracks(host, url).await
    }

    /// Query `/v1/tracks/trending` on `host`
    ///
    /// The endpoint ignores any limit; callers truncate.
    pub async fn trending_tracks(
        &self,
        host: &str,
        genre: &str,
        window: TimeWindow,
    ) -> Result<Vec<Track>> {
        let mut url = endpoint(host, &["v1", "tracks", "trending"])?;
        url.query_pairs_mut()
            .append_pair("time", window.as_str())
            .append_pair("genre", genre)
            .append_pair("app_name", &self.app_name);

        self.fetch_tracks(host, url).await
    }

    /// Ask the discovery node for the direct media URL of a track
    ///
    /// Returns `None` when the node answers without a URL.
    pub async fn resolve_stream_url(&self, track_id: &str) -> Result<Option<String>> {
        let host = self.host().await?;
        let mut url = endpoint(&host, &["v1", "tracks", track_id, "stream"])?;
        url.query_pairs_mut()
            .append_pair("no_redirect", "true")
            .append_pair("app_name", &self.app_name);

        tracing::debug!("Resolving stream URL: {}", url);

        let response = self.get_checked(url).await?;
        let envelope: Envelope<Value> = response
            .json()
            .await
            .map_err(|e| Error::unavailable(format!("malformed stream payload: {}", e)))?;

        Ok(envelope
            .data
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string))
    }

    /// Open the media GET against a resolved URL
    ///
    /// Only the wait for response headers is bounded here; the body is read
    /// lazily by the caller. `range` is forwarded as the `Range` header.
    pub async fn open_stream(&self, url: &str, range: Option<&str>) -> Result<Response> {
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }

        let response = tokio::time::timeout(self.stream_connect_timeout, request.send())
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "media host did not answer within {:?}",
                    self.stream_connect_timeout
                ))
            })??;

        if !response.status().is_success() {
            return Err(Error::unavailable(format!(
                "media host returned status {}",
                response.status()
            )));
        }

        Ok(response)
    }

    async fn fetch_tracks(&self, host: &str, url: Url) -> Result<Vec<Track>> {
        tracing::debug!("Fetching tracks: {}", url);

        let response = self.get_checked(url).await?;
        let envelope: Envelope<Vec<Value>> = response
            .json()
            .await
            .map_err(|e| Error::unavailable(format!("malformed track page: {}", e)))?;

        let tracks: Vec<Track> = RawTrack::from_page(envelope.data.unwrap_or_default())
            .iter()
            .map(|raw| normalize(raw, host, &self.app_name))
            .collect();

        tracing::debug!("Received {} tracks", tracks.len());
        Ok(tracks)
    }

    async fn get_checked(&self, url: Url) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::unavailable(format!(
                "API returned error status: {}",
                response.status()
            )));
        }

        Ok(response)
    }
}

/// Append path segments to a host URL, percent-encoding each one
fn endpoint(host: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(host)?;
    url.path_segments_mut()
        .map_err(|_| Error::unavailable(format!("invalid discovery host: {}", host)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Builder for [`AudiusClient`]
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    client: Option<Client>,
    directory_url: String,
    app_name: Option<String>,
    host_ttl: Duration,
    directory_timeout: Duration,
    request_timeout: Duration,
    stream_connect_timeout: Duration,
    stream_read_timeout: Duration,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            app_name: None,
            host_ttl: HOST_TTL,
            directory_timeout: DIRECTORY_TIMEOUT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            stream_connect_timeout: Duration::from_secs(DEFAULT_STREAM_CONNECT_TIMEOUT_SECS),
            stream_read_timeout: Duration::from_secs(DEFAULT_STREAM_READ_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    /// Use a custom reqwest client (user agent and connect timeout are then ignored)
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn directory_url(mut self, url: impl Into<String>) -> Self {
        self.directory_url = url.into();
        self
    }

    /// Set the application identifier, overriding `AUDIUS_APP_NAME`
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn host_ttl(mut self, ttl: Duration) -> Self {
        self.host_ttl = ttl;
        self
    }

    pub fn directory_timeout(mut self, timeout: Duration) -> Self {
        self.directory_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn stream_connect_timeout(mut self, timeout: Duration) -> Self {
        self.stream_connect_timeout = timeout;
        self
    }

    pub fn stream_read_timeout(mut self, timeout: Duration) -> Self {
        self.stream_read_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<AudiusClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .connect_timeout(self.stream_connect_timeout)
                .build()?,
        };

        let app_name = self
            .app_name
            .or_else(|| std::env::var(APP_NAME_ENV).ok())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

        let resolver = HostResolver::new(client.clone(), self.directory_url)
            .with_ttl(self.host_ttl)
            .with_timeout(self.directory_timeout);

        Ok(AudiusClient {
            client,
            resolver: Arc::new(resolver),
            app_name,
            request_timeout: self.request_timeout,
            stream_connect_timeout: self.stream_connect_timeout,
            stream_read_timeout: self.stream_read_timeout,
        })
    }
}
