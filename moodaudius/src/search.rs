//! Mood playlist aggregation
//!
//! A playlist blends two upstream queries issued concurrently: a search
//! sorted by recency (or the requested sort method) and the trending chart
//! of the mood's genre. Results are de-duplicated by track id.

use crate::client::AudiusClient;
use crate::error::Result;
use crate::models::Track;
use crate::moods::mood_query;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Ordered, id-unique track list capped at the requested limit
pub type AggregatedResult = Vec<Track>;

/// Trending chart window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeWindow {
    #[default]
    Week,
    Month,
    Year,
    AllTime,
}

impl TimeWindow {
    /// Value of the trending endpoint's `time` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::AllTime => "allTime",
        }
    }
}

impl From<&str> for TimeWindow {
    /// Unknown values fall back to [`TimeWindow::Week`]
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "month" => Self::Month,
            "year" => Self::Year,
            "alltime" | "all_time" | "all" => Self::AllTime,
            _ => Self::Week,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort order of the search leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMethod {
    #[default]
    Recent,
    Popular,
    Relevant,
}

impl SortMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Popular => "popular",
            Self::Relevant => "relevant",
        }
    }
}

impl From<&str> for SortMethod {
    /// Anything outside `recent | popular | relevant` is coerced to `recent`
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "popular" => Self::Popular,
            "relevant" => Self::Relevant,
            _ => Self::Recent,
        }
    }
}

impl fmt::Display for SortMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remove every repeated id, keeping the first occurrence in place
pub fn dedupe(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::with_capacity(tracks.len());
    tracks
        .into_iter()
        .filter(|track| seen.insert(track.id.clone()))
        .collect()
}

/// Builds mood playlists from the Audius network
#[derive(Debug, Clone)]
pub struct SearchAggregator {
    client: AudiusClient,
}

impl SearchAggregator {
    pub fn new(client: AudiusClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AudiusClient {
        &self.client
    }

    /// Playlist for `feeling`, recent search blended with the trending chart
    ///
    /// With `recent_first` the search results lead and trending tracks fill
    /// the remainder; otherwise trending leads. Any upstream failure aborts
    /// the whole aggregation with [`crate::Error::UpstreamUnavailable`].
    pub async fn search(
        &self,
        feeling: &str,
        limit: usize,
        window: TimeWindow,
        recent_first: bool,
    ) -> Result<AggregatedResult> {
        self.search_sorted(feeling, limit, window, recent_first, SortMethod::Recent)
            .await
    }

    /// Same as [`search`](Self::search) with an explicit sort for the search leg
    pub async fn search_sorted(
        &self,
        feeling: &str,
        limit: usize,
        window: TimeWindow,
        recent_first: bool,
        sort: SortMethod,
    ) -> Result<AggregatedResult> {
        self.aggregate(feeling, limit, window, recent_first, sort)
            .await
            .map_err(|e| {
                let e = e.into_unavailable();
                tracing::warn!("Playlist for '{}' failed: {}", feeling, e);
                e
            })
    }

    async fn aggregate(
        &self,
        feeling: &str,
        limit: usize,
        window: TimeWindow,
        recent_first: bool,
        sort: SortMethod,
    ) -> Result<AggregatedResult> {
        let mood = mood_query(feeling);
        // one host for both legs so every stream_url points at the same node
        let host = self.client.host().await?;

        tracing::debug!(
            "Aggregating '{}' (query='{}', genre='{}', window={}, sort={}, limit={})",
            feeling,
            mood.query,
            mood.genre,
            window,
            sort,
            limit
        );

        let (searched, mut trending) = tokio::try_join!(
            self.client.search_tracks(&host, &mood, sort, limit),
            self.client.trending_tracks(&host, mood.genre, window),
        )?;
        trending.truncate(limit);

        let (primary, secondary) = if recent_first {
            (searched, trending)
        } else {
            (trending, searched)
        };

        let mut merged = dedupe(primary.into_iter().chain(secondary).collect());
        merged.truncate(limit);

        tracing::info!("Playlist for '{}': {} tracks", feeling, merged.len());
        Ok(merged)
    }
}
