//! Audius client library for MoodTune
//!
//! Turns a feeling into a playlist by querying the Audius decentralized
//! network, and relays track audio through the service.
//!
//! # Features
//!
//! - **Host resolution**: discovery nodes come from the Audius directory; one
//!   is picked at random and cached for five minutes
//! - **Mood playlists**: a recent search and the genre's trending chart are
//!   queried concurrently, merged and de-duplicated
//! - **Streaming proxy**: audio is relayed in 8 KiB chunks with bounded
//!   connect and read timeouts
//! - **Configuration extension** (feature `config`): app name and directory
//!   URL in `moodconfig`
//! - **Server extension** (feature `server`): REST routes on `moodserver`
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use moodaudius::{AudiusClient, SearchAggregator, StreamProxy, TimeWindow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AudiusClient::new()?;
//!
//!     let playlist = SearchAggregator::new(client.clone())
//!         .search("happy", 25, TimeWindow::Week, true)
//!         .await?;
//!     for track in &playlist {
//!         println!("{} - {:?}", track.id, track.title);
//!     }
//!
//!     if let Some(first) = playlist.first() {
//!         let mut audio = StreamProxy::new(client).stream(&first.id).await?;
//!         while let Some(chunk) = audio.next().await {
//!             println!("{} bytes", chunk?.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Every failure is one of [`Error::UpstreamUnavailable`], [`Error::Timeout`]
//! or [`Error::NotStreamable`]. Playlist searches only ever report
//! `UpstreamUnavailable`.

pub mod client;
pub mod error;
pub mod host;
pub mod models;
pub mod moods;
pub mod search;
pub mod stream;

#[cfg(feature = "config")]
pub mod config_ext;

#[cfg(feature = "server")]
pub mod api_rest;

#[cfg(feature = "server")]
pub mod server_ext;

// Re-exports
pub use client::{AudiusClient, ClientBuilder};
pub use error::{Error, Result};
pub use host::HostResolver;
pub use models::{normalize, RawTrack, Track};
pub use moods::{mood_query, MoodQuery};
pub use search::{dedupe, AggregatedResult, SearchAggregator, SortMethod, TimeWindow};
pub use stream::{StreamPhase, StreamProxy, TrackStream, CHUNK_SIZE};

#[cfg(feature = "config")]
pub use config_ext::AudiusConfigExt;

#[cfg(feature = "server")]
pub use api_rest::AudiusState;

#[cfg(feature = "server")]
pub use server_ext::AudiusServerExt;
