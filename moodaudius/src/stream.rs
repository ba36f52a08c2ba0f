//! Streaming proxy
//!
//! Audio is relayed through the service instead of redirecting the client:
//! the discovery node is asked for the direct media URL, the media host is
//! opened with a streaming GET and its body is re-emitted in chunks of at
//! most [`CHUNK_SIZE`] bytes as the consumer pulls them.

use crate::client::AudiusClient;
use crate::error::{Error, Result};
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use reqwest::{header, Response};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio_util::io::{ReaderStream, StreamReader};

/// Relay chunk size
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Content type used when the media host does not send one
pub const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

/// Progress of a single stream request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Asking the discovery node for the media URL
    Resolving,
    /// Waiting for the media host to answer
    Fetching,
    /// Body chunks are being relayed
    Relaying,
    Done,
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Fetching => "fetching",
            Self::Relaying => "relaying",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Audio byte stream of one track
///
/// Finite and not restartable. Dropping it closes the upstream connection.
/// After a read timeout it yields one `Err(Error::Timeout)` and ends.
pub struct TrackStream {
    /// Upstream status, 200 or 206
    pub status: u16,
    pub content_type: String,
    pub content_length: Option<u64>,
    pub content_range: Option<String>,
    pub accept_ranges: Option<String>,
    body: BoxStream<'static, Result<Bytes>>,
}

impl TrackStream {
    fn from_response(track_id: &str, response: Response, read_timeout: Duration) -> Self {
        let headers = response.headers();
        let header_str = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let status = response.status().as_u16();
        let content_type = header_str(header::CONTENT_TYPE)
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let content_length = header_str(header::CONTENT_LENGTH).and_then(|len| len.parse().ok());
        let content_range = header_str(header::CONTENT_RANGE);
        let accept_ranges = header_str(header::ACCEPT_RANGES);

        let upstream = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        let chunks = ReaderStream::with_capacity(StreamReader::new(upstream), CHUNK_SIZE);

        Self {
            status,
            content_type,
            content_length,
            content_range,
            accept_ranges,
            body: relay(track_id.to_string(), chunks, read_timeout),
        }
    }
}

impl fmt::Debug for TrackStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackStream")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("content_range", &self.content_range)
            .finish_non_exhaustive()
    }
}

impl Stream for TrackStream {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().body.poll_next_unpin(cx)
    }
}

/// Pull chunks one at a time, each bounded by `read_timeout`
fn relay<S>(track_id: String, chunks: S, read_timeout: Duration) -> BoxStream<'static, Result<Bytes>>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin + Send + 'static,
{
    stream::unfold(Some((chunks, 0u64)), move |state| {
        let track_id = track_id.clone();
        async move {
            let (mut chunks, relayed) = state?;
            match tokio::time::timeout(read_timeout, chunks.next()).await {
                Ok(Some(Ok(chunk))) => {
                    let relayed = relayed + chunk.len() as u64;
                    Some((Ok(chunk), Some((chunks, relayed))))
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!(
                        "Stream {} truncated after {} bytes: {}",
                        track_id,
                        relayed,
                        e
                    );
                    Some((Err(Error::from(e)), None))
                }
                Ok(None) => {
                    tracing::info!(
                        "Stream {} {} ({} bytes)",
                        track_id,
                        StreamPhase::Done,
                        relayed
                    );
                    None
                }
                Err(_) => {
                    tracing::warn!(
                        "Stream {} stalled for {:?} after {} bytes",
                        track_id,
                        read_timeout,
                        relayed
                    );
                    Some((
                        Err(Error::timeout(format!(
                            "no data from media host for {:?}",
                            read_timeout
                        ))),
                        None,
                    ))
                }
            }
        }
    })
    .boxed()
}

/// Proxies Audius track audio to local clients
#[derive(Debug, Clone)]
pub struct StreamProxy {
    client: AudiusClient,
}

impl StreamProxy {
    pub fn new(client: AudiusClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AudiusClient {
        &self.client
    }

    /// Open the audio stream of a track
    ///
    /// Fails with [`Error::NotStreamable`] when the discovery node has no
    /// media URL, [`Error::Timeout`] when resolving or opening exceeds its
    /// deadline, and [`Error::UpstreamUnavailable`] otherwise.
    pub async fn stream(&self, track_id: &str) -> Result<TrackStream> {
        self.stream_range(track_id, None).await
    }

    /// Same as [`stream`](Self::stream), forwarding a `Range` header
    pub async fn stream_range(&self, track_id: &str, range: Option<&str>) -> Result<TrackStream> {
        let mut phase = StreamPhase::Resolving;
        tracing::debug!("Stream {} {}", track_id, phase);

        let url = self
            .client
            .resolve_stream_url(track_id)
            .await
            .map_err(|e| failed(track_id, phase, e))?
            .ok_or_else(|| {
                tracing::warn!("Track {} has no stream URL", track_id);
                Error::NotStreamable(track_id.to_string())
            })?;

        phase = StreamPhase::Fetching;
        tracing::debug!("Stream {} {} {}", track_id, phase, url);

        let response = self
            .client
            .open_stream(&url, range)
            .await
            .map_err(|e| failed(track_id, phase, e))?;

        let stream = TrackStream::from_response(track_id, response, self.client.stream_read_timeout);
        tracing::info!(
            "Stream {} {} ({}, status {})",
            track_id,
            StreamPhase::Relaying,
            stream.content_type,
            stream.status
        );

        Ok(stream)
    }
}

fn failed(track_id: &str, phase: StreamPhase, err: Error) -> Error {
    tracing::warn!("Stream {} failed while {}: {}", track_id, phase, err);
    err
}
