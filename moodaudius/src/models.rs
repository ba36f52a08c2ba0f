//! Data models for Audius API responses and the normalized track shape
//!
//! Raw records mirror what the discovery nodes return; [`Track`] is what
//! MoodTune hands to its own clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source tag carried by every normalized track
pub const TRACK_SOURCE: &str = "audius";

/// Artwork resolution picked from the artwork sub-record
pub const ARTWORK_SIZE: &str = "480x480";

/// Generic `{ "data": ... }` envelope used by every Audius endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub data: Option<T>,
}

/// User sub-record of a raw track
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    pub name: Option<String>,
    pub handle: Option<String>,
}

/// Track record as returned by `/v1/tracks/search` and `/v1/tracks/trending`
#[derive(Debug, Clone, Deserialize)]
pub struct RawTrack {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub user: Option<RawUser>,
    /// Keyed by resolution (`150x150`, `480x480`, `1000x1000`)
    #[serde(default)]
    pub artwork: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl RawTrack {
    /// Decode the `data` array of a search or trending page
    ///
    /// Entries that are not track objects (no `id`, wrong types) are skipped
    /// so a single bad record does not void the page.
    pub fn from_page(data: Vec<Value>) -> Vec<RawTrack> {
        data.into_iter()
            .filter_map(|value| match serde_json::from_value::<RawTrack>(value) {
                Ok(track) => Some(track),
                Err(e) => {
                    tracing::warn!("Skipping malformed track record: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Normalized playable track
///
/// `stream_url` is derived from the id, the discovery host and the app name
/// when the track is normalized; it cannot be set independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub artwork: Option<String>,
    pub permalink: Option<String>,
    /// Duration in seconds
    pub duration: Option<u64>,
    pub source: &'static str,
    stream_url: String,
}

impl Track {
    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }
}

/// Build the public stream URL of a track on a discovery host
pub fn stream_url(host: &str, id: &str, app_name: &str) -> String {
    format!(
        "{}/v1/tracks/{}/stream?app_name={}",
        host.trim_end_matches('/'),
        id,
        app_name
    )
}

/// Map a raw upstream record to a [`Track`]
///
/// Pure and total: absent optional fields (user, artwork, permalink, ...)
/// become `None`.
pub fn normalize(raw: &RawTrack, host: &str, app_name: &str) -> Track {
    let artist = raw.user.as_ref().and_then(|user| {
        user.name
            .clone()
            .filter(|name| !name.is_empty())
            .or_else(|| user.handle.clone())
    });

    let artwork = raw
        .artwork
        .as_ref()
        .and_then(|art| art.get(ARTWORK_SIZE))
        .and_then(Value::as_str)
        .map(str::to_string);

    Track {
        id: raw.id.clone(),
        title: raw.title.clone(),
        artist,
        artwork,
        permalink: raw.permalink.clone(),
        duration: raw
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round() as u64),
        source: TRACK_SOURCE,
        stream_url: stream_url(host, &raw.id, app_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawTrack {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_full_record() {
        let track = normalize(
            &raw(json!({
                "id": "D7KyD",
                "title": "Sunrise",
                "user": {"name": "Ava", "handle": "ava"},
                "artwork": {"150x150": "https://img/150", "480x480": "https://img/480"},
                "permalink": "/ava/sunrise",
                "duration": 214.6
            })),
            "https://dn1.example.org/",
            "Moodtune",
        );

        assert_eq!(track.id, "D7KyD");
        assert_eq!(track.title.as_deref(), Some("Sunrise"));
        assert_eq!(track.artist.as_deref(), Some("Ava"));
        assert_eq!(track.artwork.as_deref(), Some("https://img/480"));
        assert_eq!(track.permalink.as_deref(), Some("/ava/sunrise"));
        assert_eq!(track.duration, Some(215));
        assert_eq!(track.source, "audius");
        assert_eq!(
            track.stream_url(),
            "https://dn1.example.org/v1/tracks/D7KyD/stream?app_name=Moodtune"
        );
    }

    #[test]
    fn test_normalize_only_id() {
        let track = normalize(&raw(json!({"id": "x1"})), "https://h", "App");

        assert_eq!(track.id, "x1");
        assert!(track.title.is_none());
        assert!(track.artist.is_none());
        assert!(track.artwork.is_none());
        assert!(track.permalink.is_none());
        assert!(track.duration.is_none());
        assert_eq!(track.stream_url(), "https://h/v1/tracks/x1/stream?app_name=App");
    }

    #[test]
    fn test_normalize_tolerates_null_sub_records() {
        let track = normalize(
            &raw(json!({"id": "x2", "user": null, "artwork": null, "permalink": null})),
            "https://h",
            "App",
        );
        assert!(track.artist.is_none());
        assert!(track.artwork.is_none());
    }

    #[test]
    fn test_artist_falls_back_to_handle() {
        let track = normalize(
            &raw(json!({"id": "x3", "user": {"handle": "dj_null"}})),
            "https://h",
            "App",
        );
        assert_eq!(track.artist.as_deref(), Some("dj_null"));
    }

    #[test]
    fn test_artwork_without_expected_size() {
        let track = normalize(
            &raw(json!({"id": "x4", "artwork": {"150x150": "https://img/150"}})),
            "https://h",
            "App",
        );
        assert!(track.artwork.is_none());
    }

    #[test]
    fn test_from_page_skips_records_without_id() {
        let page = vec![
            json!({"id": "a", "title": "A"}),
            json!({"title": "no id"}),
            json!("garbage"),
            json!({"id": "b"}),
        ];
        let ids: Vec<_> = RawTrack::from_page(page).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_serialized_shape() {
        let track = normalize(&raw(json!({"id": "z"})), "https://h", "App");
        let json = serde_json::to_value(&track).unwrap();

        assert_eq!(json["id"], "z");
        assert_eq!(json["source"], "audius");
        assert_eq!(json["stream_url"], "https://h/v1/tracks/z/stream?app_name=App");
        assert!(json["artist"].is_null());
    }

    #[test]
    fn test_envelope_missing_or_null_data() {
        let missing: Envelope<Vec<Value>> = serde_json::from_str("{}").unwrap();
        assert!(missing.data.is_none());

        let null: Envelope<String> = serde_json::from_str(r#"{"data": null}"#).unwrap();
        assert!(null.data.is_none());
    }
}
