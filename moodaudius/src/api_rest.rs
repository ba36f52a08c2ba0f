//! Endpoints API REST pour Audius
//!
//! - `POST /playlist` : playlist pour un ressenti
//! - `GET /audius/stream/{track_id}` : proxy du flux audio

use crate::error::Error;
use crate::models::Track;
use crate::search::{SearchAggregator, SortMethod, TimeWindow};
use crate::stream::{StreamProxy, DEFAULT_CONTENT_TYPE};
use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Ressenti utilisé quand la requête n'en fournit pas
pub const DEFAULT_FEELING: &str = "calm";

pub const DEFAULT_LIMIT: i64 = 25;
pub const MAX_LIMIT: i64 = 100;

/// État partagé des handlers Audius
#[derive(Debug, Clone)]
pub struct AudiusState {
    pub aggregator: SearchAggregator,
    pub proxy: StreamProxy,
}

// ============ Gestion des erreurs ============

struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);

        let body = match &self.0 {
            Error::UpstreamUnavailable(message) => serde_json::json!({
                "error": "audius_unavailable",
                "message": message,
            }),
            Error::Timeout(message) => serde_json::json!({
                "error": "audius_timeout",
                "message": message,
            }),
            Error::NotStreamable(_) => serde_json::json!({
                "error": "Track not streamable",
            }),
        };

        (status, Json(body)).into_response()
    }
}

// ============ Playlist ============

/// Corps de `POST /playlist`, tous les champs sont optionnels
#[derive(Debug, Default)]
pub struct PlaylistRequest {
    pub feeling: Option<String>,
    pub limit: Option<i64>,
    pub time_window: Option<String>,
    pub recent_first: Option<bool>,
    pub sort_method: Option<String>,
}

impl PlaylistRequest {
    /// Parse a request body field by field
    ///
    /// A body that is not a JSON object acts as `{}`. A field of the wrong
    /// type is ignored on its own; the other fields are kept.
    pub fn from_body(body: &[u8]) -> Self {
        let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            feeling: field(obj, &["feeling"]).and_then(lenient_string),
            limit: field(obj, &["limit"]).and_then(lenient_int),
            time_window: field(obj, &["time_window", "timeWindow"]).and_then(lenient_string),
            recent_first: field(obj, &["recent_first", "recentFirst"]).and_then(lenient_bool),
            sort_method: field(obj, &["sort_method", "sortMethod"]).and_then(lenient_string),
        }
    }

    pub fn feeling(&self) -> String {
        self.feeling
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_FEELING)
            .to_lowercase()
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as usize
    }

    pub fn time_window(&self) -> TimeWindow {
        self.time_window
            .as_deref()
            .map(TimeWindow::from)
            .unwrap_or_default()
    }

    pub fn recent_first(&self) -> bool {
        self.recent_first.unwrap_or(true)
    }

    pub fn sort_method(&self) -> SortMethod {
        self.sort_method
            .as_deref()
            .map(SortMethod::from)
            .unwrap_or_default()
    }
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| obj.get(*name))
        .filter(|value| !value.is_null())
}

fn lenient_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.round() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct PlaylistResponse {
    pub feeling: String,
    pub count: usize,
    pub tracks: Vec<Track>,
}

/// Crée le router pour l'API Audius
pub fn create_router(state: AudiusState) -> Router {
    Router::new()
        .route("/playlist", post(playlist))
        .route("/audius/stream/{track_id}", get(stream_track))
        .with_state(state)
}

/// POST /playlist
async fn playlist(
    State(state): State<AudiusState>,
    body: Bytes,
) -> Result<Json<PlaylistResponse>, AppError> {
    let request = PlaylistRequest::from_body(&body);
    let feeling = request.feeling();

    let tracks = state
        .aggregator
        .search_sorted(
            &feeling,
            request.limit(),
            request.time_window(),
            request.recent_first(),
            request.sort_method(),
        )
        .await?;

    Ok(Json(PlaylistResponse {
        feeling,
        count: tracks.len(),
        tracks,
    }))
}

/// GET /audius/stream/{track_id}
/// Relaie le flux audio du media host (pas de redirection)
async fn stream_track(
    State(state): State<AudiusState>,
    Path(track_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let stream = state.proxy.stream_range(&track_id, range).await?;

    let status = StatusCode::from_u16(stream.status).unwrap_or(StatusCode::OK);
    let content_type = HeaderValue::from_str(&stream.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let content_length = stream.content_length;
    let content_range = stream
        .content_range
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok());
    let accept_ranges = stream
        .accept_ranges
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok());

    let mut response = Body::from_stream(stream).into_response();
    *response.status_mut() = status;

    let out = response.headers_mut();
    out.insert(header::CONTENT_TYPE, content_type);
    out.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store"),
    );
    if let Some(length) = content_length {
        out.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    if let Some(value) = content_range {
        out.insert(header::CONTENT_RANGE, value);
    }
    if let Some(value) = accept_ranges {
        out.insert(header::ACCEPT_RANGES, value);
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AudiusClient;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn router_for(server: &MockServer) -> Router {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [server.uri()]})))
            .mount(server)
            .await;

        let client = AudiusClient::builder()
            .directory_url(server.uri())
            .app_name("TestApp")
            .stream_connect_timeout(Duration::from_millis(300))
            .build()
            .unwrap();

        create_router(AudiusState {
            aggregator: SearchAggregator::new(client.clone()),
            proxy: StreamProxy::new(client),
        })
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_playlist_request_defaults() {
        let request = PlaylistRequest::from_body(b"");
        assert_eq!(request.feeling(), "calm");
        assert_eq!(request.limit(), 25);
        assert_eq!(request.time_window(), TimeWindow::Week);
        assert!(request.recent_first());
        assert_eq!(request.sort_method(), SortMethod::Recent);
    }

    #[test]
    fn test_playlist_request_normalization() {
        let request = PlaylistRequest::from_body(
            br#"{"feeling":"  HAPPY ","limit":1000,"timeWindow":"month","recent_first":false,"sort_method":"shuffle"}"#,
        );
        assert_eq!(request.feeling(), "happy");
        assert_eq!(request.limit(), 100);
        assert_eq!(request.time_window(), TimeWindow::Month);
        assert!(!request.recent_first());
        assert_eq!(request.sort_method(), SortMethod::Recent);

        assert_eq!(PlaylistRequest::from_body(br#"{"limit":0}"#).limit(), 1);
        assert_eq!(PlaylistRequest::from_body(b"not json").feeling(), "calm");
        assert_eq!(PlaylistRequest::from_body(b"[1, 2]").feeling(), "calm");
    }

    #[test]
    fn test_playlist_request_fields_are_parsed_independently() {
        let request = PlaylistRequest::from_body(br#"{"feeling":"happy","limit":"10"}"#);
        assert_eq!(request.feeling(), "happy");
        assert_eq!(request.limit(), 10);

        let request = PlaylistRequest::from_body(
            br#"{"feeling":"sad","limit":25.0,"recent_first":"false","time_window":7}"#,
        );
        assert_eq!(request.feeling(), "sad");
        assert_eq!(request.limit(), 25);
        assert!(!request.recent_first());
        assert_eq!(request.time_window(), TimeWindow::Week);

        let request = PlaylistRequest::from_body(br#"{"feeling":"focus","limit":{"n":3}}"#);
        assert_eq!(request.feeling(), "focus");
        assert_eq!(request.limit(), 25);
    }

    #[tokio::test]
    async fn test_playlist_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tracks/search"))
            .and(query_param("query", "happy upbeat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "s1", "title": "One"}, {"id": "t1"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/tracks/trending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "t1"}, {"id": "t2"}]
            })))
            .mount(&server)
            .await;

        let response = router_for(&server)
            .await
            .oneshot(
                Request::post("/playlist")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"feeling":"Happy"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["feeling"], "happy");
        assert_eq!(json["count"], 3);
        assert_eq!(json["tracks"][0]["id"], "s1");
        assert_eq!(json["tracks"][2]["id"], "t2");
    }

    #[tokio::test]
    async fn test_playlist_route_maps_upstream_failure_to_502() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tracks/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/tracks/trending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let response = router_for(&server)
            .await
            .oneshot(Request::post("/playlist").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"], "audius_unavailable");
    }

    #[tokio::test]
    async fn test_stream_route_not_streamable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tracks/999999/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
            .mount(&server)
            .await;

        let response = router_for(&server)
            .await
            .oneshot(
                Request::get("/audius/stream/999999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Track not streamable");
    }

    #[tokio::test]
    async fn test_stream_route_relays_audio() {
        let server = MockServer::start().await;
        let media_url = format!("{}/media/abc.mp3", server.uri());
        Mock::given(method("GET"))
            .and(path("/v1/tracks/abc/stream"))
            .and(query_param("no_redirect", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": media_url})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/abc.mp3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/ogg")
                    .set_body_bytes(vec![7u8; 20_000]),
            )
            .mount(&server)
            .await;

        let response = router_for(&server)
            .await
            .oneshot(Request::get("/audius/stream/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/ogg");
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-store"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.len(), 20_000);
    }

    #[tokio::test]
    async fn test_stream_route_timeout_is_504() {
        let server = MockServer::start().await;
        let media_url = format!("{}/media/slow.mp3", server.uri());
        Mock::given(method("GET"))
            .and(path("/v1/tracks/slow/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": media_url})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/slow.mp3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 16])
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let response = router_for(&server)
            .await
            .oneshot(Request::get("/audius/stream/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_json(response).await["error"], "audius_timeout");
    }
}
