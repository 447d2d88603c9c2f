//! Caption proxy HTTP service
//!
//! Server-side counterpart to the client fetch path: resolves captions
//! through the innertube API so browser hosts avoid CORS restrictions.
//! Successful responses are cacheable; CORS origins are reflected only for
//! allow-listed prefixes.

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::captions::{parse_timed_text, select_track, CaptionTrack, SubtitleUnit};
use crate::config::Config;
use crate::subtitles::{CaptionSource, InnertubeSource};
use crate::video_id::is_valid_video_id;

/// Shared proxy state
pub struct ProxyState {
    source: Box<dyn CaptionSource>,
    preferred_languages: Vec<String>,
    allowed_origins: Vec<String>,
    cache_max_age_secs: u64,
}

impl ProxyState {
    pub fn new(config: &Config) -> Self {
        Self {
            source: Box::new(InnertubeSource::new(&config.subtitles)),
            preferred_languages: config.subtitles.preferred_languages.clone(),
            allowed_origins: config.proxy.allowed_origins.clone(),
            cache_max_age_secs: config.proxy.cache_max_age_secs,
        }
    }

    #[cfg(test)]
    fn with_source(config: &Config, source: Box<dyn CaptionSource>) -> Self {
        Self {
            source,
            preferred_languages: config.subtitles.preferred_languages.clone(),
            allowed_origins: config.proxy.allowed_origins.clone(),
            cache_max_age_secs: config.proxy.cache_max_age_secs,
        }
    }
}

/// Successful caption payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CaptionResponse {
    language: String,
    track_name: String,
    count: usize,
    subtitles: Vec<SubtitleUnit>,
    available_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
struct CaptionQuery {
    v: Option<String>,
}

/// Build the proxy router
pub fn router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route("/", get(captions_handler).options(preflight_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve the caption proxy
pub async fn serve(config: Arc<Config>) -> Result<()> {
    let state = Arc::new(ProxyState::new(&config));
    let app = router(state);

    let listener =
        tokio::net::TcpListener::bind(("0.0.0.0", config.proxy.port)).await?;
    info!(
        "🌐 Caption proxy listening on http://0.0.0.0:{}",
        config.proxy.port
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// Reflect the request Origin only when it starts with an allow-listed
/// prefix; anything else gets the first allowed origin.
fn resolve_origin<'a>(origin: Option<&'a str>, allowed: &'a [String]) -> &'a str {
    match origin {
        Some(o) if allowed.iter().any(|prefix| o.starts_with(prefix.as_str())) => o,
        _ => allowed.first().map(String::as_str).unwrap_or("*"),
    }
}

fn cors_headers(state: &ProxyState, request_headers: &HeaderMap) -> HeaderMap {
    let origin = request_headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    let allow_origin = resolve_origin(origin, &state.allowed_origins);

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(allow_origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    headers
}

fn error_body(message: &str) -> serde_json::Value {
    serde_json::json!({ "error": message, "subtitles": [] })
}

/// CORS preflight: 204, headers only
async fn preflight_handler(
    State(state): State<Arc<ProxyState>>,
    request_headers: HeaderMap,
) -> Response {
    let headers = cors_headers(&state, &request_headers);
    (StatusCode::NO_CONTENT, headers).into_response()
}

async fn captions_handler(
    State(state): State<Arc<ProxyState>>,
    request_headers: HeaderMap,
    Query(query): Query<CaptionQuery>,
) -> Response {
    let headers = cors_headers(&state, &request_headers);

    let video_id = match query.v {
        Some(v) if is_valid_video_id(&v) => v,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                headers,
                Json(error_body("Invalid video ID")),
            )
                .into_response();
        }
    };

    match resolve_captions(&state, &video_id).await {
        Ok(Some(payload)) => {
            let mut headers = headers;
            if let Ok(value) = HeaderValue::from_str(&format!(
                "public, max-age={}",
                state.cache_max_age_secs
            )) {
                headers.insert(header::CACHE_CONTROL, value);
            }
            (StatusCode::OK, headers, Json(payload)).into_response()
        }
        // No tracks offered: an empty-but-successful response, not a failure
        Ok(None) => (
            StatusCode::OK,
            headers,
            Json(error_body("No captions available")),
        )
            .into_response(),
        Err(e) => {
            warn!("Caption resolution failed for {}: {}", video_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                headers,
                Json(error_body(&e.to_string())),
            )
                .into_response()
        }
    }
}

/// Full upstream pipeline: track metadata, selection, document, parsing
async fn resolve_captions(
    state: &ProxyState,
    video_id: &str,
) -> Result<Option<CaptionResponse>> {
    let tracks = state.source.list_tracks(video_id).await?;
    let Some(track) = select_track(&tracks, &state.preferred_languages) else {
        return Ok(None);
    };

    let document = state.source.fetch_document(track).await?;
    let subtitles = parse_timed_text(&document);
    info!(
        "📝 Proxy resolved {} units ({}) for {}",
        subtitles.len(),
        track.language_code,
        video_id
    );

    Ok(Some(CaptionResponse {
        language: track.language_code.clone(),
        track_name: track.display_name.clone(),
        count: subtitles.len(),
        subtitles,
        available_tracks: tracks,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::TrackKind;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::util::ServiceExt;

    enum FakeUpstream {
        NoTracks,
        Document(&'static str),
        Failing,
    }

    #[async_trait]
    impl CaptionSource for FakeUpstream {
        fn name(&self) -> &str {
            "fake-upstream"
        }

        async fn list_tracks(&self, _video_id: &str) -> Result<Vec<CaptionTrack>> {
            match self {
                FakeUpstream::NoTracks => Ok(Vec::new()),
                FakeUpstream::Document(_) => Ok(vec![
                    CaptionTrack {
                        language_code: "ja".to_string(),
                        display_name: "Japanese".to_string(),
                        kind: TrackKind::Manual,
                        source_url: "https://example.com/ja".to_string(),
                    },
                    CaptionTrack {
                        language_code: "en".to_string(),
                        display_name: "English".to_string(),
                        kind: TrackKind::Auto,
                        source_url: "https://example.com/en".to_string(),
                    },
                ]),
                FakeUpstream::Failing => Err(anyhow!("upstream exploded")),
            }
        }

        async fn fetch_document(&self, _track: &CaptionTrack) -> Result<String> {
            match self {
                FakeUpstream::Document(doc) => Ok(doc.to_string()),
                _ => Err(anyhow!("no document")),
            }
        }
    }

    fn test_router(upstream: FakeUpstream) -> Router {
        let state = Arc::new(ProxyState::with_source(
            &Config::default(),
            Box::new(upstream),
        ));
        router(state)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_origin_reflection() {
        let allowed = vec![
            "https://langclip-app.github.io".to_string(),
            "http://localhost".to_string(),
        ];

        // Allow-listed prefix: reflected as-is
        assert_eq!(
            resolve_origin(Some("http://localhost:3000"), &allowed),
            "http://localhost:3000"
        );
        // Unknown origin: first allowed origin instead
        assert_eq!(
            resolve_origin(Some("https://evil.example"), &allowed),
            "https://langclip-app.github.io"
        );
        // No origin header at all
        assert_eq!(resolve_origin(None, &allowed), "https://langclip-app.github.io");
    }

    #[tokio::test]
    async fn test_invalid_id_is_400() {
        let app = test_router(FakeUpstream::NoTracks);
        let response = app
            .oneshot(Request::get("/?v=tooshort").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid video ID");
        assert_eq!(json["subtitles"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_missing_captions_is_200() {
        let app = test_router(FakeUpstream::NoTracks);
        let response = app
            .oneshot(Request::get("/?v=dQw4w9WgXcQ").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No captions available");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500() {
        let app = test_router(FakeUpstream::Failing);
        let response = app
            .oneshot(Request::get("/?v=dQw4w9WgXcQ").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["subtitles"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_success_payload_and_caching() {
        let doc = r#"<text start="0.0" dur="1.0">Hello</text>
<text start="1.0" dur="2.0">world.</text>"#;
        let app = test_router(FakeUpstream::Document(doc));
        let response = app
            .oneshot(
                Request::get("/?v=dQw4w9WgXcQ")
                    .header(header::ORIGIN, "http://localhost:8080")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=3600"
        );
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:8080"
        );

        let json = body_json(response).await;
        assert_eq!(json["language"], "ja");
        assert_eq!(json["trackName"], "Japanese");
        assert_eq!(json["count"], 1);
        assert_eq!(json["subtitles"][0]["text"], "Hello world.");
        assert_eq!(json["subtitles"][0]["duration"], 3.0);
        assert_eq!(json["availableTracks"].as_array().unwrap().len(), 2);
        assert_eq!(json["availableTracks"][1]["kind"], "auto");
    }

    #[tokio::test]
    async fn test_preflight_204_no_body() {
        let app = test_router(FakeUpstream::NoTracks);
        let response = app
            .oneshot(
                Request::options("/")
                    .header(header::ORIGIN, "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        // Disallowed origin falls back to the default allowed origin
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "https://langclip-app.github.io"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }
}
