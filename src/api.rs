// 🌐 HTTP API - geolocation endpoints behind the web front-end

use crate::bssid::Bssid;
use crate::client::{LocationClient, ResolveOptions};
use crate::record::AccessPointRecord;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

const INVALID_BSSID_MESSAGE: &str = "Invalid BSSID. Expected format: HH:HH:HH:HH:HH:HH";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub client: LocationClient,
}

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BssidRequest {
    #[serde(default)]
    pub bssid: Option<String>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    success: bool,
    message: String,

    #[serde(rename = "requestedBSSID", skip_serializing_if = "Option::is_none")]
    requested_bssid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    apple_returned: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    invalid_networks: Option<usize>,
}

impl ErrorResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            requested_bssid: None,
            apple_returned: None,
            invalid_networks: None,
        }
    }

    fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeolocateResponse {
    success: bool,
    #[serde(rename = "requestedBSSID")]
    requested_bssid: String,
    networks_collected: usize,
    location: AccessPointRecord,
    all_networks: Vec<AccessPointRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscoverResponse {
    success: bool,
    method: &'static str,
    #[serde(rename = "requestedBSSID")]
    requested_bssid: String,
    main_network: AccessPointRecord,
    networks_found: usize,
    total_networks_returned: usize,
    networks: Vec<AccessPointRecord>,
    statistics: DiscoverStatistics,
    message: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct DiscoverStatistics {
    network_density: usize,
    triangulation_quality: &'static str,

    /// Mean of the known horizontal accuracies
    average_accuracy: Option<f64>,
}

// ============================================================================
// Helpers
// ============================================================================

fn triangulation_quality(valid_networks: usize) -> &'static str {
    if valid_networks > 50 {
        "excellent"
    } else if valid_networks > 20 {
        "good"
    } else {
        "weak"
    }
}

fn statistics(networks: &[AccessPointRecord]) -> DiscoverStatistics {
    let known: Vec<f64> = networks
        .iter()
        .filter(|n| n.horizontal_accuracy_meters >= 0)
        .map(|n| n.horizontal_accuracy_meters as f64)
        .collect();

    DiscoverStatistics {
        network_density: networks.len(),
        triangulation_quality: triangulation_quality(networks.len()),
        average_accuracy: if known.is_empty() {
            None
        } else {
            Some(known.iter().sum::<f64>() / known.len() as f64)
        },
    }
}

/// The queried AP if the vendor returned it, otherwise the first one
fn pick_requested(networks: &[AccessPointRecord], bssid: &Bssid, raw: &str) -> Option<AccessPointRecord> {
    let canonical = bssid.to_string();
    let raw = raw.trim().to_lowercase();

    networks
        .iter()
        .find(|n| n.normalized_identifier == canonical || n.raw_identifier.to_lowercase() == raw)
        .or_else(|| networks.first())
        .cloned()
}

fn parse_request(request: &BssidRequest) -> Result<(Bssid, String), Response> {
    let raw = request.bssid.clone().unwrap_or_default();
    match Bssid::parse(&raw) {
        Ok(bssid) => Ok((bssid, raw)),
        Err(_) => Err(ErrorResponse::new(INVALID_BSSID_MESSAGE).with_status(StatusCode::BAD_REQUEST)),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/geolocate - Resolve one BSSID and its neighbours
async fn geolocate(State(state): State<AppState>, Json(request): Json<BssidRequest>) -> Response {
    let (bssid, raw) = match parse_request(&request) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    let results = state.client.resolve(&bssid, ResolveOptions::default()).await;
    if results.is_empty() {
        return ErrorResponse::new("No location found for this BSSID.").with_status(StatusCode::NOT_FOUND);
    }

    let returned = results.len();
    let valid: Vec<AccessPointRecord> = results.into_iter().filter(|r| r.is_valid()).collect();

    let Some(location) = pick_requested(&valid, &bssid, &raw) else {
        warn!(bssid = %bssid, returned, "vendor returned only unknown locations");
        return ErrorResponse {
            apple_returned: Some(returned),
            invalid_networks: Some(returned),
            ..ErrorResponse::new("BSSID not found in the vendor database or location unavailable.")
        }
        .with_status(StatusCode::NOT_FOUND);
    };

    info!(bssid = %bssid, networks = valid.len(), "geolocated");
    Json(GeolocateResponse {
        success: true,
        requested_bssid: raw,
        networks_collected: valid.len(),
        location,
        all_networks: valid,
    })
    .into_response()
}

/// POST /api/discover-real-bssid - Neighbourhood around one BSSID
async fn discover_real_bssid(State(state): State<AppState>, Json(request): Json<BssidRequest>) -> Response {
    let (bssid, raw) = match parse_request(&request) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    let results = state.client.resolve(&bssid, ResolveOptions::default()).await;
    let total = results.len();
    let networks: Vec<AccessPointRecord> = results
        .into_iter()
        .filter(|r| r.has_usable_coordinates())
        .collect();

    let Some(main_network) = pick_requested(&networks, &bssid, &raw) else {
        return ErrorResponse {
            requested_bssid: Some(raw),
            apple_returned: (total > 0).then_some(total),
            ..ErrorResponse::new("No network found for this BSSID.")
        }
        .with_status(StatusCode::NOT_FOUND);
    };

    info!(bssid = %bssid, valid = networks.len(), total, "discovery complete");
    Json(DiscoverResponse {
        success: true,
        method: "real_bssid_triangulation",
        requested_bssid: raw,
        main_network,
        networks_found: networks.len(),
        total_networks_returned: total,
        statistics: statistics(&networks),
        message: format!("Triangulation succeeded: {} networks discovered", networks.len()),
        networks,
    })
    .into_response()
}

// ============================================================================
// Router
// ============================================================================

/// API routes under `/api`, plus the built front-end when `web_dir` exists
pub fn router(state: AppState, web_dir: Option<&Path>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/geolocate", post(geolocate))
        .route("/discover-real-bssid", post(discover_real_bssid))
        .with_state(state);

    let mut app = Router::new().nest("/api", api_routes);

    if let Some(dir) = web_dir.filter(|d| d.is_dir()) {
        let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(spa);
    }

    app.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{entry, fixture_client, fixture_response, FixtureTransport};
    use crate::proto::tests::frame_response;
    use crate::proto::WifiScanMessage;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app(transport: FixtureTransport) -> Router {
        router(AppState { client: fixture_client(transport) }, None)
    }

    async fn call(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(app(FixtureTransport::ok(fixture_response())), "GET", "/api/health", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "success": true, "data": "OK" }));
    }

    #[tokio::test]
    async fn test_geolocate_invalid_bssid() {
        let (status, body) = call(
            app(FixtureTransport::ok(fixture_response())),
            "POST",
            "/api/geolocate",
            r#"{"bssid":"not-a-mac"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = call(app(FixtureTransport::ok(fixture_response())), "POST", "/api/geolocate", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_geolocate_found() {
        let (status, body) = call(
            app(FixtureTransport::ok(fixture_response())),
            "POST",
            "/api/geolocate",
            r#"{"bssid":"0A:BB:0C:DD:0E:FF"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requestedBSSID"], "0A:BB:0C:DD:0E:FF");
        // sentinel entry excluded
        assert_eq!(body["networksCollected"], 2);
        assert_eq!(body["location"]["paddedBSSID"], "0a:bb:0c:dd:0e:ff");
        assert_eq!(body["allNetworks"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_geolocate_falls_back_to_first_network() {
        let (status, body) = call(
            app(FixtureTransport::ok(fixture_response())),
            "POST",
            "/api/geolocate",
            r#"{"bssid":"de:ad:be:ef:00:01"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"]["paddedBSSID"], "aa:bb:cc:dd:ee:ff");
    }

    #[tokio::test]
    async fn test_geolocate_not_found() {
        let empty = frame_response(&WifiScanMessage::default());
        let (status, body) = call(app(FixtureTransport::ok(empty)), "POST", "/api/geolocate", r#"{"bssid":"aa:bb:cc:dd:ee:ff"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.get("appleReturned").is_none());

        let sentinel_only = frame_response(&WifiScanMessage {
            wifi: vec![entry("aa:bb:cc:dd:ee:ff", -18_000_000_000, -18_000_000_000, 10, 6)],
            ..Default::default()
        });
        let (status, body) = call(
            app(FixtureTransport::ok(sentinel_only)),
            "POST",
            "/api/geolocate",
            r#"{"bssid":"aa:bb:cc:dd:ee:ff"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["appleReturned"], 1);
        assert_eq!(body["invalidNetworks"], 1);
    }

    #[tokio::test]
    async fn test_vendor_failure_is_not_found() {
        let (status, _) = call(
            app(FixtureTransport::http_error(503)),
            "POST",
            "/api/geolocate",
            r#"{"bssid":"aa:bb:cc:dd:ee:ff"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_discover() {
        let (status, body) = call(
            app(FixtureTransport::ok(fixture_response())),
            "POST",
            "/api/discover-real-bssid",
            r#"{"bssid":"aa-bb-cc-dd-ee-ff"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mainNetwork"]["paddedBSSID"], "aa:bb:cc:dd:ee:ff");
        assert_eq!(body["networksFound"], 2);
        assert_eq!(body["totalNetworksReturned"], 3);
        assert_eq!(body["statistics"]["networkDensity"], 2);
        assert_eq!(body["statistics"]["triangulationQuality"], "weak");
        assert_eq!(body["statistics"]["averageAccuracy"], 32.5);
    }

    #[test]
    fn test_triangulation_quality_thresholds() {
        assert_eq!(triangulation_quality(51), "excellent");
        assert_eq!(triangulation_quality(50), "good");
        assert_eq!(triangulation_quality(21), "good");
        assert_eq!(triangulation_quality(20), "weak");
        assert_eq!(triangulation_quality(0), "weak");
    }

    #[tokio::test]
    async fn test_spa_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>app</html>").unwrap();

        let app = router(
            AppState { client: fixture_client(FixtureTransport::ok(fixture_response())) },
            Some(dir.path()),
        );
        let response = app
            .oneshot(Request::builder().uri("/some/client/route").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<html>app</html>");
    }
}
