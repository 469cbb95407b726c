// 🛰️ Protocol Client - resolve one BSSID through the vendor positioning service
//
// resolve() is total: transport errors, HTTP errors and decode errors all
// collapse to an empty list. The detail goes to the log, and callers that
// need it (batch counters) use resolve_detailed().

use crate::bssid::{pad_identifier, Bssid};
use crate::config::ClientConfig;
use crate::proto::{self, FrameError, WifiEntry};
use crate::record::{AccessPointRecord, SENTINEL_CHANNEL, SENTINEL_COORDINATE, UNKNOWN};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Raw coordinate integers are degrees * 10^8
const COORDINATE_SCALE: f64 = 100_000_000.0;

/// How much of an error body ends up in the log
const ERROR_BODY_SNIPPET: usize = 200;

// ============================================================================
// ERRORS
// ============================================================================

/// Why a resolution produced nothing. Never surfaced by `resolve`.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("request timeout")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("network error: {0}")]
    Transport(String),

    #[error("HTTP error {status}")]
    HttpStatus { status: u16, body_snippet: String },

    #[error("decode error: {0}")]
    Decode(#[from] FrameError),

    #[error("client setup error: {0}")]
    Setup(String),
}

impl ResolveError {
    /// Short label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::Timeout => "timeout",
            ResolveError::Connect(_) => "connect",
            ResolveError::Transport(_) => "transport",
            ResolveError::HttpStatus { .. } => "http_status",
            ResolveError::Decode(_) => "decode",
            ResolveError::Setup(_) => "setup",
        }
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ResolveError::Timeout
        } else if e.is_connect() {
            ResolveError::Connect(e.to_string())
        } else if e.is_builder() {
            ResolveError::Setup(e.to_string())
        } else {
            ResolveError::Transport(e.to_string())
        }
    }
}

// ============================================================================
// TRANSPORT
// ============================================================================

/// Moves one request body to the vendor and returns the raw response body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>, ResolveError>;
}

/// HTTPS transport mimicking the vendor's own daemon
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ResolveError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert("Accept-Charset", HeaderValue::from_static("utf-8"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-us"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>, ResolveError> {
        let response = self.client.post(&self.endpoint).body(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ResolveError::HttpStatus {
                status: status.as_u16(),
                body_snippet: text.chars().take(ERROR_BODY_SNIPPET).collect(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// Per-call options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Emit per-request diagnostics (sizes, status, entry counts, sentinels)
    pub debug: bool,
}

impl ResolveOptions {
    pub fn debug(debug: bool) -> Self {
        ResolveOptions { debug }
    }
}

/// Cheap to clone: the transport is shared, calls are independent.
#[derive(Clone)]
pub struct LocationClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl LocationClient {
    /// Client over HTTPS
    pub fn new(config: ClientConfig) -> Result<Self, ResolveError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        LocationClient { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve a BSSID to the vendor's records; empty on any failure
    pub async fn resolve(&self, bssid: &Bssid, options: ResolveOptions) -> Vec<AccessPointRecord> {
        match self.resolve_detailed(bssid, options).await {
            Ok(records) => records,
            Err(e) => {
                match &e {
                    ResolveError::HttpStatus { status, body_snippet } => warn!(
                        bssid = %bssid,
                        kind = e.kind(),
                        status,
                        body = %body_snippet,
                        "geolocation failed"
                    ),
                    _ => warn!(bssid = %bssid, kind = e.kind(), error = %e, "geolocation failed"),
                }
                Vec::new()
            }
        }
    }

    /// Like `resolve`, but tells the caller why nothing came back
    pub async fn resolve_detailed(
        &self,
        bssid: &Bssid,
        options: ResolveOptions,
    ) -> Result<Vec<AccessPointRecord>, ResolveError> {
        let query = bssid.to_string();
        let body =
            proto::build_request(&self.config, &query).map_err(|e| ResolveError::Setup(e.to_string()))?;

        if options.debug {
            debug!(url = %self.config.endpoint, payload_bytes = body.len(), bssid = %query, "POST");
        }

        // Stamp before the request: every record of this response shares it
        let observed_at = chrono::Utc::now().timestamp_millis();
        let response = self.transport.post(body).await?;

        if options.debug {
            debug!(
                response_bytes = response.len(),
                after_header = response.len().saturating_sub(proto::RESPONSE_HEADER_LEN),
                "response body"
            );
        }

        let records = try_decode_response(&response, observed_at, options)?;

        if options.debug {
            debug!(bssid = %query, records = records.len(), "decoded");
        }

        Ok(records)
    }
}

// ============================================================================
// DECODING
// ============================================================================

/// Pure decode step: response bytes in, records out. Never fails.
pub fn decode_response(body: &[u8], observed_at_epoch_millis: i64) -> Vec<AccessPointRecord> {
    match try_decode_response(body, observed_at_epoch_millis, ResolveOptions::default()) {
        Ok(records) => records,
        Err(e) => {
            warn!(kind = e.kind(), error = %e, "discarding undecodable response");
            Vec::new()
        }
    }
}

pub fn try_decode_response(
    body: &[u8],
    observed_at_epoch_millis: i64,
    options: ResolveOptions,
) -> Result<Vec<AccessPointRecord>, ResolveError> {
    let message = proto::decode_message(body)?;

    if options.debug {
        debug!(wifi_count = message.wifi.len(), "decoded wifi entries");
    }

    Ok(message
        .wifi
        .into_iter()
        .filter_map(|entry| to_record(entry, observed_at_epoch_millis, options))
        .collect())
}

/// Entries without an identifier or a location are dropped
fn to_record(
    entry: WifiEntry,
    observed_at_epoch_millis: i64,
    options: ResolveOptions,
) -> Option<AccessPointRecord> {
    let raw_identifier = entry.bssid?;
    let location = entry.location?;

    let latitude = location.latitude.unwrap_or(0) as f64 / COORDINATE_SCALE;
    let longitude = location.longitude.unwrap_or(0) as f64 / COORDINATE_SCALE;
    let mut channel = entry.channel.unwrap_or(UNKNOWN);
    let mut horizontal_accuracy_meters = location.horizontal_accuracy.unwrap_or(UNKNOWN);

    if latitude == SENTINEL_COORDINATE && longitude == SENTINEL_COORDINATE {
        channel = SENTINEL_CHANNEL;
        horizontal_accuracy_meters = UNKNOWN;
        if options.debug {
            debug!(bssid = %raw_identifier, "vendor has no location (sentinel)");
        }
    }

    Some(AccessPointRecord {
        normalized_identifier: pad_identifier(&raw_identifier),
        raw_identifier,
        latitude,
        longitude,
        channel,
        horizontal_accuracy_meters,
        observed_at_epoch_millis,
    })
}
