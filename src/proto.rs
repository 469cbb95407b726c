// 🧬 Vendor Wire Format - request framing and the positioning message schema
//
// Request body:
//   00 01                         framing version
//   u16-len "en_US"               locale
//   u16-len "com.apple.locationd" service bundle id
//   u16-len "8.1.12B411"          client version
//   00 00 00 01                   one location request
//   u32 payload length            (big-endian, a single byte in practice)
//   payload                       WifiScanMessage, protobuf
//
// Response body: 10 vendor header bytes, then a WifiScanMessage.

use crate::config::ClientConfig;
use prost::Message;

/// Vendor bytes in front of the protobuf payload of every response
pub const RESPONSE_HEADER_LEN: usize = 10;

const FRAMING_VERSION: [u8; 2] = [0x00, 0x01];
const LOCATION_REQUEST_COUNT: u32 = 1;

// ============================================================================
// MESSAGES
// ============================================================================
// Every field is optional: the schema is reverse-engineered, so absence has
// to stay distinguishable from zero. Unknown tags are skipped by prost.

/// Top-level message, used for both the request and the response
#[derive(Clone, PartialEq, Message)]
pub struct WifiScanMessage {
    #[prost(int64, optional, tag = "1")]
    pub request_id: Option<i64>,

    #[prost(message, repeated, tag = "2")]
    pub wifi: Vec<WifiEntry>,

    #[prost(int32, optional, tag = "3")]
    pub noise: Option<i32>,

    /// 0 asks for the queried AP and its neighbours
    #[prost(int32, optional, tag = "4")]
    pub single_result: Option<i32>,

    #[prost(string, optional, tag = "5")]
    pub api_name: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct WifiEntry {
    #[prost(string, optional, tag = "1")]
    pub bssid: Option<String>,

    #[prost(message, optional, tag = "2")]
    pub location: Option<VendorLocation>,

    #[prost(int32, optional, tag = "21")]
    pub channel: Option<i32>,
}

/// Coordinates are degrees * 10^8
#[derive(Clone, PartialEq, Message)]
pub struct VendorLocation {
    #[prost(int64, optional, tag = "1")]
    pub latitude: Option<i64>,

    #[prost(int64, optional, tag = "2")]
    pub longitude: Option<i64>,

    #[prost(int32, optional, tag = "3")]
    pub horizontal_accuracy: Option<i32>,

    #[prost(int32, optional, tag = "4")]
    pub reserved_a: Option<i32>,

    #[prost(int32, optional, tag = "5")]
    pub altitude: Option<i32>,

    #[prost(int32, optional, tag = "6")]
    pub vertical_accuracy: Option<i32>,

    #[prost(int32, optional, tag = "7")]
    pub reserved_b: Option<i32>,

    #[prost(int32, optional, tag = "8")]
    pub reserved_c: Option<i32>,
}

// ============================================================================
// REQUEST ENCODING
// ============================================================================

/// Protobuf payload asking about one BSSID (plus its neighbours)
pub fn encode_query(bssid: &str) -> Vec<u8> {
    WifiScanMessage {
        wifi: vec![WifiEntry {
            bssid: Some(bssid.to_string()),
            ..Default::default()
        }],
        noise: Some(0),
        single_result: Some(0),
        ..Default::default()
    }
    .encode_to_vec()
}

fn put_prefixed_str(buf: &mut Vec<u8>, field: &'static str, value: &str) -> Result<(), EncodeError> {
    let len = u16::try_from(value.len()).map_err(|_| EncodeError::FieldTooLong {
        field,
        len: value.len(),
    })?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Full POST body for one BSSID, already in canonical `aa:bb:..` form
pub fn build_request(config: &ClientConfig, bssid: &str) -> Result<Vec<u8>, EncodeError> {
    let payload = encode_query(bssid);
    let payload_len = u32::try_from(payload.len()).map_err(|_| EncodeError::FieldTooLong {
        field: "payload",
        len: payload.len(),
    })?;

    let mut body = Vec::with_capacity(64 + payload.len());
    body.extend_from_slice(&FRAMING_VERSION);
    put_prefixed_str(&mut body, "locale", &config.locale)?;
    put_prefixed_str(&mut body, "bundle_id", &config.bundle_id)?;
    put_prefixed_str(&mut body, "client_version", &config.client_version)?;
    body.extend_from_slice(&LOCATION_REQUEST_COUNT.to_be_bytes());
    body.extend_from_slice(&payload_len.to_be_bytes());
    body.extend_from_slice(&payload);
    Ok(body)
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("{field} is {len} bytes, longer than its length prefix allows")]
    FieldTooLong { field: &'static str, len: usize },
}

// ============================================================================
// RESPONSE FRAMING
// ============================================================================

/// Split off the vendor header and decode the payload
pub fn decode_message(body: &[u8]) -> Result<WifiScanMessage, FrameError> {
    let payload = body
        .get(RESPONSE_HEADER_LEN..)
        .ok_or(FrameError::Truncated { len: body.len() })?;

    WifiScanMessage::decode(payload).map_err(FrameError::Protobuf)
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("response of {len} bytes is shorter than the {RESPONSE_HEADER_LEN}-byte header")]
    Truncated { len: usize },

    #[error("malformed payload: {0}")]
    Protobuf(#[from] prost::DecodeError),
}
