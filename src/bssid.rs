// 📡 BSSID Input - validation, normalization and list files
// Every entry point (CLI flag, file line, HTTP body) goes through Bssid::parse

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BssidError {
    /// Input is not six hex octets (colon, hyphen or no delimiter)
    #[error("invalid BSSID format: \"{input}\" (expected HH:HH:HH:HH:HH:HH)")]
    InvalidFormat { input: String },
}

// ============================================================================
// BSSID VALUE
// ============================================================================

/// A validated access point identifier.
///
/// Displays as the canonical lower-case, colon-delimited form that the
/// vendor request expects (`aa:bb:cc:dd:ee:ff`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bssid([u8; 6]);

impl Bssid {
    /// Parse `aa:bb:cc:dd:ee:ff`, `AA-BB-CC-DD-EE-FF` or `aabbccddeeff`
    pub fn parse(input: &str) -> Result<Self, BssidError> {
        let trimmed = input.trim();
        let invalid = || BssidError::InvalidFormat {
            input: input.to_string(),
        };

        let bytes = trimmed.as_bytes();
        let mut octets = [0u8; 6];
        let mut pos = 0;

        for (i, octet) in octets.iter_mut().enumerate() {
            if i > 0 && pos < bytes.len() && (bytes[pos] == b':' || bytes[pos] == b'-') {
                // Delimiters are all-or-nothing: bare hex never mixes with separators
                if pos != i * 3 - 1 {
                    return Err(invalid());
                }
                pos += 1;
            }

            let pair = trimmed.get(pos..pos + 2).ok_or_else(invalid)?;
            if !pair.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
            pos += 2;
        }

        // 12 (bare) or 17 (delimited) characters, nothing trailing
        if pos != bytes.len() || (pos != 12 && pos != 17) {
            return Err(invalid());
        }

        Ok(Bssid(octets))
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl fmt::Debug for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bssid({self})")
    }
}

impl FromStr for Bssid {
    type Err = BssidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bssid::parse(s)
    }
}

impl TryFrom<String> for Bssid {
    type Error = BssidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Bssid::parse(&value)
    }
}

impl From<Bssid> for String {
    fn from(value: Bssid) -> Self {
        value.to_string()
    }
}

/// Normalize any accepted BSSID spelling to `aa:bb:cc:dd:ee:ff`
pub fn normalize_bssid(input: &str) -> Result<String, BssidError> {
    Bssid::parse(input).map(|b| b.to_string())
}

// ============================================================================
// VENDOR IDENTIFIERS
// ============================================================================

/// Zero-pad each colon-separated octet of a vendor identifier.
///
/// The vendor drops leading zeros (`0:1b:2:c:d:e`), so this is the join key
/// across snapshots. Unlike `Bssid::parse` it never fails: whatever the
/// vendor sent is padded octet by octet and lower-cased.
pub fn pad_identifier(raw: &str) -> String {
    raw.split(':')
        .map(|part| format!("{:0>2}", part.to_ascii_lowercase()))
        .collect::<Vec<_>>()
        .join(":")
}

// ============================================================================
// BSSID LIST FILES
// ============================================================================

/// Read one BSSID per line. Blank lines are ignored, malformed lines are
/// logged and skipped, duplicates keep their first position.
pub fn read_bssid_file(path: &Path) -> Result<Vec<Bssid>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read BSSID file: {}", path.display()))?;

    Ok(parse_bssid_lines(&content))
}

pub fn parse_bssid_lines(content: &str) -> Vec<Bssid> {
    let mut seen = HashSet::new();
    let mut bssids = Vec::new();

    for (line_number, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match Bssid::parse(trimmed) {
            Ok(bssid) => {
                if seen.insert(bssid) {
                    bssids.push(bssid);
                }
            }
            Err(e) => warn!(line = line_number + 1, error = %e, "ignoring invalid BSSID line"),
        }
    }

    bssids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_all_delimiter_styles() {
        let expected = "aa:bb:cc:dd:ee:ff";

        for input in [
            "aa:bb:cc:dd:ee:ff",
            "AA:BB:CC:DD:EE:FF",
            "aa-bb-cc-dd-ee-ff",
            "aabbccddeeff",
            "AaBbCcDdEeFf",
            "  aa:bb:cc:dd:ee:ff\n",
            "aa:bb-cc:dd-ee:ff",
        ] {
            assert_eq!(normalize_bssid(input).unwrap(), expected, "input {input:?}");
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["00-1A-2B-3C-4D-5E", "001a2b3c4d5e", "00:1a:2b:3c:4d:5e"] {
            let once = normalize_bssid(input).unwrap();
            let twice = normalize_bssid(&once).unwrap();
            assert_eq!(once, twice);
            assert_eq!(once, "00:1a:2b:3c:4d:5e");
        }
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for input in [
            "",
            "aa:bb:cc:dd:ee",
            "aa:bb:cc:dd:ee:ff:00",
            "aa:bb:cc:dd:ee:fg",
            "aabbccddeef",
            "aabbccddeeff0",
            "aa:bbccddeeff",
            "a:bb:cc:dd:ee:ff",
            "aa::bb:cc:dd:ee",
            "aa.bb.cc.dd.ee.ff",
            "aa:bb:cc:dd:ee:ff:",
        ] {
            assert!(Bssid::parse(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_error_mentions_input() {
        let err = Bssid::parse("nope").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_pad_identifier() {
        assert_eq!(pad_identifier("0:1b:2:C:d:e"), "00:1b:02:0c:0d:0e");
        assert_eq!(pad_identifier("aa:bb:cc:dd:ee:ff"), "aa:bb:cc:dd:ee:ff");
        // Non-MAC strings still pass through octet by octet
        assert_eq!(pad_identifier("1:2"), "01:02");
    }

    #[test]
    fn test_parse_bssid_lines_dedupes_and_skips() {
        let content = "aa:bb:cc:dd:ee:ff\n\nnot-a-mac\nAA-BB-CC-DD-EE-FF\r\n11:22:33:44:55:66\n";
        let bssids = parse_bssid_lines(content);

        assert_eq!(bssids.len(), 2);
        assert_eq!(bssids[0].to_string(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(bssids[1].to_string(), "11:22:33:44:55:66");
    }

    #[test]
    fn test_read_bssid_file_missing() {
        let result = read_bssid_file(Path::new("/definitely/not/here.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn test_serde_roundtrip_uses_canonical_form() {
        let bssid: Bssid = serde_json::from_str("\"AA-BB-CC-DD-EE-FF\"").unwrap();
        assert_eq!(serde_json::to_string(&bssid).unwrap(), "\"aa:bb:cc:dd:ee:ff\"");
    }
}
