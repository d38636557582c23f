//! Placeholder value encoding and result classification.
//!
//! Values are "encrypted" as the UTF-8 text `encrypted:<n>`. No cryptography
//! happens here; the contract treats the bytes as opaque ciphertext.

use alloy::primitives::Bytes;
use serde::{Deserialize, Serialize};

/// Marker prefix of an encoded value.
pub const VALUE_PREFIX: &str = "encrypted:";

/// Text reported for payloads that are not valid UTF-8.
pub const NON_TEXT: &str = "non-text";

/// Encode a value as the pseudo-ciphertext the contract stores.
pub fn encode_value(value: u32) -> Bytes {
    Bytes::from(format!("{}{}", VALUE_PREFIX, value).into_bytes())
}

/// Best-effort text view of an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodedPayload {
    Text(String),
    NonText,
}

impl DecodedPayload {
    /// Decoded text, or `"non-text"`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::NonText => NON_TEXT,
        }
    }
}

impl std::fmt::Display for DecodedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode payload bytes as UTF-8. Invalid text is not an error.
pub fn decode_payload(bytes: &[u8]) -> DecodedPayload {
    match std::str::from_utf8(bytes) {
        Ok(text) => DecodedPayload::Text(text.to_owned()),
        Err(_) => DecodedPayload::NonText,
    }
}

/// Outcome of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Adult,
    NotAdult,
    Unknown,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Adult => "adult",
            Self::NotAdult => "not adult",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The integer of an `encrypted:<n>` text, if it is one.
pub fn extract_value(text: &str) -> Option<i64> {
    text.strip_prefix(VALUE_PREFIX)?.trim().parse().ok()
}

/// Adult iff `value >= threshold`.
pub fn classify_value(value: i64, threshold: i64) -> Classification {
    if value >= threshold {
        Classification::Adult
    } else {
        Classification::NotAdult
    }
}

/// Classify a decoded payload; anything that is not `encrypted:<n>` is unknown.
pub fn classify(decoded: &DecodedPayload, threshold: i64) -> Classification {
    match decoded {
        DecodedPayload::Text(text) => extract_value(text)
            .map(|value| classify_value(value, threshold))
            .unwrap_or(Classification::Unknown),
        DecodedPayload::NonText => Classification::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_bytes(bytes: &[u8]) -> Classification {
        classify(&decode_payload(bytes), 18)
    }

    #[test]
    fn test_threshold_boundary() {
        assert_eq!(classify_value(18, 18), Classification::Adult);
        assert_eq!(classify_value(17, 18), Classification::NotAdult);
        assert_eq!(classify_value(i64::MAX, 18), Classification::Adult);
        assert_eq!(classify_value(-1, 18), Classification::NotAdult);
    }

    #[test]
    fn test_encoded_values_classify() {
        assert_eq!(classify_bytes(&encode_value(25)), Classification::Adult);
        assert_eq!(classify_bytes(&encode_value(17)), Classification::NotAdult);
        assert_eq!(classify_bytes(&encode_value(0)), Classification::NotAdult);
    }

    #[test]
    fn test_malformed_payloads_are_unknown() {
        for payload in [&b"encrypted:"[..], b"garbage", b"", b"encrypted:abc", b"encrypted:99999999999999999999", b"ENCRYPTED:20"] {
            assert_eq!(classify_bytes(payload), Classification::Unknown, "{:?}", payload);
        }
    }

    #[test]
    fn test_non_utf8_payload() {
        let decoded = decode_payload(&[0xff, 0xfe, 0x00]);
        assert_eq!(decoded, DecodedPayload::NonText);
        assert_eq!(decoded.to_string(), "non-text");
        assert_eq!(classify(&decoded, 18), Classification::Unknown);
    }

    #[test]
    fn test_extract_value_tolerates_whitespace_and_sign() {
        assert_eq!(extract_value("encrypted: 42"), Some(42));
        assert_eq!(extract_value("encrypted:-3"), Some(-3));
        assert_eq!(extract_value("encrypted:4 2"), None);
    }

    #[test]
    fn test_encode_value_text() {
        assert_eq!(encode_value(25).as_ref(), b"encrypted:25");
    }
}
