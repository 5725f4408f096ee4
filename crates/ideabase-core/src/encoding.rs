//! Transport encoding for upload payloads.
//!
//! Multipart uploads carry raw bytes. The JSON transport needs a text-safe
//! payload, so the client sends a data URL (`data:{mime};base64,...`); the
//! gateway also accepts bare base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// How a client ships file bytes to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    #[default]
    Multipart,
    Json,
}

impl std::str::FromStr for Transport {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "multipart" | "form" => Ok(Transport::Multipart),
            "json" | "base64" => Ok(Transport::Json),
            other => Err(format!("Unknown transport: {}", other)),
        }
    }
}

/// Encode bytes as a data URL.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Decode a data URL or bare base64 string.
pub fn decode_payload(content: &str) -> Result<Vec<u8>, ValidationError> {
    let trimmed = content.trim();
    let payload = if let Some(rest) = trimmed.strip_prefix("data:") {
        let (header, data) = rest.split_once(',').ok_or_else(|| {
            ValidationError::InvalidEncoding("data URL has no payload separator".to_string())
        })?;
        if !header.ends_with(";base64") {
            return Err(ValidationError::InvalidEncoding(
                "data URL is not base64 encoded".to_string(),
            ));
        }
        data
    } else {
        trimmed
    };

    STANDARD
        .decode(payload)
        .map_err(|e| ValidationError::InvalidEncoding(e.to_string()))
}

/// Length of the padded base64 encoding of `n` bytes.
pub fn encoded_len(n: u64) -> u64 {
    n.div_ceil(3) * 4
}
