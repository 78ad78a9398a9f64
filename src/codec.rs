// 📦 Record Codec - Versioned JSON envelope for stored blobs
//
// {"format": 1, "record": {...}}
// decode(encode(x)) == x for every entity; unknown formats are refused
// instead of being half-read.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format: u32,
    record: &'a T,
}

// `format` is read separately by FormatProbe
#[derive(Deserialize)]
struct Envelope<T> {
    record: T,
}

#[derive(Deserialize)]
struct FormatProbe {
    format: u32,
}

pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(&EnvelopeRef {
        format: FORMAT_VERSION,
        record,
    })
    .map_err(StoreError::Encode)
}

/// Decode a blob read from `bucket`/`key`; failures are reported as corruption.
pub fn decode<T: DeserializeOwned>(
    bucket: &'static str,
    key: &str,
    bytes: &[u8],
) -> Result<T, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        bucket,
        key: key.to_string(),
        reason,
    };

    // Check the version before trusting the record shape
    let probe: FormatProbe =
        serde_json::from_slice(bytes).map_err(|e| corrupt(format!("unreadable envelope: {}", e)))?;
    if probe.format != FORMAT_VERSION {
        return Err(corrupt(format!("unsupported format version {}", probe.format)));
    }

    let envelope: Envelope<T> =
        serde_json::from_slice(bytes).map_err(|e| corrupt(format!("undecodable record: {}", e)))?;
    Ok(envelope.record)
}
