//! JSON codec for [`Envelope`].
//!
//! Decoding is strict about shape: anything that is not a JSON object with a
//! string `type` field is rejected, as is a known `type` whose required
//! fields are missing or mistyped. An unrecognized `type` decodes to
//! [`Envelope::Unknown`] so callers can ignore it without treating it as an
//! error.

use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::{DecodeError, EncodeError};

/// Parse one inbound text frame.
pub fn decode(text: &str) -> Result<Envelope, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Malformed)?;

    let kind = match &value {
        Value::Object(map) => match map.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(DecodeError::MissingType),
        },
        _ => return Err(DecodeError::NotAnObject),
    };

    serde_json::from_value(value).map_err(|source| DecodeError::InvalidPayload { kind, source })
}

/// Serialize an envelope for the wire.
pub fn encode(envelope: &Envelope) -> Result<String, EncodeError> {
    serde_json::to_string(envelope).map_err(|source| EncodeError {
        kind: envelope.kind().as_str(),
        source,
    })
}
