//! Codec error types.

use thiserror::Error;

/// An inbound frame that could not be turned into an [`Envelope`](crate::Envelope).
///
/// Receivers drop the frame and keep reading; a decode failure never ends a
/// connection.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("envelope is not a JSON object")]
    NotAnObject,

    #[error("envelope is missing the `type` discriminant")]
    MissingType,

    #[error("invalid `{kind}` envelope: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to serialize an outbound envelope.
#[derive(Debug, Error)]
#[error("failed to encode `{kind}` envelope: {source}")]
pub struct EncodeError {
    pub kind: &'static str,
    #[source]
    pub source: serde_json::Error,
}
