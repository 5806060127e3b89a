//! Chat Relay - Protocol Types
//!
//! The JSON envelope exchanged between chat clients and the relay, in both
//! directions. This crate is the single source of truth for envelope kinds,
//! field names, and the codec used to move them on and off the wire.

pub mod codec;
pub mod envelope;
pub mod error;

pub use codec::{decode, encode};
pub use envelope::{Envelope, EnvelopeKind};
pub use error::{DecodeError, EncodeError};
