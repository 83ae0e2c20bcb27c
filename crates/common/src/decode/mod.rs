//! Decoders for the two value layouts worth recognising without knowing
//! the schema of whatever wrote them.

pub mod envelope;
pub mod time;

pub use envelope::{decode_envelope, Envelope};
pub use time::{decode_time, DecodedTime};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid timestamp: {0}")]
    Time(String),
    #[error("invalid envelope: {0}")]
    Envelope(#[from] prost::DecodeError),
}
