//! JSON transcoding for LiteVector data.
//!
//! [ltv_to_json] streams LTV elements straight to JSON text, driven by the
//! decoder's role annotations. [json_to_ltv] parses a JSON document and
//! re-encodes it, recovering typed vectors from homogeneous numeric arrays
//! and stringified values (big integers, special floats, base64 binary)
//! from string payloads.

mod from_json;
mod sniff;
mod to_json;

pub use from_json::json_to_ltv;
pub use to_json::ltv_to_json;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error(transparent)]
    Ltv(#[from] ltv_core::LtvError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type TranscodeResult<T> = Result<T, TranscodeError>;
