//! Error implementations.

use crate::consts::TypeCode;

use serde::{de, ser};
use thiserror::Error;

pub type LtvResult<T> = Result<T, LtvError>;

/// Errors surfaced by the encoders, decoders and the generic mapper.
#[derive(Debug, Error)]
pub enum LtvError {
    /// Tag byte carries a size code out of range, or a payload-less type
    /// with a vector size code.
    #[error("size code out of range")]
    BadSizeCode,

    /// String payload is not valid UTF-8.
    #[error("string with invalid UTF-8 data")]
    BadUtf8,

    /// Struct body contains a non-string or empty-string key.
    #[error("invalid struct key")]
    BadKey,

    /// Vector payload length is not a multiple of its element size.
    #[error("vector length invalid for data type")]
    InvalidVectorLen,

    /// Materializing a value would exceed the decoder's configured limit.
    #[error("max value length exceeded")]
    MaxValueLenExceeded,

    /// Containers nested past [crate::MAX_NESTING_DEPTH].
    #[error("max nesting depth exceeded")]
    MaxNestingDepth,

    /// An end tag appeared with no matching open struct/list.
    #[error("mismatched struct/list end tags")]
    NestingMismatch,

    /// A struct closed after a key with no value, or an end tag appeared
    /// where a value was required.
    #[error("expected value")]
    ExpectedValue,

    /// A struct element was required but something else was found.
    #[error("expected struct")]
    ExpectedStruct,

    /// Input ended mid-element or with open containers.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// The mapper has no wire representation for this host type.
    #[error("unsupported type: {0}")]
    UnsupportedType(&'static str),

    /// The mapper cannot represent this particular value.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// A decoded element cannot be assigned to the requested host type.
    #[error("cannot decode {found} into {target}")]
    UnmarshalType {
        found: TypeCode,
        target: &'static str,
    },

    /// A key was inserted twice into an ordered struct.
    #[error("duplicate struct key: {0:?}")]
    DuplicateKey(String),

    /// The underlying byte source or sink failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Custom error raised by a user `Serialize`/`Deserialize` impl.
    #[error("{0}")]
    Message(String),
}

impl ser::Error for LtvError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self::Message(msg.to_string())
    }
}

impl de::Error for LtvError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self::Message(msg.to_string())
    }
}
