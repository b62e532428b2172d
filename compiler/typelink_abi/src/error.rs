//! Errors raised while decoding or emitting tables.

use thiserror::Error;

/// A byte sequence is not a well-formed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("record truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("name {field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },
}

/// A value cannot be represented in the table format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("name {field} is {len} bytes, over the 16-bit length limit")]
    TooLong { field: &'static str, len: usize },

    #[error("function has {count} {what}, over the 15-bit count limit")]
    TooManyParams { what: &'static str, count: usize },

    #[error("{what} count {count} does not fit the table format")]
    TooMany { what: &'static str, count: usize },
}

/// An image could not be laid out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("type handle #{index} was declared but never defined")]
    Undefined { index: usize },

    #[error("{what} at {addr} is outside the section starting at {base}; offsets must stay section-relative")]
    NotSectionRelative {
        what: &'static str,
        addr: crate::Addr,
        base: crate::Addr,
    },

    #[error("type handle #{index} defined twice")]
    Redefined { index: usize },

    #[error("image of {len} bytes does not fit in the 32-bit offset range")]
    TooLarge { len: usize },

    #[error("type handle #{index} has kind {kind} but a {shape} trailer")]
    ShapeMismatch {
        index: usize,
        kind: crate::Kind,
        shape: &'static str,
    },

    #[error("offset registry exhausted")]
    RegistryExhausted,

    #[error(transparent)]
    Encode(#[from] EncodeError),
}
