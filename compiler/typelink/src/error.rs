//! Resolution and load errors.

use std::fmt;

use thiserror::Error;
use typelink_abi::{Addr, DecodeError};

/// Which offset family a failed resolution belonged to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OffsetKind {
    Name,
    Type,
    Text,
}

impl fmt::Display for OffsetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OffsetKind::Name => "nameOff",
            OffsetKind::Type => "typeOff",
            OffsetKind::Text => "textOff",
        })
    }
}

/// Corrupt or inconsistent metadata.
///
/// The plain resolver entry points treat every one of these as fatal; the
/// `try_` variants hand them back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("{what} {off:#x} out of range {start}-{end}")]
    OutOfRange {
        what: OffsetKind,
        off: i32,
        start: Addr,
        end: Addr,
    },

    #[error("{what} {off:#x} base {ctx} not in ranges")]
    NotInRanges {
        what: OffsetKind,
        off: i32,
        ctx: Addr,
    },

    #[error("textOff {off:#x} in module `{module}`, which has no code")]
    NoCode { off: i32, module: String },

    #[error("address {addr} is outside every module and the arena")]
    Unmapped { addr: Addr },

    #[error("impossible type kind {raw}")]
    ImpossibleKind { raw: u8 },

    #[error("malformed record at {addr}")]
    Malformed {
        addr: Addr,
        #[source]
        source: DecodeError,
    },

    #[error("runtime-created object ids exhausted")]
    RegistryExhausted,
}

impl ResolveError {
    /// Offset errors are reported together with every module's range.
    pub(crate) fn is_offset_error(&self) -> bool {
        matches!(
            self,
            ResolveError::OutOfRange { .. } | ResolveError::NotInRanges { .. }
        )
    }
}

/// A module was rejected by [`Runtime::add_module`](crate::Runtime::add_module).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("module `{module}` has an empty type section")]
    EmptySection { module: String },

    #[error("type section of module `{module}` at {start} with {len} bytes wraps the address space")]
    AddressOverflow {
        module: String,
        start: Addr,
        len: usize,
    },

    #[error("type section of module `{module}` overlaps module `{other}`")]
    Overlap { module: String, other: String },

    #[error("type section of module `{module}` ends at {end}, past the arena base {arena}")]
    IntoArena {
        module: String,
        end: Addr,
        arena: Addr,
    },
}
