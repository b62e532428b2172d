//! Flag sets stored in descriptors and name records.
//!
//! Bit meanings are part of the table format: the emitter and the runtime
//! must agree on every bit.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Header flags (`tflag` byte).
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct TFlag: u8 {
        /// An uncommon trailer follows the kind trailer.
        const UNCOMMON = 1 << 0;
        /// The textual form carries one extra leading `*` to strip.
        const EXTRA_STAR = 1 << 1;
        /// The type has a declared name.
        const NAMED = 1 << 2;
    }
}

bitflags! {
    /// Leading flags byte of a name record.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct NameFlags: u8 {
        const EXPORTED = 1 << 0;
        /// A 16-bit tag length and tag bytes follow the identifier.
        const HAS_TAG = 1 << 1;
        /// A 4-byte name offset naming the package path follows.
        const HAS_PKG_PATH = 1 << 2;
    }
}

bitflags! {
    /// Storage and hashing behavior of a map type.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct MapFlags: u32 {
        /// Buckets store a pointer to the key instead of the key.
        const INDIRECT_KEY = 1 << 0;
        /// Buckets store a pointer to the value instead of the value.
        const INDIRECT_VALUE = 1 << 1;
        /// `k == k` holds for every key.
        const REFLEXIVE_KEY = 1 << 2;
        /// Overwriting an entry must also overwrite the key.
        const NEED_KEY_UPDATE = 1 << 3;
        /// Hashing a key may panic.
        const HASH_MIGHT_PANIC = 1 << 4;
    }
}

/// Channel direction.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum ChanDir {
    Recv = 1,
    Send = 2,
    Both = 3,
}

impl ChanDir {
    /// Decode the raw direction word of a channel trailer.
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            1 => Some(ChanDir::Recv),
            2 => Some(ChanDir::Send),
            3 => Some(ChanDir::Both),
            _ => None,
        }
    }

    #[inline]
    pub const fn to_raw(self) -> u64 {
        self as u64
    }
}

impl fmt::Display for ChanDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChanDir::Recv => "<-chan",
            ChanDir::Send => "chan<-",
            ChanDir::Both => "chan",
        })
    }
}
