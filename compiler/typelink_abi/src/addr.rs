//! Addresses and offsets.
//!
//! Descriptor tables never store absolute addresses for names, method
//! types or code. They store 32-bit offsets relative to the module that
//! issued them, which keeps the tables relocatable. Pointer-sized fields
//! (element types, struct field names, ...) hold an [`Addr`] that the
//! loader has already relocated.

use std::fmt;

/// A virtual address inside a runtime's address space.
///
/// Two descriptors are the same type exactly when their addresses are equal.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct Addr(u64);

impl Addr {
    /// The null address (absent pointer field).
    pub const NULL: Self = Self(0);

    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Address `delta` bytes past `self`, or `None` on overflow.
    #[inline]
    pub const fn checked_add(self, delta: u64) -> Option<Self> {
        match self.0.checked_add(delta) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// Address `delta` bytes past `self`.
    ///
    /// # Panics
    /// Panics if the result does not fit in 64 bits.
    #[inline]
    pub fn add_bytes(self, delta: u64) -> Self {
        match self.checked_add(delta) {
            Some(addr) => addr,
            None => panic!("address overflow: {self} + {delta:#x}"),
        }
    }

    /// Byte distance from `base` to `self`, or `None` if `self < base`.
    #[inline]
    pub const fn offset_from(self, base: Addr) -> Option<u64> {
        self.0.checked_sub(base.0)
    }
}

impl fmt::Debug for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Addr({:#x})", self.0)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

macro_rules! define_offset {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(i32);

        impl $name {
            /// The absent offset.
            pub const NONE: Self = Self(0);

            #[inline]
            pub const fn new(raw: i32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> i32 {
                self.0
            }

            #[inline]
            pub const fn is_none(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#x})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

define_offset!(
    /// Offset of a name record.
    NameOff
);
define_offset!(
    /// Offset of a type descriptor.
    TypeOff
);
define_offset!(
    /// Offset into a module's code.
    TextOff
);
