//! Kind tag stored in every descriptor header.
//!
//! The low five bits of the kind byte select the trailer layout. The two
//! bits above them are attributes that travel with the kind byte but never
//! change which kind it is.
//!
//! # Ranges
//!
//! - 1-16: boolean and numeric kinds (no trailer)
//! - 17-23 and 25: composite kinds, each with its own trailer
//! - 24 and 26: `string` and `unsafe.Pointer` (no trailer)

use std::fmt;

/// Mask selecting the kind from the raw kind byte.
pub const KIND_MASK: u8 = (1 << 5) - 1;

/// Values of this type are stored directly in an interface word.
pub const KIND_DIRECT_IFACE: u8 = 1 << 5;

/// `gcdata` holds a collector program rather than a pointer bitmap.
pub const KIND_GC_PROG: u8 = 1 << 6;

/// Descriptor kind (closed set).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
pub enum Kind {
    /// Zero value; never a valid kind for a real descriptor.
    Invalid = 0,
    Bool = 1,
    Int = 2,
    Int8 = 3,
    Int16 = 4,
    Int32 = 5,
    Int64 = 6,
    Uint = 7,
    Uint8 = 8,
    Uint16 = 9,
    Uint32 = 10,
    Uint64 = 11,
    Uintptr = 12,
    Float32 = 13,
    Float64 = 14,
    Complex64 = 15,
    Complex128 = 16,
    Array = 17,
    Chan = 18,
    Func = 19,
    Interface = 20,
    Map = 21,
    Ptr = 22,
    Slice = 23,
    String = 24,
    Struct = 25,
    UnsafePointer = 26,
}

impl Kind {
    /// Every kind, in tag order.
    pub const ALL: [Kind; 27] = [
        Kind::Invalid,
        Kind::Bool,
        Kind::Int,
        Kind::Int8,
        Kind::Int16,
        Kind::Int32,
        Kind::Int64,
        Kind::Uint,
        Kind::Uint8,
        Kind::Uint16,
        Kind::Uint32,
        Kind::Uint64,
        Kind::Uintptr,
        Kind::Float32,
        Kind::Float64,
        Kind::Complex64,
        Kind::Complex128,
        Kind::Array,
        Kind::Chan,
        Kind::Func,
        Kind::Interface,
        Kind::Map,
        Kind::Ptr,
        Kind::Slice,
        Kind::String,
        Kind::Struct,
        Kind::UnsafePointer,
    ];

    /// Decode a raw kind byte, ignoring the attribute bits.
    ///
    /// Returns `None` when the masked value is outside the closed set.
    #[inline]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        let masked = (raw & KIND_MASK) as usize;
        if masked < Self::ALL.len() {
            Some(Self::ALL[masked])
        } else {
            None
        }
    }

    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Boolean, integer, float and complex kinds.
    #[inline]
    pub const fn is_numeric_or_bool(self) -> bool {
        let v = self as u8;
        v >= Kind::Bool as u8 && v <= Kind::Complex128 as u8
    }

    /// Kinds whose descriptors are equal once name and package path agree.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.is_numeric_or_bool() || matches!(self, Kind::String | Kind::UnsafePointer)
    }

    /// Kinds that carry a trailer after the base header.
    #[inline]
    pub const fn has_trailer(self) -> bool {
        matches!(
            self,
            Kind::Array
                | Kind::Chan
                | Kind::Func
                | Kind::Interface
                | Kind::Map
                | Kind::Ptr
                | Kind::Slice
                | Kind::Struct
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            Kind::Invalid => "invalid",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Uintptr => "uintptr",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Complex64 => "complex64",
            Kind::Complex128 => "complex128",
            Kind::Array => "array",
            Kind::Chan => "chan",
            Kind::Func => "func",
            Kind::Interface => "interface",
            Kind::Map => "map",
            Kind::Ptr => "ptr",
            Kind::Slice => "slice",
            Kind::String => "string",
            Kind::Struct => "struct",
            Kind::UnsafePointer => "unsafe.Pointer",
        }
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind::{}", self.name())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// The kind is stored in a single byte of the header.
const _: () = assert!(std::mem::size_of::<Kind>() == 1);
