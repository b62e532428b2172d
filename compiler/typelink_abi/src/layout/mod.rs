//! Byte layout of descriptor tables.
//!
//! All multi-byte fields are little-endian except the two length fields of
//! a name record, which are big-endian. Pointer fields are 8 bytes.
//!
//! ```text
//! +--------------------+----------------+-----------+--------------------+
//! | base header (48 B) | kind trailer   | uncommon  | func params,       |
//! |                    | (kind-sized)   | (16 B)    | method arrays, ... |
//! +--------------------+----------------+-----------+--------------------+
//! ```
//!
//! Changing any constant here breaks every table already emitted.

use crate::Kind;

/// Size of a pointer field.
pub const PTR_SIZE: usize = 8;

/// Base header size shared by every descriptor.
pub const HEADER_SIZE: usize = 48;

/// High bit of a function's output count: the last input is variadic.
pub const VARIADIC_FLAG: u16 = 1 << 15;

/// Base header field offsets.
pub mod header {
    pub const SIZE: usize = 0;
    pub const PTRDATA: usize = 8;
    pub const HASH: usize = 16;
    pub const TFLAG: usize = 20;
    pub const ALIGN: usize = 21;
    pub const FIELD_ALIGN: usize = 22;
    pub const KIND: usize = 23;
    pub const ALG: usize = 24;
    pub const GCDATA: usize = 32;
    pub const STR: usize = 40;
    pub const PTR_TO_THIS: usize = 44;
}

/// Kind trailer field offsets, measured from the descriptor start.
pub mod trailer {
    /// Element type of pointer, slice, array and channel descriptors.
    pub const ELEM: usize = 48;

    pub const ARRAY_SLICE: usize = 56;
    pub const ARRAY_LEN: usize = 64;

    pub const CHAN_DIR: usize = 56;

    pub const FUNC_IN_COUNT: usize = 48;
    pub const FUNC_OUT_COUNT: usize = 50;

    /// Embedded package-path name of struct and interface descriptors.
    pub const PKG_PATH: usize = 48;
    /// Slice header (`ptr`, `len`, `cap`) of struct fields / interface methods.
    pub const LIST_PTR: usize = 56;
    pub const LIST_LEN: usize = 64;
    pub const LIST_CAP: usize = 72;

    pub const MAP_KEY: usize = 48;
    pub const MAP_ELEM: usize = 56;
    pub const MAP_BUCKET: usize = 64;
    pub const MAP_KEY_SIZE: usize = 72;
    pub const MAP_VALUE_SIZE: usize = 73;
    pub const MAP_BUCKET_SIZE: usize = 74;
    pub const MAP_FLAGS: usize = 76;
}

/// Uncommon trailer layout.
pub mod uncommon {
    pub const PKG_PATH: usize = 0;
    pub const MCOUNT: usize = 4;
    pub const XCOUNT: usize = 6;
    /// Offset from the uncommon trailer to its method array.
    pub const MOFF: usize = 8;
    pub const SIZE: usize = 16;
}

/// Method table entry.
pub mod method {
    pub const NAME: usize = 0;
    pub const MTYP: usize = 4;
    pub const IFN: usize = 8;
    pub const TFN: usize = 12;
    pub const SIZE: usize = 16;
}

/// Interface method entry.
pub mod imethod {
    pub const NAME: usize = 0;
    pub const TYP: usize = 4;
    pub const SIZE: usize = 8;
}

/// Struct field entry.
pub mod field {
    pub const NAME: usize = 0;
    pub const TYP: usize = 8;
    pub const OFFSET_ANON: usize = 16;
    pub const SIZE: usize = 24;
}

/// Offset of the uncommon trailer, i.e. the header plus the kind trailer.
///
/// This is the single place that knows how large each kind's trailer is.
pub const fn uncommon_offset(kind: Kind) -> usize {
    match kind {
        // Func: two u16 counts padded to pointer alignment.
        Kind::Ptr | Kind::Slice | Kind::Func => 56,
        Kind::Array => 72,
        Kind::Chan => 64,
        Kind::Interface | Kind::Map | Kind::Struct => 80,
        _ => HEADER_SIZE,
    }
}

/// Offset of a function's inline parameter array.
pub const fn func_params_offset(has_uncommon: bool) -> usize {
    if has_uncommon {
        uncommon_offset(Kind::Func) + uncommon::SIZE
    } else {
        uncommon_offset(Kind::Func)
    }
}

/// Round `offset` up to a multiple of `align` (a power of two).
#[inline]
pub const fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}

// -- Reading ------------------------------------------------------------

#[inline]
fn array_at<const N: usize>(bytes: &[u8], off: usize) -> Option<[u8; N]> {
    bytes.get(off..off.checked_add(N)?)?.try_into().ok()
}

#[inline]
pub fn read_u8(bytes: &[u8], off: usize) -> Option<u8> {
    bytes.get(off).copied()
}

#[inline]
pub fn read_u16(bytes: &[u8], off: usize) -> Option<u16> {
    array_at(bytes, off).map(u16::from_le_bytes)
}

#[inline]
pub fn read_u16_be(bytes: &[u8], off: usize) -> Option<u16> {
    array_at(bytes, off).map(u16::from_be_bytes)
}

#[inline]
pub fn read_u32(bytes: &[u8], off: usize) -> Option<u32> {
    array_at(bytes, off).map(u32::from_le_bytes)
}

#[inline]
pub fn read_i32(bytes: &[u8], off: usize) -> Option<i32> {
    array_at(bytes, off).map(i32::from_le_bytes)
}

#[inline]
pub fn read_u64(bytes: &[u8], off: usize) -> Option<u64> {
    array_at(bytes, off).map(u64::from_le_bytes)
}

// -- Writing ------------------------------------------------------------
//
// Writers index directly: callers size the buffer from the layout first.

#[inline]
pub fn write_u8(buf: &mut [u8], off: usize, value: u8) {
    buf[off] = value;
}

#[inline]
pub fn write_u16(buf: &mut [u8], off: usize, value: u16) {
    buf[off..off + 2].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn write_u16_be(buf: &mut [u8], off: usize, value: u16) {
    buf[off..off + 2].copy_from_slice(&value.to_be_bytes());
}

#[inline]
pub fn write_u32(buf: &mut [u8], off: usize, value: u32) {
    buf[off..off + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn write_i32(buf: &mut [u8], off: usize, value: i32) {
    buf[off..off + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn write_u64(buf: &mut [u8], off: usize, value: u64) {
    buf[off..off + 8].copy_from_slice(&value.to_le_bytes());
}
