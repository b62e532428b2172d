//! Name records.
//!
//! A name record is self-describing:
//!
//! ```text
//! flags:u8 | len:u16be | name[len]
//!          [| taglen:u16be | tag[taglen]]      if HAS_TAG
//!          [| pkgpath:NameOff (4 bytes, LE)]   if HAS_PKG_PATH
//! ```
//!
//! The package path is a back-reference to another name record, resolved
//! relative to the address of the record that holds it. Decoding here stops
//! at the raw offset; following it needs a resolver.

use crate::error::{DecodeError, EncodeError};
use crate::layout::{read_i32, read_u16_be, read_u8};
use crate::{NameFlags, NameOff};

/// Offset of the flags byte.
const FLAGS: usize = 0;
/// Offset of the big-endian identifier length.
const NAME_LEN: usize = 1;
/// Offset of the identifier bytes.
const NAME_DATA: usize = 3;

/// Fields of a name record, as passed to [`encode_name`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct NameParts<'a> {
    pub name: &'a str,
    /// Struct tag; `Some("")` still sets `HAS_TAG`.
    pub tag: Option<&'a str>,
    pub exported: bool,
    pub pkg_path: Option<NameOff>,
}

impl<'a> NameParts<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: &'a str) -> Self {
        self.tag = Some(tag);
        self
    }

    #[must_use]
    pub fn with_pkg_path(mut self, off: NameOff) -> Self {
        self.pkg_path = Some(off);
        self
    }

    fn flags(&self) -> NameFlags {
        let mut flags = NameFlags::empty();
        flags.set(NameFlags::EXPORTED, self.exported);
        flags.set(NameFlags::HAS_TAG, self.tag.is_some());
        flags.set(NameFlags::HAS_PKG_PATH, self.pkg_path.is_some());
        flags
    }
}

/// A decoded view of a name record.
///
/// All bounds and UTF-8 checks happen in [`NameRecord::parse`]; accessors
/// never fail afterwards.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NameRecord<'a> {
    flags: NameFlags,
    name: &'a str,
    tag: Option<&'a str>,
    pkg_path: Option<NameOff>,
    encoded_len: usize,
}

impl<'a> NameRecord<'a> {
    /// The record of a null name: empty identifier, no tag, no package.
    pub const EMPTY: NameRecord<'static> = NameRecord {
        flags: NameFlags::empty(),
        name: "",
        tag: None,
        pkg_path: None,
        encoded_len: 0,
    };

    /// Decode the record starting at `bytes[0]`.
    ///
    /// `bytes` may extend past the record; only the record itself is read.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        let truncated = |needed: usize| DecodeError::Truncated {
            needed,
            available: bytes.len(),
        };

        let raw_flags = read_u8(bytes, FLAGS).ok_or_else(|| truncated(NAME_DATA))?;
        let flags = NameFlags::from_bits_truncate(raw_flags);
        let name_len =
            usize::from(read_u16_be(bytes, NAME_LEN).ok_or_else(|| truncated(NAME_DATA))?);

        let mut pos = NAME_DATA;
        let name = utf8_field(bytes, pos, name_len, "identifier")?;
        pos += name_len;

        let tag = if flags.contains(NameFlags::HAS_TAG) {
            let tag_len = usize::from(read_u16_be(bytes, pos).ok_or_else(|| truncated(pos + 2))?);
            pos += 2;
            let tag = utf8_field(bytes, pos, tag_len, "tag")?;
            pos += tag_len;
            Some(tag)
        } else {
            None
        };

        let pkg_path = if flags.contains(NameFlags::HAS_PKG_PATH) {
            let off = read_i32(bytes, pos).ok_or_else(|| truncated(pos + 4))?;
            pos += 4;
            Some(NameOff::new(off))
        } else {
            None
        };

        Ok(Self {
            flags,
            name,
            tag,
            pkg_path,
            encoded_len: pos,
        })
    }

    #[inline]
    pub fn flags(&self) -> NameFlags {
        self.flags
    }

    #[inline]
    pub fn is_exported(&self) -> bool {
        self.flags.contains(NameFlags::EXPORTED)
    }

    #[inline]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The tag, or `""` when the record has none.
    #[inline]
    pub fn tag(&self) -> &'a str {
        self.tag.unwrap_or("")
    }

    /// Raw package-path back-reference, if the record carries one.
    #[inline]
    pub fn pkg_path_off(&self) -> Option<NameOff> {
        self.pkg_path
    }

    /// Number of bytes the record occupies.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    /// The fields needed to re-encode this record byte-for-byte.
    pub fn parts(&self) -> NameParts<'a> {
        NameParts {
            name: self.name,
            tag: self.tag,
            exported: self.is_exported(),
            pkg_path: self.pkg_path,
        }
    }
}

fn utf8_field<'a>(
    bytes: &'a [u8],
    start: usize,
    len: usize,
    field: &'static str,
) -> Result<&'a str, DecodeError> {
    let end = start + len;
    let raw = bytes.get(start..end).ok_or(DecodeError::Truncated {
        needed: end,
        available: bytes.len(),
    })?;
    std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8 { field })
}

fn checked_len(field: &'static str, s: &str) -> Result<u16, EncodeError> {
    u16::try_from(s.len()).map_err(|_| EncodeError::TooLong {
        field,
        len: s.len(),
    })
}

/// Size in bytes of the record [`encode_name`] would produce.
pub fn encoded_len(parts: &NameParts<'_>) -> Result<usize, EncodeError> {
    let mut len = NAME_DATA + usize::from(checked_len("identifier", parts.name)?);
    if let Some(tag) = parts.tag {
        len += 2 + usize::from(checked_len("tag", tag)?);
    }
    if parts.pkg_path.is_some() {
        len += 4;
    }
    Ok(len)
}

/// Append the encoding of `parts` to `out`.
pub fn encode_name_into(parts: &NameParts<'_>, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    let name_len = checked_len("identifier", parts.name)?;
    let tag_len = parts.tag.map(|t| checked_len("tag", t)).transpose()?;

    out.push(parts.flags().bits());
    out.extend_from_slice(&name_len.to_be_bytes());
    out.extend_from_slice(parts.name.as_bytes());
    if let (Some(tag), Some(tag_len)) = (parts.tag, tag_len) {
        out.extend_from_slice(&tag_len.to_be_bytes());
        out.extend_from_slice(tag.as_bytes());
    }
    if let Some(off) = parts.pkg_path {
        out.extend_from_slice(&off.raw().to_le_bytes());
    }
    Ok(())
}

/// Encode a name record.
pub fn encode_name(parts: &NameParts<'_>) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(encoded_len(parts)?);
    encode_name_into(parts, &mut out)?;
    Ok(out)
}
