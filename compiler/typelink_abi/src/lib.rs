//! Stable binary layout of typelink type metadata.
//!
//! A module embeds a read-only table of type descriptors and name records.
//! This crate owns everything about that table that does not need a live
//! runtime:
//!
//! - address and offset newtypes ([`Addr`], [`NameOff`], [`TypeOff`], [`TextOff`])
//! - the [`Kind`] tag and the flag sets stored next to it
//! - byte offsets of every header and trailer field ([`layout`])
//! - the name record codec ([`name`])
//! - an emitter that lays out whole tables ([`image`])
//!
//! Reading descriptors through resolved offsets is the job of the `typelink`
//! runtime crate.

mod addr;
mod error;
pub mod flags;
pub mod image;
mod kind;
pub mod layout;
pub mod name;

pub use addr::{Addr, NameOff, TextOff, TypeOff};
pub use error::{BuildError, DecodeError, EncodeError};
pub use flags::{ChanDir, MapFlags, NameFlags, TFlag};
pub use image::{
    FieldDef, IMethodDef, Image, ImageBuilder, MethodDef, NameDef, NameHandle, OffsetScheme,
    Placement, SectionRelative, ShapeDef, TypeDef, TypeHandle, UncommonDef,
};
pub use kind::{Kind, KIND_DIRECT_IFACE, KIND_GC_PROG, KIND_MASK};
pub use name::{encode_name, NameParts, NameRecord};
