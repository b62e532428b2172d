//! Read-only views of type descriptors.
//!
//! A [`Type`] is an address plus the bytes behind it, borrowed from the
//! runtime that resolved it. Two views are the same type exactly when their
//! addresses are equal; after [`Runtime::link_types`] that holds across
//! modules too.

mod name;
mod raw;
mod shape;
mod uncommon;

use std::fmt;
use std::hash::{Hash, Hasher};

use typelink_abi::layout::{header, uncommon_offset, HEADER_SIZE};
use typelink_abi::{Addr, DecodeError, Kind, NameOff, TFlag, TextOff, TypeOff, KIND_MASK};

use crate::{ResolveError, Runtime};
use raw::Raw;

pub use name::Name;
pub use shape::{
    ArrayType, ChanType, FuncType, IMethod, InterfaceType, MapType, PtrType, Shape, SliceType,
    StructField, StructType,
};
pub use uncommon::{Method, Uncommon};

/// A type descriptor.
#[derive(Copy, Clone)]
pub struct Type<'rt> {
    raw: Raw<'rt>,
    kind: Kind,
}

impl<'rt> Type<'rt> {
    /// Validate the header and the fixed-size trailers at `addr`.
    pub(crate) fn new(rt: &'rt Runtime, addr: Addr, bytes: &'rt [u8]) -> Result<Self, ResolveError> {
        let truncated = |needed: usize| ResolveError::Malformed {
            addr,
            source: DecodeError::Truncated {
                needed,
                available: bytes.len(),
            },
        };
        if bytes.len() < HEADER_SIZE {
            return Err(truncated(HEADER_SIZE));
        }
        let raw_kind = bytes[header::KIND];
        let kind = Kind::from_raw(raw_kind).ok_or(ResolveError::ImpossibleKind {
            raw: raw_kind & KIND_MASK,
        })?;
        let tflag = TFlag::from_bits_truncate(bytes[header::TFLAG]);
        let mut needed = uncommon_offset(kind);
        if tflag.contains(TFlag::UNCOMMON) {
            needed += typelink_abi::layout::uncommon::SIZE;
        }
        if bytes.len() < needed {
            return Err(truncated(needed));
        }
        Ok(Self {
            raw: Raw { rt, addr, bytes },
            kind,
        })
    }

    pub(crate) fn raw(&self) -> Raw<'rt> {
        self.raw
    }

    pub fn runtime(&self) -> &'rt Runtime {
        self.raw.rt
    }

    pub fn addr(&self) -> Addr {
        self.raw.addr
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Attribute bits stored above the kind in the kind byte.
    pub fn kind_attrs(&self) -> u8 {
        self.raw.u8(header::KIND) & !KIND_MASK
    }

    pub fn size(&self) -> u64 {
        self.raw.u64(header::SIZE)
    }

    /// Prefix of the value that can contain pointers.
    pub fn ptrdata(&self) -> u64 {
        self.raw.u64(header::PTRDATA)
    }

    pub fn hash(&self) -> u32 {
        self.raw.u32(header::HASH)
    }

    pub fn tflag(&self) -> TFlag {
        TFlag::from_bits_truncate(self.raw.u8(header::TFLAG))
    }

    pub fn align(&self) -> u8 {
        self.raw.u8(header::ALIGN)
    }

    pub fn field_align(&self) -> u8 {
        self.raw.u8(header::FIELD_ALIGN)
    }

    /// Equality and hashing routines of the type's values.
    pub fn alg(&self) -> Addr {
        self.raw.addr_field(header::ALG)
    }

    /// Pointer bitmap or collector program.
    pub fn gcdata(&self) -> Addr {
        self.raw.addr_field(header::GCDATA)
    }

    pub fn str_off(&self) -> NameOff {
        NameOff::new(self.raw.i32(header::STR))
    }

    pub fn ptr_to_this_off(&self) -> TypeOff {
        TypeOff::new(self.raw.i32(header::PTR_TO_THIS))
    }

    /// The `*T` descriptor, if one was emitted.
    pub fn ptr_to_this(&self) -> Option<Type<'rt>> {
        self.type_off(self.ptr_to_this_off())
    }

    /// Textual form, e.g. `map[string]int` or `pkg.Foo`.
    pub fn string(&self) -> &'rt str {
        let s = self.name_off(self.str_off()).name();
        if self.tflag().contains(TFlag::EXTRA_STAR) {
            s.strip_prefix('*').unwrap_or(s)
        } else {
            s
        }
    }

    /// Declared name without its package qualifier; empty for unnamed types.
    pub fn name(&self) -> &'rt str {
        if !self.tflag().contains(TFlag::NAMED) {
            return "";
        }
        let s = self.string();
        match s.rfind('.') {
            Some(dot) => &s[dot + 1..],
            None => s,
        }
    }

    /// Package the type was defined in. Struct and interface types carry it
    /// in their trailer, even when that is null; other types only in their
    /// uncommon trailer.
    pub fn pkg_path(&self) -> &'rt str {
        match self.shape() {
            Shape::Struct(st) => st.pkg_path().name(),
            Shape::Interface(it) => it.pkg_path().name(),
            _ => self.uncommon().map_or("", |u| u.pkg_path()),
        }
    }

    pub fn uncommon(&self) -> Option<Uncommon<'rt>> {
        if !self.tflag().contains(TFlag::UNCOMMON) {
            return None;
        }
        Some(Uncommon::new(
            *self,
            self.raw.offset(uncommon_offset(self.kind)),
        ))
    }

    pub fn shape(&self) -> Shape<'rt> {
        let t = *self;
        match self.kind {
            Kind::Array => Shape::Array(ArrayType::new(t)),
            Kind::Chan => Shape::Chan(ChanType::new(t)),
            Kind::Func => Shape::Func(FuncType::new(t)),
            Kind::Interface => Shape::Interface(InterfaceType::new(t)),
            Kind::Map => Shape::Map(MapType::new(t)),
            Kind::Ptr => Shape::Ptr(PtrType::new(t)),
            Kind::Slice => Shape::Slice(SliceType::new(t)),
            Kind::Struct => Shape::Struct(StructType::new(t)),
            _ => Shape::Basic,
        }
    }

    pub fn as_array(&self) -> Option<ArrayType<'rt>> {
        match self.shape() {
            Shape::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_chan(&self) -> Option<ChanType<'rt>> {
        match self.shape() {
            Shape::Chan(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<FuncType<'rt>> {
        match self.shape() {
            Shape::Func(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<InterfaceType<'rt>> {
        match self.shape() {
            Shape::Interface(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<MapType<'rt>> {
        match self.shape() {
            Shape::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ptr(&self) -> Option<PtrType<'rt>> {
        match self.shape() {
            Shape::Ptr(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<SliceType<'rt>> {
        match self.shape() {
            Shape::Slice(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<StructType<'rt>> {
        match self.shape() {
            Shape::Struct(v) => Some(v),
            _ => None,
        }
    }

    /// Resolve a name offset stored in this descriptor.
    pub fn name_off(&self, off: NameOff) -> Name<'rt> {
        self.raw.rt.resolve_name_off(self.raw.addr, off)
    }

    /// Resolve a type offset stored in this descriptor.
    pub fn type_off(&self, off: TypeOff) -> Option<Type<'rt>> {
        self.raw.rt.resolve_type_off(self.raw.addr, off)
    }

    /// Resolve a code offset stored in this descriptor.
    pub fn text_off(&self, off: TextOff) -> Addr {
        self.raw.rt.resolve_text_off(self.raw.addr, off)
    }

    /// Nullable descriptor pointer at `off`.
    fn type_field(&self, off: usize) -> Option<Type<'rt>> {
        self.raw.rt.type_at(self.raw.addr_field(off))
    }

    /// Descriptor pointer at `off` that the format never leaves null.
    fn required_type(&self, off: usize) -> Type<'rt> {
        let addr = self.raw.addr_field(off);
        match self.raw.rt.type_at(addr) {
            Some(t) => t,
            None => self.raw.rt.fatal(&ResolveError::Unmapped { addr }),
        }
    }
}

impl PartialEq for Type<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.raw.addr == other.raw.addr
    }
}

impl Eq for Type<'_> {}

impl Hash for Type<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.addr.hash(state);
    }
}

impl fmt::Debug for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({}, {:?})", self.raw.addr, self.kind)
    }
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.string())
    }
}
