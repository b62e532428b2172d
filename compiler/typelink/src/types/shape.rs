//! Kind-specific views of a descriptor's trailer.

use typelink_abi::layout::{field, func_params_offset, imethod, trailer, PTR_SIZE, VARIADIC_FLAG};
use typelink_abi::{Addr, ChanDir, MapFlags, NameOff, TypeOff};

use super::raw::Raw;
use super::{Name, Type};
use crate::Runtime;

/// A descriptor's trailer, selected by its kind.
#[derive(Copy, Clone, Debug)]
pub enum Shape<'rt> {
    /// Booleans, numbers, strings and unsafe pointers carry no trailer.
    Basic,
    Array(ArrayType<'rt>),
    Chan(ChanType<'rt>),
    Func(FuncType<'rt>),
    Interface(InterfaceType<'rt>),
    Map(MapType<'rt>),
    Ptr(PtrType<'rt>),
    Slice(SliceType<'rt>),
    Struct(StructType<'rt>),
}

macro_rules! trailer_view {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name<'rt> {
            typ: Type<'rt>,
        }

        impl<'rt> $name<'rt> {
            pub(crate) fn new(typ: Type<'rt>) -> Self {
                Self { typ }
            }

            /// The descriptor this trailer belongs to.
            pub fn typ(&self) -> Type<'rt> {
                self.typ
            }
        }
    };
}

trailer_view!(ArrayType);
trailer_view!(ChanType);
trailer_view!(
    /// Function signature. Parameters and results live inline after the
    /// trailer (and after the uncommon trailer when there is one).
    FuncType
);
trailer_view!(InterfaceType);
trailer_view!(MapType);
trailer_view!(PtrType);
trailer_view!(SliceType);
trailer_view!(StructType);

impl<'rt> ArrayType<'rt> {
    pub fn elem(&self) -> Type<'rt> {
        self.typ.required_type(trailer::ELEM)
    }

    /// The matching slice type, if the toolchain emitted one.
    pub fn slice(&self) -> Option<Type<'rt>> {
        self.typ.type_field(trailer::ARRAY_SLICE)
    }

    pub fn len(&self) -> u64 {
        self.typ.raw().u64(trailer::ARRAY_LEN)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'rt> ChanType<'rt> {
    pub fn elem(&self) -> Type<'rt> {
        self.typ.required_type(trailer::ELEM)
    }

    /// The direction word as stored.
    pub fn dir_raw(&self) -> u64 {
        self.typ.raw().u64(trailer::CHAN_DIR)
    }

    pub fn dir(&self) -> Option<ChanDir> {
        ChanDir::from_raw(self.dir_raw())
    }
}

impl<'rt> FuncType<'rt> {
    pub fn in_count(&self) -> u16 {
        self.typ.raw().u16(trailer::FUNC_IN_COUNT)
    }

    /// Result count with the variadic bit masked off.
    pub fn out_count(&self) -> u16 {
        self.raw_out_count() & !VARIADIC_FLAG
    }

    /// The stored result count, variadic bit included.
    pub fn raw_out_count(&self) -> u16 {
        self.typ.raw().u16(trailer::FUNC_OUT_COUNT)
    }

    /// Whether the last parameter is `...T`.
    pub fn is_variadic(&self) -> bool {
        self.raw_out_count() & VARIADIC_FLAG != 0
    }

    pub fn params(&self) -> impl ExactSizeIterator<Item = Type<'rt>> {
        self.inline_types(0, usize::from(self.in_count()))
    }

    pub fn results(&self) -> impl ExactSizeIterator<Item = Type<'rt>> {
        self.inline_types(usize::from(self.in_count()), usize::from(self.out_count()))
    }

    fn inline_types(&self, skip: usize, count: usize) -> impl ExactSizeIterator<Item = Type<'rt>> {
        let typ = self.typ;
        let base = func_params_offset(typ.uncommon().is_some());
        (skip..skip + count).map(move |i| typ.required_type(base + i * PTR_SIZE))
    }
}

impl<'rt> InterfaceType<'rt> {
    /// Package path of the interface's declaration, embedded as a name
    /// pointer.
    pub fn pkg_path(&self) -> Name<'rt> {
        let raw = self.typ.raw();
        raw.rt.name_at(raw.addr_field(trailer::PKG_PATH))
    }

    pub fn methods(&self) -> impl ExactSizeIterator<Item = IMethod<'rt>> {
        let raw = self.typ.raw();
        let (rt, list, len) = list_header(raw);
        (0..len).map(move |i| IMethod {
            raw: Raw::at(rt, list.add_bytes((i * imethod::SIZE) as u64)),
        })
    }
}

/// Interface method entry.
///
/// The method array may have been relocated from another module, so its
/// offsets are resolved relative to the entry's own address.
#[derive(Copy, Clone)]
pub struct IMethod<'rt> {
    raw: Raw<'rt>,
}

impl<'rt> IMethod<'rt> {
    pub fn addr(&self) -> Addr {
        self.raw.addr
    }

    pub fn name_off(&self) -> NameOff {
        NameOff::new(self.raw.i32(imethod::NAME))
    }

    pub fn name(&self) -> Name<'rt> {
        self.raw.rt.resolve_name_off(self.raw.addr, self.name_off())
    }

    pub fn typ_off(&self) -> TypeOff {
        TypeOff::new(self.raw.i32(imethod::TYP))
    }

    pub fn typ(&self) -> Option<Type<'rt>> {
        self.raw.rt.resolve_type_off(self.raw.addr, self.typ_off())
    }
}

impl<'rt> MapType<'rt> {
    pub fn key(&self) -> Type<'rt> {
        self.typ.required_type(trailer::MAP_KEY)
    }

    pub fn elem(&self) -> Type<'rt> {
        self.typ.required_type(trailer::MAP_ELEM)
    }

    /// Internal type of one hash bucket.
    pub fn bucket(&self) -> Option<Type<'rt>> {
        self.typ.type_field(trailer::MAP_BUCKET)
    }

    pub fn key_size(&self) -> u8 {
        self.typ.raw().u8(trailer::MAP_KEY_SIZE)
    }

    pub fn value_size(&self) -> u8 {
        self.typ.raw().u8(trailer::MAP_VALUE_SIZE)
    }

    pub fn bucket_size(&self) -> u16 {
        self.typ.raw().u16(trailer::MAP_BUCKET_SIZE)
    }

    pub fn flags(&self) -> MapFlags {
        MapFlags::from_bits_retain(self.typ.raw().u32(trailer::MAP_FLAGS))
    }

    pub fn indirect_key(&self) -> bool {
        self.flags().contains(MapFlags::INDIRECT_KEY)
    }

    pub fn indirect_value(&self) -> bool {
        self.flags().contains(MapFlags::INDIRECT_VALUE)
    }

    pub fn reflexive_key(&self) -> bool {
        self.flags().contains(MapFlags::REFLEXIVE_KEY)
    }

    pub fn need_key_update(&self) -> bool {
        self.flags().contains(MapFlags::NEED_KEY_UPDATE)
    }

    pub fn hash_might_panic(&self) -> bool {
        self.flags().contains(MapFlags::HASH_MIGHT_PANIC)
    }
}

impl<'rt> PtrType<'rt> {
    pub fn elem(&self) -> Type<'rt> {
        self.typ.required_type(trailer::ELEM)
    }
}

impl<'rt> SliceType<'rt> {
    pub fn elem(&self) -> Type<'rt> {
        self.typ.required_type(trailer::ELEM)
    }
}

impl<'rt> StructType<'rt> {
    pub fn pkg_path(&self) -> Name<'rt> {
        let raw = self.typ.raw();
        raw.rt.name_at(raw.addr_field(trailer::PKG_PATH))
    }

    pub fn fields(&self) -> impl ExactSizeIterator<Item = StructField<'rt>> {
        let raw = self.typ.raw();
        let (rt, list, len) = list_header(raw);
        (0..len).map(move |i| StructField {
            raw: Raw::at(rt, list.add_bytes((i * field::SIZE) as u64)),
        })
    }
}

/// Struct field entry.
#[derive(Copy, Clone)]
pub struct StructField<'rt> {
    raw: Raw<'rt>,
}

impl<'rt> StructField<'rt> {
    pub fn addr(&self) -> Addr {
        self.raw.addr
    }

    pub fn name(&self) -> Name<'rt> {
        self.raw.rt.name_at(self.raw.addr_field(field::NAME))
    }

    pub fn typ(&self) -> Type<'rt> {
        let addr = self.raw.addr_field(field::TYP);
        match self.raw.rt.type_at(addr) {
            Some(typ) => typ,
            None => self.raw.rt.fatal(&crate::ResolveError::Unmapped { addr }),
        }
    }

    /// Byte offset shifted left once, low bit set for embedded fields.
    pub fn offset_anon(&self) -> u64 {
        self.raw.u64(field::OFFSET_ANON)
    }

    pub fn offset(&self) -> u64 {
        self.offset_anon() >> 1
    }

    pub fn embedded(&self) -> bool {
        self.offset_anon() & 1 != 0
    }
}

/// Slice header of a struct's fields or an interface's methods.
fn list_header<'rt>(raw: Raw<'rt>) -> (&'rt Runtime, Addr, usize) {
    let list = raw.addr_field(trailer::LIST_PTR);
    let len = raw.len_field(trailer::LIST_LEN);
    (raw.rt, list, len)
}

impl std::fmt::Debug for IMethod<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IMethod").field("addr", &self.raw.addr).finish()
    }
}

impl std::fmt::Debug for StructField<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructField")
            .field("addr", &self.raw.addr)
            .finish()
    }
}
