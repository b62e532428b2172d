use typelink_abi::layout::{method, uncommon};
use typelink_abi::{Addr, NameOff, TextOff, TypeOff};

use super::raw::Raw;
use super::{Name, Type};

/// Uncommon trailer: package path and method table of a named type or a
/// type with methods.
#[derive(Copy, Clone)]
pub struct Uncommon<'rt> {
    typ: Type<'rt>,
    raw: Raw<'rt>,
}

impl<'rt> Uncommon<'rt> {
    pub(crate) fn new(typ: Type<'rt>, raw: Raw<'rt>) -> Self {
        Self { typ, raw }
    }

    pub fn addr(&self) -> Addr {
        self.raw.addr
    }

    pub fn pkg_path_off(&self) -> NameOff {
        NameOff::new(self.raw.i32(uncommon::PKG_PATH))
    }

    pub fn pkg_path(&self) -> &'rt str {
        self.typ.name_off(self.pkg_path_off()).name()
    }

    /// Number of methods.
    pub fn mcount(&self) -> u16 {
        self.raw.u16(uncommon::MCOUNT)
    }

    /// Number of leading exported methods.
    pub fn xcount(&self) -> u16 {
        self.raw.u16(uncommon::XCOUNT)
    }

    /// Offset from this trailer to the method table.
    pub fn moff(&self) -> u32 {
        self.raw.u32(uncommon::MOFF)
    }

    pub fn methods(&self) -> impl ExactSizeIterator<Item = Method<'rt>> {
        self.method_iter(self.mcount())
    }

    pub fn exported_methods(&self) -> impl ExactSizeIterator<Item = Method<'rt>> {
        self.method_iter(self.xcount().min(self.mcount()))
    }

    fn method_iter(&self, count: u16) -> impl ExactSizeIterator<Item = Method<'rt>> {
        let typ = self.typ;
        let table = self.raw.offset(self.moff() as usize);
        (0..usize::from(count)).map(move |i| Method {
            typ,
            raw: table.offset(i * method::SIZE),
        })
    }
}

/// Method table entry.
#[derive(Copy, Clone)]
pub struct Method<'rt> {
    typ: Type<'rt>,
    raw: Raw<'rt>,
}

impl<'rt> Method<'rt> {
    pub fn name_off(&self) -> NameOff {
        NameOff::new(self.raw.i32(method::NAME))
    }

    pub fn name(&self) -> Name<'rt> {
        self.typ.name_off(self.name_off())
    }

    pub fn mtyp_off(&self) -> TypeOff {
        TypeOff::new(self.raw.i32(method::MTYP))
    }

    /// Method signature without the receiver; `None` when the toolchain left
    /// it out.
    pub fn typ(&self) -> Option<Type<'rt>> {
        self.typ.type_off(self.mtyp_off())
    }

    pub fn ifn_off(&self) -> TextOff {
        TextOff::new(self.raw.i32(method::IFN))
    }

    pub fn tfn_off(&self) -> TextOff {
        TextOff::new(self.raw.i32(method::TFN))
    }

    /// Code used when calling through an interface.
    pub fn ifn(&self) -> Addr {
        self.typ.text_off(self.ifn_off())
    }

    /// Code used for direct calls.
    pub fn tfn(&self) -> Addr {
        self.typ.text_off(self.tfn_off())
    }
}
