//! Descriptor definitions consumed by [`ImageBuilder`](super::ImageBuilder).

use crate::{Addr, ChanDir, Kind, MapFlags, TFlag, TextOff};

/// Handle to a name added to an image builder.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NameHandle(pub(super) u32);

/// Handle to a type declared in an image builder.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeHandle(pub(super) u32);

impl NameHandle {
    #[inline]
    pub(super) fn index(self) -> usize {
        self.0 as usize
    }
}

impl TypeHandle {
    #[inline]
    pub(super) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A name record to emit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameDef {
    pub name: String,
    pub tag: Option<String>,
    pub exported: bool,
    /// Package path, emitted as a back-reference offset.
    pub pkg_path: Option<NameHandle>,
}

impl NameDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: None,
            exported: false,
            pkg_path: None,
        }
    }

    #[must_use]
    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn with_pkg_path(mut self, pkg_path: NameHandle) -> Self {
        self.pkg_path = Some(pkg_path);
        self
    }
}

/// Entry of an uncommon trailer's method table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MethodDef {
    pub name: NameHandle,
    pub typ: Option<TypeHandle>,
    pub ifn: TextOff,
    pub tfn: TextOff,
}

/// Uncommon trailer contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UncommonDef {
    pub pkg_path: Option<NameHandle>,
    /// Methods sorted by name; exported ones first.
    pub methods: Vec<MethodDef>,
    /// Number of leading exported methods.
    pub exported: u16,
}

impl UncommonDef {
    pub fn new(pkg_path: Option<NameHandle>) -> Self {
        Self {
            pkg_path,
            methods: Vec::new(),
            exported: 0,
        }
    }

    #[must_use]
    pub fn with_methods(mut self, methods: Vec<MethodDef>, exported: u16) -> Self {
        self.methods = methods;
        self.exported = exported;
        self
    }
}

/// Interface method entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IMethodDef {
    pub name: NameHandle,
    pub typ: TypeHandle,
}

/// Struct field entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: NameHandle,
    pub typ: TypeHandle,
    pub offset: u64,
    pub embedded: bool,
}

impl FieldDef {
    pub fn new(name: NameHandle, typ: TypeHandle, offset: u64) -> Self {
        Self {
            name,
            typ,
            offset,
            embedded: false,
        }
    }

    #[must_use]
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    /// Packed `offset << 1 | embedded`.
    pub fn offset_anon(&self) -> u64 {
        (self.offset << 1) | u64::from(self.embedded)
    }
}

/// Kind-specific trailer contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeDef {
    /// No trailer: booleans, numbers, strings, unsafe pointers.
    Basic,
    Array {
        elem: TypeHandle,
        slice: Option<TypeHandle>,
        len: u64,
    },
    Chan {
        elem: TypeHandle,
        dir: ChanDir,
    },
    Func {
        params: Vec<TypeHandle>,
        results: Vec<TypeHandle>,
        variadic: bool,
    },
    Interface {
        pkg_path: Option<NameHandle>,
        methods: Vec<IMethodDef>,
    },
    Map {
        key: TypeHandle,
        elem: TypeHandle,
        bucket: Option<TypeHandle>,
        key_size: u8,
        value_size: u8,
        bucket_size: u16,
        flags: MapFlags,
    },
    Ptr {
        elem: TypeHandle,
    },
    Slice {
        elem: TypeHandle,
    },
    Struct {
        pkg_path: Option<NameHandle>,
        fields: Vec<FieldDef>,
    },
}

impl ShapeDef {
    /// The kind this trailer belongs to; `None` for [`ShapeDef::Basic`].
    pub fn kind(&self) -> Option<Kind> {
        Some(match self {
            ShapeDef::Basic => return None,
            ShapeDef::Array { .. } => Kind::Array,
            ShapeDef::Chan { .. } => Kind::Chan,
            ShapeDef::Func { .. } => Kind::Func,
            ShapeDef::Interface { .. } => Kind::Interface,
            ShapeDef::Map { .. } => Kind::Map,
            ShapeDef::Ptr { .. } => Kind::Ptr,
            ShapeDef::Slice { .. } => Kind::Slice,
            ShapeDef::Struct { .. } => Kind::Struct,
        })
    }
}

/// A type descriptor to emit.
///
/// Constructors pick the kind from the shape; the `with_*` methods fill in
/// header fields that default to zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDef {
    pub(super) kind: Kind,
    pub(super) kind_attrs: u8,
    pub(super) str: NameHandle,
    pub(super) tflag: TFlag,
    pub(super) size: u64,
    pub(super) ptrdata: u64,
    pub(super) hash: Option<u32>,
    pub(super) align: u8,
    pub(super) field_align: u8,
    pub(super) alg: Addr,
    pub(super) gcdata: Addr,
    pub(super) ptr_to_this: Option<TypeHandle>,
    pub(super) uncommon: Option<UncommonDef>,
    pub(super) shape: ShapeDef,
    pub(super) typelink: bool,
}

impl TypeDef {
    fn with_shape(kind: Kind, str: NameHandle, shape: ShapeDef) -> Self {
        Self {
            kind,
            kind_attrs: 0,
            str,
            tflag: TFlag::empty(),
            size: 0,
            ptrdata: 0,
            hash: None,
            align: 1,
            field_align: 1,
            alg: Addr::NULL,
            gcdata: Addr::NULL,
            ptr_to_this: None,
            uncommon: None,
            shape,
            typelink: true,
        }
    }

    /// A trailer-less kind (bool, numbers, string, unsafe pointer).
    pub fn basic(kind: Kind, str: NameHandle) -> Self {
        Self::with_shape(kind, str, ShapeDef::Basic)
    }

    pub fn ptr(str: NameHandle, elem: TypeHandle) -> Self {
        Self::with_shape(Kind::Ptr, str, ShapeDef::Ptr { elem }).with_size(8, 8)
    }

    pub fn slice(str: NameHandle, elem: TypeHandle) -> Self {
        Self::with_shape(Kind::Slice, str, ShapeDef::Slice { elem }).with_size(24, 8)
    }

    pub fn array(str: NameHandle, elem: TypeHandle, len: u64) -> Self {
        Self::with_shape(
            Kind::Array,
            str,
            ShapeDef::Array {
                elem,
                slice: None,
                len,
            },
        )
    }

    pub fn chan(str: NameHandle, elem: TypeHandle, dir: ChanDir) -> Self {
        Self::with_shape(Kind::Chan, str, ShapeDef::Chan { elem, dir }).with_size(8, 8)
    }

    pub fn func(
        str: NameHandle,
        params: Vec<TypeHandle>,
        results: Vec<TypeHandle>,
        variadic: bool,
    ) -> Self {
        Self::with_shape(
            Kind::Func,
            str,
            ShapeDef::Func {
                params,
                results,
                variadic,
            },
        )
        .with_size(8, 8)
    }

    pub fn map(str: NameHandle, key: TypeHandle, elem: TypeHandle) -> Self {
        Self::with_shape(
            Kind::Map,
            str,
            ShapeDef::Map {
                key,
                elem,
                bucket: None,
                key_size: 0,
                value_size: 0,
                bucket_size: 0,
                flags: MapFlags::empty(),
            },
        )
        .with_size(8, 8)
    }

    pub fn structure(str: NameHandle, pkg_path: Option<NameHandle>, fields: Vec<FieldDef>) -> Self {
        Self::with_shape(Kind::Struct, str, ShapeDef::Struct { pkg_path, fields })
    }

    pub fn interface(
        str: NameHandle,
        pkg_path: Option<NameHandle>,
        methods: Vec<IMethodDef>,
    ) -> Self {
        Self::with_shape(
            Kind::Interface,
            str,
            ShapeDef::Interface { pkg_path, methods },
        )
        .with_size(16, 8)
    }

    /// Replace the trailer. The kind follows the new shape.
    #[must_use]
    pub fn with_trailer(mut self, shape: ShapeDef) -> Self {
        if let Some(kind) = shape.kind() {
            self.kind = kind;
        }
        self.shape = shape;
        self
    }

    #[must_use]
    pub fn named(mut self) -> Self {
        self.tflag |= TFlag::NAMED;
        self
    }

    #[must_use]
    pub fn extra_star(mut self) -> Self {
        self.tflag |= TFlag::EXTRA_STAR;
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: u64, align: u8) -> Self {
        self.size = size;
        self.align = align;
        self.field_align = align;
        self
    }

    #[must_use]
    pub fn with_ptrdata(mut self, ptrdata: u64) -> Self {
        self.ptrdata = ptrdata;
        self
    }

    /// Override the structural hash (computed from kind and name otherwise).
    #[must_use]
    pub fn with_hash(mut self, hash: u32) -> Self {
        self.hash = Some(hash);
        self
    }

    /// Raw attribute bits stored above the kind in the kind byte.
    #[must_use]
    pub fn with_kind_attrs(mut self, attrs: u8) -> Self {
        self.kind_attrs = attrs & !crate::KIND_MASK;
        self
    }

    #[must_use]
    pub fn with_gc(mut self, alg: Addr, gcdata: Addr) -> Self {
        self.alg = alg;
        self.gcdata = gcdata;
        self
    }

    #[must_use]
    pub fn with_ptr_to_this(mut self, ptr: TypeHandle) -> Self {
        self.ptr_to_this = Some(ptr);
        self
    }

    #[must_use]
    pub fn with_uncommon(mut self, uncommon: UncommonDef) -> Self {
        self.uncommon = Some(uncommon);
        self
    }

    /// Leave this type out of the image's typelinks table.
    #[must_use]
    pub fn without_typelink(mut self) -> Self {
        self.typelink = false;
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn shape(&self) -> &ShapeDef {
        &self.shape
    }
}
