//! Image emitter.
//!
//! [`ImageBuilder`] lays out name records and type descriptors the way the
//! toolchain does: an 8-byte zero pad (offset 0 always means "none"), then
//! every name record, then the descriptors at 8-byte alignment. Each
//! descriptor is followed by its kind trailer, optional uncommon trailer,
//! inline function parameters, method table and field/interface-method
//! array.
//!
//! Types may be declared before they are defined, so self-referential and
//! mutually referential descriptors are expressible. Names and types that
//! already live elsewhere are added with [`ImageBuilder::extern_name`] /
//! [`ImageBuilder::extern_type`].
//!
//! How a 32-bit offset is derived from a target address is left to an
//! [`OffsetScheme`]: module images use [`SectionRelative`]; the runtime
//! plugs in its object registry for descriptors synthesized after load.

mod def;

use std::hash::Hasher;

use rustc_hash::FxHasher;

use crate::error::{BuildError, EncodeError};
use crate::layout::{
    self, align_up, field, header, imethod, method, trailer, uncommon, write_i32, write_u16,
    write_u32, write_u64, write_u8, PTR_SIZE,
};
use crate::name::{encode_name_into, encoded_len, NameParts};
use crate::{Addr, Kind, NameOff, TFlag, TypeOff};

pub use def::{
    FieldDef, IMethodDef, MethodDef, NameDef, NameHandle, ShapeDef, TypeDef, TypeHandle,
    UncommonDef,
};

/// Bytes reserved at the start of every image.
const RESERVED: usize = PTR_SIZE;

/// Turns target addresses into stored 32-bit offsets.
pub trait OffsetScheme {
    fn name_off(&mut self, addr: Addr) -> Result<NameOff, BuildError>;
    fn type_off(&mut self, addr: Addr) -> Result<TypeOff, BuildError>;
}

/// Offsets relative to the start of the image's own section.
#[derive(Copy, Clone, Debug)]
pub struct SectionRelative {
    base: Addr,
    len: u64,
}

impl SectionRelative {
    pub fn new(base: Addr, len: u64) -> Self {
        Self { base, len }
    }

    fn relative(&self, what: &'static str, addr: Addr) -> Result<i32, BuildError> {
        match addr.offset_from(self.base) {
            Some(delta) if delta < self.len => i32::try_from(delta).map_err(|_| {
                BuildError::TooLarge {
                    len: usize::try_from(self.len).unwrap_or(usize::MAX),
                }
            }),
            _ => Err(BuildError::NotSectionRelative {
                what,
                addr,
                base: self.base,
            }),
        }
    }
}

impl OffsetScheme for SectionRelative {
    fn name_off(&mut self, addr: Addr) -> Result<NameOff, BuildError> {
        self.relative("name", addr).map(NameOff::new)
    }

    fn type_off(&mut self, addr: Addr) -> Result<TypeOff, BuildError> {
        self.relative("type", addr).map(TypeOff::new)
    }
}

enum NameSlot {
    Local(NameDef),
    Extern(Addr),
}

enum TypeSlot {
    Declared,
    Defined(Box<TypeDef>),
    Extern(Addr),
}

/// Where one descriptor and its arrays land, relative to the descriptor.
#[derive(Copy, Clone, Debug)]
struct TypePlan {
    pos: usize,
    uncommon: usize,
    params: usize,
    methods: usize,
    list: usize,
}

struct Plan {
    names: Vec<Option<usize>>,
    types: Vec<Option<TypePlan>>,
    len: usize,
}

/// Collects names and type definitions and lays them out as one image.
#[derive(Default)]
pub struct ImageBuilder {
    names: Vec<NameSlot>,
    types: Vec<TypeSlot>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name record to the image.
    pub fn name(&mut self, def: NameDef) -> NameHandle {
        self.push_name(NameSlot::Local(def))
    }

    /// Refer to a name record that already lives at `addr`.
    pub fn extern_name(&mut self, addr: Addr) -> NameHandle {
        self.push_name(NameSlot::Extern(addr))
    }

    /// Reserve a type handle to be filled in by [`ImageBuilder::define`].
    pub fn declare(&mut self) -> TypeHandle {
        self.push_type(TypeSlot::Declared)
    }

    pub fn define(&mut self, handle: TypeHandle, def: TypeDef) -> Result<(), BuildError> {
        let index = handle.index();
        match self.types.get_mut(index) {
            Some(slot @ TypeSlot::Declared) => {
                *slot = TypeSlot::Defined(Box::new(def));
                Ok(())
            }
            Some(_) => Err(BuildError::Redefined { index }),
            None => Err(BuildError::Undefined { index }),
        }
    }

    /// Declare and define in one step.
    pub fn add(&mut self, def: TypeDef) -> TypeHandle {
        self.push_type(TypeSlot::Defined(Box::new(def)))
    }

    /// Refer to a descriptor that already lives at `addr`.
    pub fn extern_type(&mut self, addr: Addr) -> TypeHandle {
        self.push_type(TypeSlot::Extern(addr))
    }

    fn push_name(&mut self, slot: NameSlot) -> NameHandle {
        let handle = NameHandle(index_u32(self.names.len()));
        self.names.push(slot);
        handle
    }

    fn push_type(&mut self, slot: TypeSlot) -> TypeHandle {
        let handle = TypeHandle(index_u32(self.types.len()));
        self.types.push(slot);
        handle
    }

    /// Size in bytes of the image [`ImageBuilder::finish`] would produce.
    pub fn image_len(&self) -> Result<usize, BuildError> {
        self.plan().map(|plan| plan.len)
    }

    /// Lay the image out at `base` with section-relative offsets.
    pub fn finish(self, base: Addr) -> Result<Image, BuildError> {
        let len = self.image_len()?;
        let mut scheme = SectionRelative::new(base, len as u64);
        self.finish_with(base, &mut scheme)
    }

    /// Lay the image out at `base`, deriving every stored offset from
    /// `scheme`.
    pub fn finish_with(
        self,
        base: Addr,
        scheme: &mut impl OffsetScheme,
    ) -> Result<Image, BuildError> {
        let plan = self.plan()?;
        let at = |pos: usize| base.add_bytes(pos as u64);

        let name_addrs: Vec<Addr> = self
            .names
            .iter()
            .zip(&plan.names)
            .map(|(slot, pos)| match (slot, pos) {
                (NameSlot::Extern(addr), _) => *addr,
                (NameSlot::Local(_), pos) => pos.map_or(Addr::NULL, at),
            })
            .collect();
        let type_addrs: Vec<Addr> = self
            .types
            .iter()
            .zip(&plan.types)
            .map(|(slot, tp)| match slot {
                TypeSlot::Extern(addr) => *addr,
                _ => tp.map_or(Addr::NULL, |tp| at(tp.pos)),
            })
            .collect();

        let texts: Vec<Option<&str>> = self
            .names
            .iter()
            .map(|slot| match slot {
                NameSlot::Local(def) => Some(def.name.as_str()),
                NameSlot::Extern(_) => None,
            })
            .collect();

        let mut emit = Emitter {
            buf: vec![0; plan.len],
            texts: &texts,
            names: &name_addrs,
            types: &type_addrs,
            scheme,
        };

        for (slot, pos) in self.names.iter().zip(&plan.names) {
            if let (NameSlot::Local(def), Some(pos)) = (slot, pos) {
                emit.name(def, *pos)?;
            }
        }

        let mut typelinks = Vec::new();
        for (slot, tp) in self.types.iter().zip(&plan.types) {
            if let (TypeSlot::Defined(def), Some(tp)) = (slot, tp) {
                emit.descriptor(def, *tp, base)?;
                if def.typelink {
                    let off = i32::try_from(tp.pos)
                        .map_err(|_| BuildError::TooLarge { len: plan.len })?;
                    typelinks.push(TypeOff::new(off));
                }
            }
        }

        let bytes = emit.buf;
        Ok(Image {
            base,
            bytes,
            typelinks,
            placement: Placement {
                names: name_addrs,
                types: type_addrs,
            },
        })
    }

    fn plan(&self) -> Result<Plan, BuildError> {
        let mut pos = RESERVED;

        let mut names = Vec::with_capacity(self.names.len());
        for slot in &self.names {
            match slot {
                NameSlot::Local(def) => {
                    names.push(Some(pos));
                    pos += encoded_len(&parts(def, def.pkg_path.map(|_| NameOff::NONE)))?;
                }
                NameSlot::Extern(_) => names.push(None),
            }
        }

        pos = align_up(pos, PTR_SIZE);
        let mut types = Vec::with_capacity(self.types.len());
        for (index, slot) in self.types.iter().enumerate() {
            match slot {
                TypeSlot::Declared => return Err(BuildError::Undefined { index }),
                TypeSlot::Extern(_) => types.push(None),
                TypeSlot::Defined(def) => {
                    let (tp, size) = plan_type(index, def, pos)?;
                    types.push(Some(tp));
                    pos = align_up(pos + size, PTR_SIZE);
                }
            }
        }

        if i32::try_from(pos).is_err() {
            return Err(BuildError::TooLarge { len: pos });
        }
        Ok(Plan {
            names,
            types,
            len: pos,
        })
    }
}

fn index_u32(len: usize) -> u32 {
    match u32::try_from(len) {
        Ok(index) => index,
        Err(_) => panic!("image builder holds more than u32::MAX entries"),
    }
}

fn parts(def: &NameDef, pkg_path: Option<NameOff>) -> NameParts<'_> {
    NameParts {
        name: &def.name,
        tag: def.tag.as_deref(),
        exported: def.exported,
        pkg_path,
    }
}

fn shape_label(shape: &ShapeDef) -> &'static str {
    shape.kind().map_or("basic", Kind::name)
}

/// Place one descriptor at `pos`; returns its plan and byte size.
fn plan_type(index: usize, def: &TypeDef, pos: usize) -> Result<(TypePlan, usize), BuildError> {
    let matches = match def.shape.kind() {
        Some(kind) => kind == def.kind,
        None => !def.kind.has_trailer(),
    };
    if !matches {
        return Err(BuildError::ShapeMismatch {
            index,
            kind: def.kind,
            shape: shape_label(&def.shape),
        });
    }

    let uncommon_at = layout::uncommon_offset(def.kind);
    let mut rel = uncommon_at;
    if def.uncommon.is_some() {
        rel += uncommon::SIZE;
    }

    let params = rel;
    if let ShapeDef::Func {
        params: ins,
        results: outs,
        ..
    } = &def.shape
    {
        if u16::try_from(ins.len()).is_err() {
            return Err(EncodeError::TooManyParams {
                what: "inputs",
                count: ins.len(),
            }
            .into());
        }
        if outs.len() >= usize::from(layout::VARIADIC_FLAG) {
            return Err(EncodeError::TooManyParams {
                what: "outputs",
                count: outs.len(),
            }
            .into());
        }
        rel += PTR_SIZE * (ins.len() + outs.len());
    }

    let methods = rel;
    if let Some(u) = &def.uncommon {
        if u16::try_from(u.methods.len()).is_err() {
            return Err(EncodeError::TooMany {
                what: "method",
                count: u.methods.len(),
            }
            .into());
        }
        rel += method::SIZE * u.methods.len();
    }

    let list = align_up(rel, PTR_SIZE);
    match &def.shape {
        ShapeDef::Struct { fields, .. } => rel = list + field::SIZE * fields.len(),
        ShapeDef::Interface { methods, .. } => rel = list + imethod::SIZE * methods.len(),
        _ => {}
    }

    Ok((
        TypePlan {
            pos,
            uncommon: uncommon_at,
            params,
            methods,
            list,
        },
        rel,
    ))
}

/// Structural hash used when a definition does not supply one.
fn default_hash(kind: Kind, text: Option<&str>) -> u32 {
    let mut hasher = FxHasher::default();
    hasher.write_u8(kind.to_u8());
    if let Some(text) = text {
        hasher.write(text.as_bytes());
    }
    let wide = hasher.finish();
    #[expect(clippy::cast_possible_truncation, reason = "fold to 32 bits")]
    let folded = (wide ^ (wide >> 32)) as u32;
    folded
}

struct Emitter<'a, S> {
    buf: Vec<u8>,
    texts: &'a [Option<&'a str>],
    names: &'a [Addr],
    types: &'a [Addr],
    scheme: &'a mut S,
}

impl<'a, S: OffsetScheme> Emitter<'a, S> {
    fn name_addr(&self, h: NameHandle) -> Result<Addr, BuildError> {
        self.names
            .get(h.index())
            .copied()
            .ok_or(BuildError::Undefined { index: h.index() })
    }

    fn type_addr(&self, h: TypeHandle) -> Result<Addr, BuildError> {
        self.types
            .get(h.index())
            .copied()
            .ok_or(BuildError::Undefined { index: h.index() })
    }

    fn opt_type_addr(&self, h: Option<TypeHandle>) -> Result<Addr, BuildError> {
        h.map_or(Ok(Addr::NULL), |h| self.type_addr(h))
    }

    fn opt_name_addr(&self, h: Option<NameHandle>) -> Result<Addr, BuildError> {
        h.map_or(Ok(Addr::NULL), |h| self.name_addr(h))
    }

    fn name_off(&mut self, h: NameHandle) -> Result<NameOff, BuildError> {
        let addr = self.name_addr(h)?;
        self.scheme.name_off(addr)
    }

    fn type_off(&mut self, h: Option<TypeHandle>) -> Result<TypeOff, BuildError> {
        match h {
            Some(h) => {
                let addr = self.type_addr(h)?;
                self.scheme.type_off(addr)
            }
            None => Ok(TypeOff::NONE),
        }
    }

    fn name(&mut self, def: &NameDef, pos: usize) -> Result<(), BuildError> {
        let pkg_path = def.pkg_path.map(|h| self.name_off(h)).transpose()?;
        let mut record = Vec::new();
        encode_name_into(&parts(def, pkg_path), &mut record)?;
        self.buf[pos..pos + record.len()].copy_from_slice(&record);
        Ok(())
    }

    fn descriptor(&mut self, def: &TypeDef, tp: TypePlan, base: Addr) -> Result<(), BuildError> {
        let at = tp.pos;
        let addr_of = |rel: usize| base.add_bytes((at + rel) as u64);

        let mut tflag = def.tflag;
        tflag.set(TFlag::UNCOMMON, def.uncommon.is_some());
        let hash = match def.hash {
            Some(hash) => hash,
            None => default_hash(def.kind, self.local_text(def.str)),
        };
        let str_off = self.name_off(def.str)?;
        let ptr_to_this = self.type_off(def.ptr_to_this)?;

        let buf = &mut self.buf;
        write_u64(buf, at + header::SIZE, def.size);
        write_u64(buf, at + header::PTRDATA, def.ptrdata);
        write_u32(buf, at + header::HASH, hash);
        write_u8(buf, at + header::TFLAG, tflag.bits());
        write_u8(buf, at + header::ALIGN, def.align);
        write_u8(buf, at + header::FIELD_ALIGN, def.field_align);
        write_u8(buf, at + header::KIND, def.kind.to_u8() | def.kind_attrs);
        write_u64(buf, at + header::ALG, def.alg.raw());
        write_u64(buf, at + header::GCDATA, def.gcdata.raw());
        write_i32(buf, at + header::STR, str_off.raw());
        write_i32(buf, at + header::PTR_TO_THIS, ptr_to_this.raw());

        match &def.shape {
            ShapeDef::Basic => {}
            ShapeDef::Ptr { elem } | ShapeDef::Slice { elem } => {
                let elem = self.type_addr(*elem)?;
                write_u64(&mut self.buf, at + trailer::ELEM, elem.raw());
            }
            ShapeDef::Array { elem, slice, len } => {
                let elem = self.type_addr(*elem)?;
                let slice = self.opt_type_addr(*slice)?;
                write_u64(&mut self.buf, at + trailer::ELEM, elem.raw());
                write_u64(&mut self.buf, at + trailer::ARRAY_SLICE, slice.raw());
                write_u64(&mut self.buf, at + trailer::ARRAY_LEN, *len);
            }
            ShapeDef::Chan { elem, dir } => {
                let elem = self.type_addr(*elem)?;
                write_u64(&mut self.buf, at + trailer::ELEM, elem.raw());
                write_u64(&mut self.buf, at + trailer::CHAN_DIR, dir.to_raw());
            }
            ShapeDef::Func {
                params,
                results,
                variadic,
            } => {
                // Counts were range-checked while planning.
                #[expect(clippy::cast_possible_truncation, reason = "checked in plan_type")]
                let (ins, mut outs) = (params.len() as u16, results.len() as u16);
                if *variadic {
                    outs |= layout::VARIADIC_FLAG;
                }
                write_u16(&mut self.buf, at + trailer::FUNC_IN_COUNT, ins);
                write_u16(&mut self.buf, at + trailer::FUNC_OUT_COUNT, outs);
                for (i, h) in params.iter().chain(results).enumerate() {
                    let addr = self.type_addr(*h)?;
                    write_u64(&mut self.buf, at + tp.params + i * PTR_SIZE, addr.raw());
                }
            }
            ShapeDef::Map {
                key,
                elem,
                bucket,
                key_size,
                value_size,
                bucket_size,
                flags,
            } => {
                let key = self.type_addr(*key)?;
                let elem = self.type_addr(*elem)?;
                let bucket = self.opt_type_addr(*bucket)?;
                let buf = &mut self.buf;
                write_u64(buf, at + trailer::MAP_KEY, key.raw());
                write_u64(buf, at + trailer::MAP_ELEM, elem.raw());
                write_u64(buf, at + trailer::MAP_BUCKET, bucket.raw());
                write_u8(buf, at + trailer::MAP_KEY_SIZE, *key_size);
                write_u8(buf, at + trailer::MAP_VALUE_SIZE, *value_size);
                write_u16(buf, at + trailer::MAP_BUCKET_SIZE, *bucket_size);
                write_u32(buf, at + trailer::MAP_FLAGS, flags.bits());
            }
            ShapeDef::Struct { pkg_path, fields } => {
                let pkg = self.opt_name_addr(*pkg_path)?;
                self.list_header(at, pkg, addr_of(tp.list), fields.len());
                for (i, f) in fields.iter().enumerate() {
                    let entry = at + tp.list + i * field::SIZE;
                    let name = self.name_addr(f.name)?;
                    let typ = self.type_addr(f.typ)?;
                    write_u64(&mut self.buf, entry + field::NAME, name.raw());
                    write_u64(&mut self.buf, entry + field::TYP, typ.raw());
                    write_u64(&mut self.buf, entry + field::OFFSET_ANON, f.offset_anon());
                }
            }
            ShapeDef::Interface { pkg_path, methods } => {
                let pkg = self.opt_name_addr(*pkg_path)?;
                self.list_header(at, pkg, addr_of(tp.list), methods.len());
                for (i, m) in methods.iter().enumerate() {
                    let entry = at + tp.list + i * imethod::SIZE;
                    let name = self.name_off(m.name)?;
                    let typ = self.type_off(Some(m.typ))?;
                    write_i32(&mut self.buf, entry + imethod::NAME, name.raw());
                    write_i32(&mut self.buf, entry + imethod::TYP, typ.raw());
                }
            }
        }

        if let Some(u) = &def.uncommon {
            self.uncommon(u, at, tp)?;
        }
        Ok(())
    }

    fn list_header(&mut self, at: usize, pkg: Addr, list: Addr, len: usize) {
        let buf = &mut self.buf;
        write_u64(buf, at + trailer::PKG_PATH, pkg.raw());
        write_u64(buf, at + trailer::LIST_PTR, list.raw());
        write_u64(buf, at + trailer::LIST_LEN, len as u64);
        write_u64(buf, at + trailer::LIST_CAP, len as u64);
    }

    fn uncommon(&mut self, u: &UncommonDef, at: usize, tp: TypePlan) -> Result<(), BuildError> {
        let pkg_path = match u.pkg_path {
            Some(h) => self.name_off(h)?,
            None => NameOff::NONE,
        };
        let ut = at + tp.uncommon;
        let moff = u32::try_from(tp.methods - tp.uncommon).map_err(|_| BuildError::TooLarge {
            len: self.buf.len(),
        })?;
        #[expect(clippy::cast_possible_truncation, reason = "checked in plan_type")]
        let mcount = u.methods.len() as u16;

        write_i32(&mut self.buf, ut + uncommon::PKG_PATH, pkg_path.raw());
        write_u16(&mut self.buf, ut + uncommon::MCOUNT, mcount);
        write_u16(&mut self.buf, ut + uncommon::XCOUNT, u.exported.min(mcount));
        write_u32(&mut self.buf, ut + uncommon::MOFF, moff);

        for (i, m) in u.methods.iter().enumerate() {
            let entry = at + tp.methods + i * method::SIZE;
            let name = self.name_off(m.name)?;
            let mtyp = self.type_off(m.typ)?;
            write_i32(&mut self.buf, entry + method::NAME, name.raw());
            write_i32(&mut self.buf, entry + method::MTYP, mtyp.raw());
            write_i32(&mut self.buf, entry + method::IFN, m.ifn.raw());
            write_i32(&mut self.buf, entry + method::TFN, m.tfn.raw());
        }
        Ok(())
    }

    /// Text of a name record built in this image; extern names are opaque.
    fn local_text(&self, h: NameHandle) -> Option<&'a str> {
        self.texts.get(h.index()).copied().flatten()
    }
}

/// Final address of every handle of a finished image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placement {
    names: Vec<Addr>,
    types: Vec<Addr>,
}

impl Placement {
    pub fn name_addr(&self, h: NameHandle) -> Addr {
        self.names.get(h.index()).copied().unwrap_or(Addr::NULL)
    }

    pub fn type_addr(&self, h: TypeHandle) -> Addr {
        self.types.get(h.index()).copied().unwrap_or(Addr::NULL)
    }
}

/// A laid-out image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    base: Addr,
    bytes: Vec<u8>,
    typelinks: Vec<TypeOff>,
    placement: Placement,
}

impl Image {
    pub fn base(&self) -> Addr {
        self.base
    }

    /// One past the last byte.
    pub fn end(&self) -> Addr {
        self.base.add_bytes(self.bytes.len() as u64)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Section-relative offsets of every descriptor flagged for the
    /// typelinks table, in definition order.
    pub fn typelinks(&self) -> &[TypeOff] {
        &self.typelinks
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn name_addr(&self, h: NameHandle) -> Addr {
        self.placement.name_addr(h)
    }

    pub fn type_addr(&self, h: TypeHandle) -> Addr {
        self.placement.type_addr(h)
    }

    /// Section-relative offset of a descriptor laid out in this image.
    pub fn type_off(&self, h: TypeHandle) -> Option<TypeOff> {
        let delta = self.type_addr(h).offset_from(self.base)?;
        if delta >= self.bytes.len() as u64 {
            return None;
        }
        i32::try_from(delta).ok().map(TypeOff::new)
    }

    /// Split into section bytes, typelinks table and handle addresses.
    pub fn into_parts(self) -> (Vec<u8>, Vec<TypeOff>, Placement) {
        (self.bytes, self.typelinks, self.placement)
    }
}
