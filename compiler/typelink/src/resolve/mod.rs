//! Offset resolution.
//!
//! Every stored offset is interpreted relative to a *context* address: the
//! descriptor, name record or table entry that holds it. If a loaded module
//! owns the context, the offset is relative to that module's type section
//! (type offsets consult the module's override map first). Otherwise the
//! context is a runtime-created object and the offset is a registry id.
//!
//! The plain entry points never return a made-up address: any failure goes
//! through [`Runtime::fatal`].

use typelink_abi::{Addr, NameOff, NameRecord, TextOff, TypeOff};

use crate::error::OffsetKind;
use crate::types::{Name, Type};
use crate::{ResolveError, Runtime};

impl Runtime {
    /// The name record `off` refers to, as seen from `ctx`. Offset 0 is the
    /// empty name.
    pub fn resolve_name_off(&self, ctx: Addr, off: NameOff) -> Name<'_> {
        self.try_resolve_name_off(ctx, off)
            .unwrap_or_else(|err| self.fatal(&err))
    }

    pub fn try_resolve_name_off(&self, ctx: Addr, off: NameOff) -> Result<Name<'_>, ResolveError> {
        if off.is_none() {
            return Ok(Name::empty(self));
        }
        let addr = self.resolve_data_off(OffsetKind::Name, ctx, off.raw())?;
        self.try_name_at(addr)
    }

    /// The descriptor `off` refers to, as seen from `ctx`. Offset 0 is `None`.
    pub fn resolve_type_off(&self, ctx: Addr, off: TypeOff) -> Option<Type<'_>> {
        self.try_resolve_type_off(ctx, off)
            .unwrap_or_else(|err| self.fatal(&err))
    }

    pub fn try_resolve_type_off(
        &self,
        ctx: Addr,
        off: TypeOff,
    ) -> Result<Option<Type<'_>>, ResolveError> {
        if off.is_none() {
            return Ok(None);
        }
        let addr = self.resolve_data_off(OffsetKind::Type, ctx, off.raw())?;
        self.try_type_at(addr).map(Some)
    }

    /// The code address `off` refers to, as seen from `ctx`.
    pub fn resolve_text_off(&self, ctx: Addr, off: TextOff) -> Addr {
        self.try_resolve_text_off(ctx, off)
            .unwrap_or_else(|err| self.fatal(&err))
    }

    pub fn try_resolve_text_off(&self, ctx: Addr, off: TextOff) -> Result<Addr, ResolveError> {
        let Some(module) = self.module_containing(ctx) else {
            return self.lookup_registered(OffsetKind::Text, ctx, off.raw());
        };

        let Some(code) = module.code() else {
            return Err(ResolveError::NoCode {
                off: off.raw(),
                module: module.name().to_owned(),
            });
        };
        let (text, etext, sections) = (code.text, code.etext, code.sections.as_slice());
        let out_of_range = || ResolveError::OutOfRange {
            what: OffsetKind::Text,
            off: off.raw(),
            start: text,
            end: etext,
        };

        let raw = u64::try_from(off.raw()).map_err(|_| out_of_range())?;
        let res = if sections.len() > 1 {
            sections
                .iter()
                .find_map(|s| s.translate(raw))
                .ok_or_else(out_of_range)?
        } else {
            text.checked_add(raw).ok_or_else(out_of_range)?
        };

        if res > etext && self.config().code_shares_data_space {
            return Err(out_of_range());
        }
        Ok(res)
    }

    /// A descriptor view of a raw pointer field. The null address is `None`.
    pub fn type_at(&self, addr: Addr) -> Option<Type<'_>> {
        if addr.is_null() {
            return None;
        }
        Some(self.try_type_at(addr).unwrap_or_else(|err| self.fatal(&err)))
    }

    pub fn try_type_at(&self, addr: Addr) -> Result<Type<'_>, ResolveError> {
        let bytes = self.bytes_at(addr)?;
        Type::new(self, addr, bytes)
    }

    /// A name view of a raw pointer field. The null address is the empty
    /// name.
    pub fn name_at(&self, addr: Addr) -> Name<'_> {
        self.try_name_at(addr).unwrap_or_else(|err| self.fatal(&err))
    }

    pub fn try_name_at(&self, addr: Addr) -> Result<Name<'_>, ResolveError> {
        if addr.is_null() {
            return Ok(Name::empty(self));
        }
        let bytes = self.bytes_at(addr)?;
        let record =
            NameRecord::parse(bytes).map_err(|source| ResolveError::Malformed { addr, source })?;
        Ok(Name::new(self, addr, record))
    }

    /// Name and type offsets: section-relative inside the owning module,
    /// registry ids otherwise.
    fn resolve_data_off(&self, what: OffsetKind, ctx: Addr, off: i32) -> Result<Addr, ResolveError> {
        let Some(module) = self.module_containing(ctx) else {
            return self.lookup_registered(what, ctx, off);
        };

        if what == OffsetKind::Type {
            if let Some(&canonical) = module
                .typemap()
                .and_then(|map| map.get(&TypeOff::new(off)))
            {
                return Ok(canonical);
            }
        }

        let start = module.types();
        let end = module.etypes();
        u64::try_from(off)
            .ok()
            .and_then(|delta| start.checked_add(delta))
            .filter(|&res| res <= end)
            .ok_or(ResolveError::OutOfRange {
                what,
                off,
                start,
                end,
            })
    }

    fn lookup_registered(&self, what: OffsetKind, ctx: Addr, off: i32) -> Result<Addr, ResolveError> {
        self.lookup_object(off)
            .ok_or(ResolveError::NotInRanges { what, off, ctx })
    }
}
