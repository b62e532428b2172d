//! Registry of runtime-created objects.
//!
//! Descriptors synthesized at run time do not belong to any module, so the
//! 32-bit offsets that refer to them cannot be section-relative. Instead each
//! such object is pinned in this registry and its id serves as the offset.
//! Ids start at 1 and strictly increase; entries are never removed.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use typelink_abi::{Addr, BuildError, NameOff, OffsetScheme, TypeOff};

use crate::ResolveError;

struct Registry {
    next: u32,
    by_id: FxHashMap<i32, Addr>,
    by_addr: FxHashMap<Addr, i32>,
}

pub(crate) struct RuntimeObjects {
    inner: Mutex<Registry>,
}

impl RuntimeObjects {
    pub(crate) fn new() -> Self {
        Self::starting_at(1)
    }

    fn starting_at(next: u32) -> Self {
        Self {
            inner: Mutex::new(Registry {
                next,
                by_id: FxHashMap::default(),
                by_addr: FxHashMap::default(),
            }),
        }
    }

    /// The id of `addr`, assigning the next one on first registration.
    pub(crate) fn register(&self, addr: Addr) -> Result<i32, ResolveError> {
        let mut reg = self.inner.lock();
        if let Some(&id) = reg.by_addr.get(&addr) {
            return Ok(id);
        }
        let id = i32::try_from(reg.next).map_err(|_| ResolveError::RegistryExhausted)?;
        reg.next += 1;
        reg.by_id.insert(id, addr);
        reg.by_addr.insert(addr, id);
        tracing::trace!(id, %addr, "registered runtime object");
        Ok(id)
    }

    pub(crate) fn lookup(&self, id: i32) -> Option<Addr> {
        self.inner.lock().by_id.get(&id).copied()
    }

    pub(crate) fn id_of(&self, addr: Addr) -> Option<i32> {
        self.inner.lock().by_addr.get(&addr).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().by_id.len()
    }
}

/// Offset scheme for images laid out in the arena: every referenced name or
/// type is registered and its id stored as the offset.
pub(crate) struct RegistryScheme<'a> {
    pub(crate) objects: &'a RuntimeObjects,
}

impl RegistryScheme<'_> {
    fn id(&self, addr: Addr) -> Result<i32, BuildError> {
        self.objects
            .register(addr)
            .map_err(|_| BuildError::RegistryExhausted)
    }
}

impl OffsetScheme for RegistryScheme<'_> {
    fn name_off(&mut self, addr: Addr) -> Result<NameOff, BuildError> {
        self.id(addr).map(NameOff::new)
    }

    fn type_off(&mut self, addr: Addr) -> Result<TypeOff, BuildError> {
        self.id(addr).map(TypeOff::new)
    }
}
