//! The runtime context.
//!
//! A [`Runtime`] owns every piece of state the resolver reads: the ordered
//! module list, the arena of runtime-created descriptors and the object
//! registry that issues their offsets. Nothing is global; every view borrows
//! the runtime it came from.

use std::sync::Arc;

use parking_lot::RwLock;
use typelink_abi::{Addr, BuildError, ImageBuilder, NameHandle, Placement, TypeHandle};

use crate::arena::Arena;
use crate::objects::{RegistryScheme, RuntimeObjects};
use crate::{FatalAction, LoadError, Module, ResolveError, RuntimeConfig};

pub struct Runtime {
    config: RuntimeConfig,
    modules: RwLock<Vec<Arc<Module>>>,
    arena: Arena,
    objects: RuntimeObjects,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

/// Descriptors laid out in the arena by [`Runtime::allocate`].
#[derive(Clone, Debug)]
pub struct Allocation {
    base: Addr,
    len: usize,
    placement: Placement,
}

impl Allocation {
    pub fn base(&self) -> Addr {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn type_addr(&self, h: TypeHandle) -> Addr {
        self.placement.type_addr(h)
    }

    pub fn name_addr(&self, h: NameHandle) -> Addr {
        self.placement.name_addr(h)
    }
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            arena: Arena::new(config.arena_base),
            config,
            modules: RwLock::new(Vec::new()),
            objects: RuntimeObjects::new(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Append `module` to the link order.
    ///
    /// The type section must be non-empty, must fit in the address space,
    /// must not overlap an already loaded module and must end at or below
    /// the arena base.
    pub fn add_module(&self, module: Module) -> Result<Arc<Module>, LoadError> {
        if module.data().is_empty() {
            return Err(LoadError::EmptySection {
                module: module.name().to_owned(),
            });
        }
        let Some(end) = module.checked_etypes() else {
            return Err(LoadError::AddressOverflow {
                module: module.name().to_owned(),
                start: module.types(),
                len: module.data().len(),
            });
        };
        if end > self.arena.base() {
            return Err(LoadError::IntoArena {
                module: module.name().to_owned(),
                end,
                arena: self.arena.base(),
            });
        }

        let mut modules = self.modules.write();
        if let Some(other) = modules.iter().find(|m| m.overlaps(&module)) {
            return Err(LoadError::Overlap {
                module: module.name().to_owned(),
                other: other.name().to_owned(),
            });
        }

        tracing::debug!(
            module = module.name(),
            types = %module.types(),
            etypes = %module.etypes(),
            typelinks = module.typelinks().len(),
            "loaded module"
        );
        let module = Arc::new(module);
        modules.push(Arc::clone(&module));
        Ok(module)
    }

    /// Snapshot of the module list in link order.
    pub fn modules(&self) -> Vec<Arc<Module>> {
        self.modules.read().clone()
    }

    pub fn module_count(&self) -> usize {
        self.modules.read().len()
    }

    /// The module whose type section contains `addr`.
    pub fn module_containing(&self, addr: Addr) -> Option<Arc<Module>> {
        self.modules
            .read()
            .iter()
            .find(|m| m.contains(addr))
            .cloned()
    }

    /// Pin `addr` in the runtime-object registry and return its id, which
    /// stands in for an offset from any context owned by no module.
    pub fn register_object(&self, addr: Addr) -> i32 {
        self.try_register_object(addr)
            .unwrap_or_else(|err| self.fatal(&err))
    }

    pub fn try_register_object(&self, addr: Addr) -> Result<i32, ResolveError> {
        self.objects.register(addr)
    }

    pub fn lookup_object(&self, id: i32) -> Option<Addr> {
        self.objects.lookup(id)
    }

    pub fn object_id(&self, addr: Addr) -> Option<i32> {
        self.objects.id_of(addr)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Lay out `builder` in the arena. Every name and type the image refers
    /// to by offset is registered, so the new descriptors resolve like any
    /// other.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn allocate(&self, builder: ImageBuilder) -> Result<Allocation, BuildError> {
        let len = builder.image_len()?;
        let base = self
            .arena
            .reserve(len)
            .ok_or(BuildError::TooLarge { len })?;
        let mut scheme = RegistryScheme {
            objects: &self.objects,
        };
        let image = builder.finish_with(base, &mut scheme)?;
        let (bytes, _, placement) = image.into_parts();
        self.arena.commit(base, bytes);
        tracing::debug!(%base, len, arena_used = self.arena.used(), "allocated descriptors");
        Ok(Allocation {
            base,
            len,
            placement,
        })
    }

    /// Bytes from `addr` to the end of the module section or arena block
    /// that holds it.
    pub fn bytes_at(&self, addr: Addr) -> Result<&[u8], ResolveError> {
        if let Some(bytes) = self
            .modules
            .read()
            .iter()
            .find(|m| m.contains(addr))
            .and_then(|m| m.bytes_from(addr))
        {
            return Ok(bytes);
        }
        self.arena
            .bytes_from(addr)
            .ok_or(ResolveError::Unmapped { addr })
    }

    /// Log an unrecoverable metadata error and stop.
    ///
    /// Offset errors also list every module's type range, which is usually
    /// what it takes to tell a stale offset from a bad context address.
    #[cold]
    pub fn fatal(&self, err: &ResolveError) -> ! {
        tracing::error!(error = %err, "fatal type metadata error");
        if err.is_offset_error() {
            for m in self.modules.read().iter() {
                tracing::error!(
                    module = m.name(),
                    types = %m.types(),
                    etypes = %m.etypes(),
                    "module type range"
                );
            }
        }
        match self.config.on_fatal {
            FatalAction::Panic => panic!("runtime: {err}"),
            FatalAction::Abort => std::process::abort(),
        }
    }
}
