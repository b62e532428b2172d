//! Cross-module type deduplication.
//!
//! When several modules each carry a descriptor for the same type, the
//! first one in link order wins. Every later module gets an override map
//! from its typelinks offsets to the canonical descriptors, and the resolver
//! consults that map before the module's own section, so type identity is
//! address identity again.

use rustc_hash::FxHashMap;

use crate::equal::{types_equal, EqualityMemo};
use crate::module::TypeMap;
use crate::types::Type;
use crate::Runtime;

/// Counts reported by one [`Runtime::link_types`] pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Modules that received an override map in this pass.
    pub modules_linked: usize,
    /// Typelinks entries entered into those maps.
    pub typelinks: usize,
    /// Entries pointing at a descriptor from an earlier module.
    pub redirected: usize,
}

impl Runtime {
    /// Build override maps for every module that does not have one yet.
    ///
    /// Modules are visited in link order. Before visiting a module, the
    /// previous module's typelinks (through its override map, if any) are
    /// added to hash buckets; each of the module's own typelinks then takes
    /// the first structurally equal descriptor from its bucket, or itself.
    #[tracing::instrument(level = "debug", skip_all, fields(modules = self.module_count()))]
    pub fn link_types(&self) -> LinkStats {
        let modules = self.modules();
        let mut stats = LinkStats::default();
        let Some((first, rest)) = modules.split_first() else {
            return stats;
        };
        if rest.is_empty() {
            return stats;
        }

        let mut buckets: FxHashMap<u32, Vec<Type<'_>>> =
            FxHashMap::with_capacity_and_hasher(first.typelinks().len(), Default::default());

        let mut prev = first;
        for md in rest {
            for &tl in prev.typelinks() {
                let Some(t) = self.resolve_type_off(prev.types(), tl) else {
                    continue;
                };
                let bucket = buckets.entry(t.hash()).or_default();
                if !bucket.contains(&t) {
                    bucket.push(t);
                }
            }

            if md.typemap().is_none() {
                let mut map = TypeMap::with_capacity_and_hasher(md.typelinks().len(), Default::default());
                for &tl in md.typelinks() {
                    let Some(local) = self.resolve_type_off(md.types(), tl) else {
                        continue;
                    };
                    let canonical = buckets
                        .get(&local.hash())
                        .and_then(|candidates| {
                            candidates.iter().copied().find(|&candidate| {
                                let mut seen = EqualityMemo::default();
                                types_equal(local, candidate, &mut seen)
                            })
                        })
                        .unwrap_or(local);

                    if canonical != local {
                        stats.redirected += 1;
                        tracing::trace!(
                            module = md.name(),
                            off = %tl,
                            from = %local.addr(),
                            to = %canonical.addr(),
                            "redirected type"
                        );
                    }
                    map.insert(tl, canonical.addr());
                }

                let entries = map.len();
                if md.set_typemap(map) {
                    stats.modules_linked += 1;
                    stats.typelinks += entries;
                }
            }

            prev = md;
        }

        tracing::debug!(
            linked = stats.modules_linked,
            typelinks = stats.typelinks,
            redirected = stats.redirected,
            "linked module types"
        );
        stats
    }
}
