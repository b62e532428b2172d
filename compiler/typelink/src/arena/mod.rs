//! Pinned storage for descriptors created at run time.
//!
//! Space is reserved first (so the image emitter knows its final address)
//! and committed once the bytes are laid out. Committed blocks are leaked
//! and never move or get freed.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use typelink_abi::layout::{align_up, PTR_SIZE};
use typelink_abi::Addr;

struct ArenaState {
    next: Addr,
    blocks: BTreeMap<Addr, &'static [u8]>,
}

pub(crate) struct Arena {
    base: Addr,
    state: RwLock<ArenaState>,
}

impl Arena {
    pub(crate) fn new(base: Addr) -> Self {
        Self {
            base,
            state: RwLock::new(ArenaState {
                next: base,
                blocks: BTreeMap::new(),
            }),
        }
    }

    pub(crate) fn base(&self) -> Addr {
        self.base
    }

    /// Reserve `len` bytes at pointer alignment. `None` once the address
    /// space is exhausted.
    pub(crate) fn reserve(&self, len: usize) -> Option<Addr> {
        let mut state = self.state.write();
        let start = state.next;
        let size = u64::try_from(align_up(len.max(1), PTR_SIZE)).ok()?;
        state.next = start.checked_add(size)?;
        Some(start)
    }

    /// Pin `bytes` at a previously reserved address.
    pub(crate) fn commit(&self, at: Addr, bytes: Vec<u8>) {
        let pinned: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        self.state.write().blocks.insert(at, pinned);
    }

    /// Bytes from `addr` to the end of the committed block containing it.
    pub(crate) fn bytes_from(&self, addr: Addr) -> Option<&'static [u8]> {
        if addr < self.base {
            return None;
        }
        let state = self.state.read();
        let (&start, &block) = state.blocks.range(..=addr).next_back()?;
        let off = usize::try_from(addr.offset_from(start)?).ok()?;
        block.get(off..).filter(|rest| !rest.is_empty())
    }

    /// Total bytes reserved so far.
    pub(crate) fn used(&self) -> u64 {
        self.state
            .read()
            .next
            .offset_from(self.base)
            .unwrap_or_default()
    }
}
